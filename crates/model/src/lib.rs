pub mod core;
pub mod error;
pub mod execution;
pub mod records;
