pub mod batch;
pub mod conform;
pub mod error;
pub mod state;
