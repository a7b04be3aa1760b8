pub mod connector;
pub mod params;
pub mod row;
