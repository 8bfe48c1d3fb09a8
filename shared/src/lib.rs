pub mod duration;
pub mod protocol;
pub mod query;
pub mod types;
