pub mod cache;
pub mod vacancy;
