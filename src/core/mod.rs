pub mod config;
pub mod error;
pub mod formatter;
pub mod models;
pub mod period;
pub mod providers;
pub mod summary;
