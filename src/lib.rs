pub mod api;
pub mod bot;
pub mod cache;
pub mod config;
pub mod database;
pub mod services;
pub mod types;

pub use cache::Cache;
pub use config::Config;
pub use database::Database;
pub use types::*;
