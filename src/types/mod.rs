pub mod models;
pub mod monitor;

pub use models::*;
pub use monitor::*;
