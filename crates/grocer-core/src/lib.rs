pub mod config;
pub mod error;
pub mod types;

pub use config::GrocerConfig;
pub use error::{GrocerError, Result};
pub use types::*;
