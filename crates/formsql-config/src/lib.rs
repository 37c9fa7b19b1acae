pub mod config;
pub mod error;
pub mod utils;

pub use config::StoreConfig;
pub use error::{ConfigError, Result};

#[cfg(test)]
pub mod test_utils;
