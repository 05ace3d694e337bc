pub mod config;
pub mod error;

pub use config::R2fmConfig;
pub use error::{R2fmError, R2fmResult};
