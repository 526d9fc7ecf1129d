mod constants;
mod error;
mod types;

pub use constants::*;
pub use error::BurnerError;
pub use types::LogLevel;
