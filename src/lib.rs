pub mod cli;
pub mod common;
pub mod core;
pub mod daemon;
pub mod logging;

pub use anyhow::{Context, Result};
