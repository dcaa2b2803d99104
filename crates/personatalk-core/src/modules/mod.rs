//! History persistence, configuration loading and logging setup.

pub mod config;
pub mod history;
pub mod logger;
