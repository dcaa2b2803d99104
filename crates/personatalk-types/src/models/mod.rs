//! Domain models shared across PersonaTalk crates.

mod history;
mod service;

pub use history::{HistoryMessage, HistorySession, NewSession};
pub use service::{ModelInfo, ServiceConfig, ServiceListing, ServiceRegistration, ServiceSettings};
