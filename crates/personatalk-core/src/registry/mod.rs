//! Named model service registry.

mod factory;
mod manager;

pub use factory::{ModelServiceFactory, ServiceConstructor};
pub use manager::ModelServiceManager;
