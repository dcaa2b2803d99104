//! # PersonaTalk Types
//!
//! Core types, protocol messages, and error definitions for PersonaTalk.
//!
//! - **`error`** - Typed error hierarchy for transport, model services, registry and history
//! - **`models`** - Domain models (service configuration, history sessions and messages)
//! - **`protocol`** - OpenAI-compatible chat protocol types and the TTS wire types
//!
//! ## Architecture Role
//!
//! `personatalk-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!           personatalk-types (this crate)
//!                     │
//!                     ▼
//!             personatalk-core
//!                     │
//!                     ▼
//!            personatalk-server
//! ```

pub mod error;
pub mod models;
pub mod protocol;

pub use error::{DecodeError, HistoryError, RegistryError, ServiceError, TransportError};

pub use models::{
    HistoryMessage, HistorySession, ModelInfo, NewSession, ServiceConfig, ServiceListing,
    ServiceRegistration, ServiceSettings,
};
pub use protocol::{
    ChatCompletionPayload, ChatMessage, ChatRequest, ChatResponse, ChatRole, Choice, StreamChoice,
    StreamChunk,
};
