//! # PersonaTalk Core
//!
//! Model service plumbing and conversation logic for PersonaTalk.
//!
//! ```text
//! personatalk-core/src/
//! ├── model_service/    # ModelService trait, OpenAI-compatible + TTS backends
//! │   ├── upstream/     # retrying HTTP transport
//! │   └── common/       # SSE frame decoder, client builder
//! ├── registry/         # kind -> constructor factory, named service manager
//! ├── conversation/     # session-aware chat flows (plain and streaming)
//! └── modules/          # history store, config loading, logging setup
//! ```

#![allow(
    clippy::significant_drop_tightening,
    reason = "Mutex guards are held for the whole SQLite statement"
)]
#![allow(clippy::map_err_ignore, reason = "Error context is provided in the replacement message")]
#![allow(
    clippy::derive_partial_eq_without_eq,
    reason = "Some types intentionally don't implement Eq"
)]
// Test-only lints: allow panic!, unwrap, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::assertions_on_result_states
    )
)]

pub mod conversation;
pub mod error;
pub mod model_service;
pub mod modules;
pub mod registry;

pub use conversation::{ChatTurn, ConversationEvent, ConversationService};
pub use error::{AppError, AppResult};
pub use model_service::{ChunkStream, ModelService, OpenAiCompatibleService, TtsService};
pub use modules::history::{HistoryStore, SqliteHistoryStore};
pub use registry::{ModelServiceFactory, ModelServiceManager};
