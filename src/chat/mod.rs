//! Chat orchestration and its HTTP surface.

pub mod orchestrator;
pub mod prompt;
pub mod routes;

pub use orchestrator::{ChatOrchestrator, DEFAULT_HISTORY_LIMIT, INIT_SENTINEL};
pub use routes::{ChatState, chat_routes};
