//! Persistence for profiles, the chat log and users.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod routed;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use memory::MemoryBackend;
pub use routed::RoutedStore;
pub use traits::{ChatLogEntry, Database, MessageRole, UserRecord};
