//! Error types for infobot.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse {document}: {reason}")]
    ParseError { document: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Conversation flow errors.
///
/// Definition errors are fatal at startup. Runtime errors are recovered by
/// the orchestrator, which clears the flow state and falls through.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Flow definition is invalid: {0}")]
    InvalidDefinition(String),

    #[error("Flow start node {0} is not defined")]
    MissingStart(String),

    #[error("Node {node} references unknown node {target}")]
    DanglingReference { node: String, target: String },

    #[error("Flow did not settle after {hops} hops (last node: {node})")]
    HopLimitExceeded { hops: usize, node: String },

    #[error("Failed to persist flow state: {0}")]
    Persist(#[from] DatabaseError),
}

/// Chat orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Missing user id")]
    MissingUserId,

    #[error("Storage failure: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
