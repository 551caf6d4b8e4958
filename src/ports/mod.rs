//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the coaching core and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - Text generation capability used by the coach
//! - `StateStore` - Durable per-user conversation state

mod ai_provider;
mod state_store;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message,
    MessageRole, ProviderInfo, RequestMetadata, ResponseFormat, TokenUsage,
};
pub use state_store::{StateStore, StateStoreError};
