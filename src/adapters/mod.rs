//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the coaching core to external systems:
//! - `ai` - Text generation providers (OpenAI, mock)
//! - `storage` - Conversation state stores (in-memory)

pub mod ai;
pub mod storage;

pub use ai::{MockAIProvider, OpenAIConfig, OpenAIProvider};
pub use storage::InMemoryStateStore;
