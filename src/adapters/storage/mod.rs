//! Storage Adapters
//!
//! Implementations of the StateStore port for persisting conversation state.
//!
//! ## Available Adapters
//!
//! - **InMemoryStateStore** - Stores state in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use kai_mentor::adapters::storage::InMemoryStateStore;
//!
//! let store = InMemoryStateStore::new();
//! ```

mod in_memory_state_store;

pub use in_memory_state_store::InMemoryStateStore;
