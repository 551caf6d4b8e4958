//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, the state machine trait, and validation errors
//! shared by the coaching domain.

mod errors;
mod ids;
mod state_machine;

pub use errors::ValidationError;
pub use ids::UserId;
pub use state_machine::StateMachine;
