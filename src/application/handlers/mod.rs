//! Application handlers.
//!
//! Command handlers that orchestrate the coaching core and the state store.

pub mod coaching;

pub use coaching::{
    CoachingError, ConfirmProblemCommand, ConfirmProblemHandler, ConfirmProblemResult,
    ProcessTurnCommand, ProcessTurnHandler, ProcessTurnResult, ResetConversationCommand,
    ResetConversationHandler, UserLocks, PENDING_SUMMARY_KEY, PROBLEM_SUMMARY_KEY,
};
