//! Coaching command handlers.
//!
//! Caller side of the coaching core: load a user's state, run a command,
//! save the result. All handlers built from the same [`UserLocks`]
//! serialize per user.

mod confirm_problem;
mod error;
mod process_turn;
mod reset_conversation;
mod user_locks;

pub use confirm_problem::{ConfirmProblemCommand, ConfirmProblemHandler, ConfirmProblemResult};
pub use error::CoachingError;
pub use process_turn::{ProcessTurnCommand, ProcessTurnHandler, ProcessTurnResult};
pub use reset_conversation::{ResetConversationCommand, ResetConversationHandler};
pub use user_locks::UserLocks;

pub use crate::domain::coaching::{PENDING_SUMMARY_KEY, PROBLEM_SUMMARY_KEY};
