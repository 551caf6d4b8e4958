//! Application layer - Coach orchestration and command handlers.
//!
//! This layer wires the coaching domain to the ports: `coach` turns a state
//! and a message into a reply and a patch, `handlers` load and save state
//! around it.

pub mod coach;
pub mod handlers;

pub use coach::{CoachGenerator, GeneratorSettings, PhaseController, TurnResult};
pub use handlers::{
    CoachingError, ConfirmProblemCommand, ConfirmProblemHandler, ProcessTurnCommand,
    ProcessTurnHandler, ResetConversationCommand, ResetConversationHandler, UserLocks,
};
