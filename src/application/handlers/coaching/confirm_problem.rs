//! ConfirmProblemHandler - Command handler for the user's answer to a
//! proposed problem summary.

use std::sync::Arc;
use tracing::info;

use super::{CoachingError, UserLocks, PENDING_SUMMARY_KEY, PROBLEM_SUMMARY_KEY};
use crate::domain::coaching::{CoachLoop, ConversationState};
use crate::domain::foundation::{StateMachine, UserId};
use crate::ports::StateStore;

/// Command carrying the user's answer.
#[derive(Debug, Clone)]
pub struct ConfirmProblemCommand {
    pub user_id: UserId,
    pub accepted: bool,
}

impl ConfirmProblemCommand {
    pub fn accept(user_id: UserId) -> Self {
        Self {
            user_id,
            accepted: true,
        }
    }

    pub fn reject(user_id: UserId) -> Self {
        Self {
            user_id,
            accepted: false,
        }
    }
}

/// Result of a confirmation answer.
#[derive(Debug, Clone)]
pub struct ConfirmProblemResult {
    /// The fixed problem statement, set only on accept.
    pub problem_summary: Option<String>,
    pub state: ConversationState,
}

/// Handler for summary confirmation answers.
pub struct ConfirmProblemHandler {
    store: Arc<dyn StateStore>,
    locks: UserLocks,
}

impl ConfirmProblemHandler {
    pub fn new(store: Arc<dyn StateStore>, locks: UserLocks) -> Self {
        Self { store, locks }
    }

    pub async fn handle(&self, cmd: ConfirmProblemCommand) -> Result<ConfirmProblemResult, CoachingError> {
        let _guard = self.locks.acquire(&cmd.user_id).await;

        let mut state = self.store.load(&cmd.user_id).await?.unwrap_or_default();
        let pending = state
            .extensions
            .remove(PENDING_SUMMARY_KEY)
            .and_then(|v| v.as_str().map(str::trim).map(str::to_string))
            .filter(|s| !s.is_empty());

        // Only a pending proposal can be accepted; anything else resumes exploring
        let problem_summary = match pending {
            Some(summary) if cmd.accepted => {
                state.problem_confirmed = true;
                state
                    .extensions
                    .insert(PROBLEM_SUMMARY_KEY.to_string(), summary.clone().into());
                Some(summary)
            }
            _ => {
                let mut coach = state.coach_or_default();
                coach.phase = coach.phase.transition_to(CoachLoop::Explore)?;
                state.coach = Some(coach);
                None
            }
        };

        self.store.save(&cmd.user_id, &state).await?;

        info!(
            user_id = %cmd.user_id,
            accepted = cmd.accepted,
            confirmed = problem_summary.is_some(),
            "Problem summary answered"
        );

        Ok(ConfirmProblemResult {
            problem_summary,
            state,
        })
    }
}
