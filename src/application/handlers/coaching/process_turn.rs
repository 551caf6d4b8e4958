//! ProcessTurnHandler - Command handler for one incoming user message.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{CoachingError, UserLocks, PENDING_SUMMARY_KEY};
use crate::application::coach::{PhaseController, TurnResult};
use crate::domain::coaching::{ConversationState, Turn};
use crate::domain::foundation::{UserId, ValidationError};
use crate::ports::{RequestMetadata, StateStore};

/// Command to process a user message.
#[derive(Debug, Clone)]
pub struct ProcessTurnCommand {
    pub user_id: UserId,
    pub text: String,
}

impl ProcessTurnCommand {
    pub fn new(user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            user_id,
            text: text.into(),
        }
    }
}

/// Result of a processed turn.
#[derive(Debug, Clone)]
pub struct ProcessTurnResult {
    pub turn: TurnResult,
    /// State as saved after the turn.
    pub state: ConversationState,
}

/// Handler for processing user messages.
pub struct ProcessTurnHandler {
    controller: PhaseController,
    store: Arc<dyn StateStore>,
    locks: UserLocks,
    default_style: String,
}

impl ProcessTurnHandler {
    pub fn new(controller: PhaseController, store: Arc<dyn StateStore>, locks: UserLocks) -> Self {
        Self {
            controller,
            store,
            locks,
            default_style: crate::domain::coaching::DEFAULT_STYLE.to_string(),
        }
    }

    /// Sets the address register used for first-contact state.
    pub fn with_default_style(mut self, style: impl Into<String>) -> Self {
        self.default_style = style.into();
        self
    }

    pub async fn handle(&self, cmd: ProcessTurnCommand) -> Result<ProcessTurnResult, CoachingError> {
        let text = cmd.text.trim();
        if text.is_empty() {
            return Err(ValidationError::empty_field("text").into());
        }

        let _guard = self.locks.acquire(&cmd.user_id).await;

        // 1. Load state, defaulting on first contact
        let mut state = self
            .store
            .load(&cmd.user_id)
            .await?
            .unwrap_or_else(|| ConversationState::with_style(self.default_style.clone()));

        // 2. Run the controller against the record as loaded
        let metadata =
            RequestMetadata::new(Uuid::new_v4().to_string()).with_user(cmd.user_id.clone());
        let trace_id = metadata.trace_id.clone();
        let turn = self.controller.process_turn_with(&state, text, metadata).await;

        // 3. Record the exchange and merge the patch
        state.push_turn(Turn::user(text));
        state.push_turn(Turn::assistant(turn.reply.clone()));
        state.apply(&turn.state_updates);

        // A proposal is only answerable on the turn that made it
        if turn.ask_confirm {
            state.extensions.insert(
                PENDING_SUMMARY_KEY.to_string(),
                turn.propose_summary.clone().into(),
            );
        } else {
            state.extensions.remove(PENDING_SUMMARY_KEY);
        }

        // 4. Persist
        self.store.save(&cmd.user_id, &state).await?;

        info!(
            trace_id = %trace_id,
            user_id = %cmd.user_id,
            phase = state.phase().as_str(),
            turns = state.coach_or_default().turns,
            ask_confirm = turn.ask_confirm,
            "Turn processed"
        );

        Ok(ProcessTurnResult { turn, state })
    }
}
