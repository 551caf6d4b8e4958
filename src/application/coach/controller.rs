//! Phase controller - one coaching turn from state and text to reply and patch.
//!
//! The controller never writes state. It reads the prior record, resolves
//! the phase through the ordered rule list, dispatches to generation and
//! hands back a [`TurnResult`] whose `state_updates` the caller merges.

use tracing::{debug, info};
use uuid::Uuid;

use super::generator::{CoachGenerator, GenerationInput};
use crate::domain::coaching::{
    measure_clarity_with, should_force_structural, ClarityParams, CoachLoop, CoachState,
    ConversationState, PhaseTransitionEngine, StateUpdates, TransitionRule, TurnSignals,
};
use crate::ports::RequestMetadata;

/// Fixed offer made in the structure phase.
pub const STRUCTURE_PROMPT: &str = "Готов пройтись по шагам и собрать краткий план изменений?";

/// Outcome of one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    /// Text to send back.
    pub reply: String,
    /// Patch for the caller to merge; always carries `coach`.
    pub state_updates: StateUpdates,
    /// True when the user should confirm `propose_summary`.
    pub ask_confirm: bool,
    pub propose_summary: String,
    /// True when the caller should start the structured question sequence.
    pub suggest_struct: bool,
    /// Rule that moved the phase this turn, if any.
    pub transition: Option<TransitionRule>,
}

/// Drives the explore → summarize → structure dialogue.
#[derive(Clone)]
pub struct PhaseController {
    generator: CoachGenerator,
    engine: PhaseTransitionEngine,
    clarity: ClarityParams,
}

impl PhaseController {
    pub fn new(generator: CoachGenerator) -> Self {
        Self {
            generator,
            engine: PhaseTransitionEngine::default(),
            clarity: ClarityParams::default(),
        }
    }

    pub fn with_engine(mut self, engine: PhaseTransitionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_clarity_params(mut self, clarity: ClarityParams) -> Self {
        self.clarity = clarity;
        self
    }

    /// Processes a turn with a fresh trace id.
    pub async fn process_turn(&self, state: &ConversationState, user_text: &str) -> TurnResult {
        self.process_turn_with(state, user_text, RequestMetadata::new(Uuid::new_v4().to_string()))
            .await
    }

    /// Processes a turn. Never fails: generation problems surface as
    /// fallback replies.
    pub async fn process_turn_with(
        &self,
        state: &ConversationState,
        user_text: &str,
        metadata: RequestMetadata,
    ) -> TurnResult {
        // 1. Measure the record as it stood before this message
        let clarity = measure_clarity_with(&state.history, self.clarity);
        let prior = state.coach_or_default();
        let turns = prior.turns.saturating_add(1);
        let force_structural = should_force_structural(user_text);

        let mut signals = TurnSignals {
            problem_confirmed: state.problem_confirmed,
            force_structural,
            turns,
            clarity,
            summary_ready: None,
        };

        // 2. Entry rules pick the phase to dispatch
        let entry = self.engine.resolve_entry(prior.phase, &signals);
        let active = entry.phase;

        debug!(
            trace_id = %metadata.trace_id,
            turns,
            clarity,
            force_structural,
            phase = active.as_str(),
            generation = active.uses_generation(),
            "Processing coaching turn"
        );

        let input = GenerationInput {
            style: &state.style,
            history: &state.history,
            user_text,
        };

        let mut store = None;
        let mut ask_confirm = false;
        let mut propose_summary = String::new();
        let mut suggest_struct = false;

        // 3. Dispatch
        let reply = match active {
            CoachLoop::Explore => {
                let explored = self.generator.explore(input, metadata.clone()).await;
                store = Some(explored.store);
                explored.response_text
            }
            CoachLoop::Summarize => {
                let summary = self.generator.summarize(input, metadata.clone()).await;
                ask_confirm = summary.ask_confirm;
                propose_summary = summary.propose_summary;
                signals.summary_ready = Some(ask_confirm && !propose_summary.is_empty());
                summary.response_text
            }
            CoachLoop::Structure => {
                suggest_struct = true;
                STRUCTURE_PROMPT.to_string()
            }
        };

        // 4. Exit rules pick the phase to record
        let exit = self.engine.resolve_exit(active, &signals);
        let transition = exit.fired.or(entry.fired);

        if exit.phase != prior.phase {
            info!(
                trace_id = %metadata.trace_id,
                from = prior.phase.as_str(),
                to = exit.phase.as_str(),
                rule = transition.map(|r| r.as_str()).unwrap_or("none"),
                "Coach phase changed"
            );
        }

        let mut state_updates = StateUpdates::new(CoachState::record(clarity, turns, exit.phase));
        if let Some(store) = store {
            let rejected = state_updates.merge_store(store);
            if !rejected.is_empty() {
                tracing::warn!(
                    trace_id = %metadata.trace_id,
                    keys = ?rejected,
                    "Dropped store keys that collide with reserved fields"
                );
            }
        }

        TurnResult {
            reply,
            state_updates,
            ask_confirm,
            propose_summary,
            suggest_struct,
            transition,
        }
    }
}
