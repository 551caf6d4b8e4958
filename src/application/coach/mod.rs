//! Coach orchestration: generation over the AI port and the per-turn
//! phase controller.

mod controller;
mod generator;

pub use controller::{PhaseController, TurnResult, STRUCTURE_PROMPT};
pub use generator::{
    CoachGenerator, ExploreReply, GenerationError, GenerationInput, GeneratorSettings,
    SummaryReply, EXPLORE_EMPTY_FALLBACK, EXPLORE_FAILURE_FALLBACK, SUMMARIZE_EMPTY_FALLBACK,
    SUMMARIZE_FAILURE_FALLBACK,
};
