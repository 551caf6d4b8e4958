//! Coaching domain module.
//!
//! Lexical signal detection, clarity scoring, reply sanitization and the
//! phase rules of the trading-coach dialogue. Pure, synchronous code; the
//! application layer wires it to the generation capability.

mod classifier;
mod lexicon;
mod phase;
mod rules;
mod sanitizer;
mod state;

#[cfg(test)]
mod proptests;

pub use classifier::{
    detect_patterns, draft_problem_statement, extract_problem_summary, has_behavior, is_vague,
    measure_clarity, measure_clarity_with, should_force_structural, ClarityParams,
    CLARITY_DENOMINATOR, CLARITY_WINDOW_CHARS, DRAFT_NOTES,
};
pub use lexicon::{
    PatternKind, PatternLabel, BANNED_TEMPLATES, BEHAVIOR_VERBS, GROUNDING_KEYWORDS, VAGUE_WORDS,
};
pub use phase::CoachLoop;
pub use rules::{
    PhaseTransitionEngine, Resolution, RuleStage, TransitionRule, TransitionThresholds,
    TurnSignals, CLARITY_THRESHOLD, MIN_TURNS_FOR_SUMMARY,
};
pub use sanitizer::{strip_templates, ResponseSanitizer, MAX_REPLY_CHARS};
pub use state::{
    is_truthy, CoachState, ConversationState, StateUpdates, Turn, TurnRole, DEFAULT_STYLE,
    PENDING_SUMMARY_KEY, PROBLEM_SUMMARY_KEY, RESERVED_KEYS,
};
