//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (identifiers, errors, state machine trait)
//! - `coaching` - Signal lexicon, classifier, sanitizer and phase rules

pub mod coaching;
pub mod foundation;
