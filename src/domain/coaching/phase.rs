//! Coaching loop phases.
//!
//! The loop decides what kind of reply the coach gives: clarifying
//! questions, a summary offered for confirmation, or the hand-off to a
//! structured plan.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// The current stage of the coaching dialogue policy.
///
/// Normal flow is `Explore` → `Summarize` → `Structure`, with
/// `Summarize` → `Explore` when a proposed summary is rejected. A confirmed
/// problem jumps straight to `Structure` from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoachLoop {
    /// Calibration: ask about context, emotions and thoughts. No advice.
    #[default]
    Explore,

    /// Restate the problem in the user's words and ask to confirm it.
    Summarize,

    /// Offer to build a step-by-step plan. No generation call.
    Structure,
}

impl CoachLoop {
    /// Wire name of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explore => "explore",
            Self::Summarize => "summarize",
            Self::Structure => "structure",
        }
    }

    /// Parses a stored phase name, falling back to `Explore` for anything
    /// unrecognised so a damaged record restarts calibration.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    /// Returns true if replies in this phase come from the generation capability.
    pub fn uses_generation(&self) -> bool {
        !matches!(self, Self::Structure)
    }
}

impl fmt::Display for CoachLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoachLoop {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explore" => Ok(Self::Explore),
            "summarize" => Ok(Self::Summarize),
            "structure" => Ok(Self::Structure),
            other => Err(ValidationError::invalid_format(
                "loop",
                format!("unknown coaching phase '{}'", other),
            )),
        }
    }
}

impl StateMachine for CoachLoop {
    fn can_transition_to(&self, target: &Self) -> bool {
        use CoachLoop::*;
        matches!(
            (self, target),
            // Staying put is always allowed
            (Explore, Explore) | (Summarize, Summarize) | (Structure, Structure) |
            // Enough context or a forced signal
            (Explore, Summarize) |
            // Proposed summary rejected or incomplete
            (Summarize, Explore) |
            // Problem confirmed externally
            (Explore, Structure) | (Summarize, Structure)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use CoachLoop::*;
        match self {
            Explore => vec![Explore, Summarize, Structure],
            Summarize => vec![Summarize, Explore, Structure],
            Structure => vec![Structure],
        }
    }
}
