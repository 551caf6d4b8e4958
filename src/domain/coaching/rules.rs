//! Phase transition rules.
//!
//! Precedence is an ordered list evaluated top-down, first match wins:
//! confirmation beats a forced structural signal, which beats the
//! turn/clarity threshold. Entry rules run before the phase is dispatched
//! (they decide which reply is generated); exit rules run after.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::phase::CoachLoop;
use crate::domain::foundation::StateMachine;

/// Minimum turn count before the clarity threshold can move explore on.
pub const MIN_TURNS_FOR_SUMMARY: u32 = 3;

/// Clarity needed (together with the turn count) to move explore on.
pub const CLARITY_THRESHOLD: f64 = 0.55;

/// Tunable thresholds. Defaults reproduce the production bot; they are
/// empirical, not derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionThresholds {
    pub min_turns: u32,
    pub clarity: f64,
}

impl Default for TransitionThresholds {
    fn default() -> Self {
        Self {
            min_turns: MIN_TURNS_FOR_SUMMARY,
            clarity: CLARITY_THRESHOLD,
        }
    }
}

/// When a rule is evaluated relative to the phase dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleStage {
    Entry,
    Exit,
}

/// A named phase transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionRule {
    /// The user confirmed the problem summary: go to structure, no matter what.
    ProblemConfirmed,
    /// Risk, fear-of-loss or self-doubt signal in the current message.
    ForcedStructural,
    /// Enough turns and enough situated detail.
    ClarityThreshold,
    /// The summary attempt produced nothing to confirm.
    SummaryRejected,
}

impl TransitionRule {
    /// All rules in precedence order.
    pub const ORDERED: [TransitionRule; 4] = [
        TransitionRule::ProblemConfirmed,
        TransitionRule::ForcedStructural,
        TransitionRule::ClarityThreshold,
        TransitionRule::SummaryRejected,
    ];

    pub fn stage(&self) -> RuleStage {
        match self {
            Self::ProblemConfirmed => RuleStage::Entry,
            _ => RuleStage::Exit,
        }
    }

    /// Target phase if this rule fires for `phase` under `signals`.
    pub fn evaluate(
        &self,
        phase: CoachLoop,
        signals: &TurnSignals,
        thresholds: &TransitionThresholds,
    ) -> Option<CoachLoop> {
        match self {
            Self::ProblemConfirmed => signals.problem_confirmed.then_some(CoachLoop::Structure),
            Self::ForcedStructural => (phase == CoachLoop::Explore && signals.force_structural)
                .then_some(CoachLoop::Summarize),
            Self::ClarityThreshold => (phase == CoachLoop::Explore
                && signals.turns >= thresholds.min_turns
                && signals.clarity >= thresholds.clarity)
                .then_some(CoachLoop::Summarize),
            Self::SummaryRejected => (phase == CoachLoop::Summarize
                && signals.summary_ready == Some(false))
            .then_some(CoachLoop::Explore),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProblemConfirmed => "problem_confirmed",
            Self::ForcedStructural => "forced_structural",
            Self::ClarityThreshold => "clarity_threshold",
            Self::SummaryRejected => "summary_rejected",
        }
    }
}

/// Everything the rules look at for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TurnSignals {
    pub problem_confirmed: bool,
    pub force_structural: bool,
    pub turns: u32,
    pub clarity: f64,
    /// Outcome of a summarize dispatch: `Some(true)` when a non-empty summary
    /// was proposed with a confirmation request. `None` before dispatch.
    pub summary_ready: Option<bool>,
}

/// Result of evaluating one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub phase: CoachLoop,
    pub fired: Option<TransitionRule>,
}

/// Evaluates the ordered rule list.
#[derive(Debug, Clone, Default)]
pub struct PhaseTransitionEngine {
    thresholds: TransitionThresholds,
}

impl PhaseTransitionEngine {
    pub fn new(thresholds: TransitionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &TransitionThresholds {
        &self.thresholds
    }

    /// Phase to dispatch this turn.
    pub fn resolve_entry(&self, prior: CoachLoop, signals: &TurnSignals) -> Resolution {
        self.resolve(RuleStage::Entry, prior, signals)
    }

    /// Phase to record after the dispatched phase produced its outcome.
    pub fn resolve_exit(&self, active: CoachLoop, signals: &TurnSignals) -> Resolution {
        self.resolve(RuleStage::Exit, active, signals)
    }

    fn resolve(&self, stage: RuleStage, current: CoachLoop, signals: &TurnSignals) -> Resolution {
        let hit = TransitionRule::ORDERED
            .iter()
            .filter(|rule| rule.stage() == stage)
            .find_map(|rule| {
                rule.evaluate(current, signals, &self.thresholds)
                    .map(|target| (*rule, target))
            });

        match hit {
            Some((rule, target)) => match current.transition_to(target) {
                Ok(phase) => Resolution {
                    phase,
                    fired: Some(rule),
                },
                Err(err) => {
                    warn!(rule = rule.as_str(), error = %err, "Rejected phase transition");
                    Resolution {
                        phase: current,
                        fired: None,
                    }
                }
            },
            None => Resolution {
                phase: current,
                fired: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PhaseTransitionEngine {
        PhaseTransitionEngine::default()
    }

    mod entry {
        use super::*;

        #[test]
        fn confirmation_overrides_any_phase() {
            let signals = TurnSignals {
                problem_confirmed: true,
                ..Default::default()
            };
            for prior in [CoachLoop::Explore, CoachLoop::Summarize, CoachLoop::Structure] {
                let res = engine().resolve_entry(prior, &signals);
                assert_eq!(res.phase, CoachLoop::Structure);
                assert_eq!(res.fired, Some(TransitionRule::ProblemConfirmed));
            }
        }

        #[test]
        fn without_confirmation_prior_phase_is_kept() {
            let signals = TurnSignals {
                force_structural: true,
                turns: 9,
                clarity: 1.0,
                ..Default::default()
            };
            let res = engine().resolve_entry(CoachLoop::Summarize, &signals);
            assert_eq!(res.phase, CoachLoop::Summarize);
            assert_eq!(res.fired, None);
        }
    }

    mod exit {
        use super::*;

        #[test]
        fn forced_signal_moves_explore_before_threshold() {
            let signals = TurnSignals {
                force_structural: true,
                turns: 1,
                clarity: 0.0,
                ..Default::default()
            };
            let res = engine().resolve_exit(CoachLoop::Explore, &signals);
            assert_eq!(res.phase, CoachLoop::Summarize);
            assert_eq!(res.fired, Some(TransitionRule::ForcedStructural));
        }

        #[test]
        fn forced_rule_wins_when_both_apply() {
            let signals = TurnSignals {
                force_structural: true,
                turns: 5,
                clarity: 0.9,
                ..Default::default()
            };
            let res = engine().resolve_exit(CoachLoop::Explore, &signals);
            assert_eq!(res.fired, Some(TransitionRule::ForcedStructural));
        }

        #[test]
        fn threshold_needs_turns_and_clarity() {
            let at = |turns, clarity| {
                engine()
                    .resolve_exit(
                        CoachLoop::Explore,
                        &TurnSignals {
                            turns,
                            clarity,
                            ..Default::default()
                        },
                    )
                    .phase
            };
            assert_eq!(at(3, 0.55), CoachLoop::Summarize);
            assert_eq!(at(2, 0.9), CoachLoop::Explore);
            assert_eq!(at(7, 0.54), CoachLoop::Explore);
        }

        #[test]
        fn rejected_summary_returns_to_explore() {
            let signals = TurnSignals {
                summary_ready: Some(false),
                ..Default::default()
            };
            let res = engine().resolve_exit(CoachLoop::Summarize, &signals);
            assert_eq!(res.phase, CoachLoop::Explore);
            assert_eq!(res.fired, Some(TransitionRule::SummaryRejected));
        }

        #[test]
        fn ready_summary_stays_in_summarize() {
            let signals = TurnSignals {
                summary_ready: Some(true),
                force_structural: true,
                ..Default::default()
            };
            let res = engine().resolve_exit(CoachLoop::Summarize, &signals);
            assert_eq!(res.phase, CoachLoop::Summarize);
            assert_eq!(res.fired, None);
        }

        #[test]
        fn structure_never_exits() {
            let signals = TurnSignals {
                force_structural: true,
                turns: 10,
                clarity: 1.0,
                summary_ready: Some(false),
                ..Default::default()
            };
            let res = engine().resolve_exit(CoachLoop::Structure, &signals);
            assert_eq!(res.phase, CoachLoop::Structure);
        }

        #[test]
        fn custom_thresholds_apply() {
            let engine = PhaseTransitionEngine::new(TransitionThresholds {
                min_turns: 1,
                clarity: 0.1,
            });
            let signals = TurnSignals {
                turns: 1,
                clarity: 0.1,
                ..Default::default()
            };
            assert_eq!(
                engine.resolve_exit(CoachLoop::Explore, &signals).phase,
                CoachLoop::Summarize
            );
        }
    }

    #[test]
    fn precedence_order_is_confirmation_forced_threshold() {
        assert_eq!(
            TransitionRule::ORDERED,
            [
                TransitionRule::ProblemConfirmed,
                TransitionRule::ForcedStructural,
                TransitionRule::ClarityThreshold,
                TransitionRule::SummaryRejected,
            ]
        );
        assert_eq!(TransitionRule::ProblemConfirmed.stage(), RuleStage::Entry);
    }
}
