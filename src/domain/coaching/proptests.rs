//! Property-based tests for the classifier and sanitizer.
//!
//! - Clarity stays in `[0, 1]` and never drops when a new keyword is added
//! - Pattern detection agrees with a naive substring check
//! - Sanitized output is bounded, trimmed and whitespace-normalized
//! - Problem summaries ignore turn order

use proptest::prelude::*;

use super::classifier::{detect_patterns, extract_problem_summary, measure_clarity};
use super::lexicon::{PatternLabel, GROUNDING_KEYWORDS};
use super::sanitizer::{strip_templates, MAX_REPLY_CHARS};
use super::state::Turn;

// ============================================================================
// Strategies
// ============================================================================

/// A phrase from the lexicon, in random case.
fn arb_lexicon_phrase() -> impl Strategy<Value = String> {
    let phrases: Vec<&'static str> = PatternLabel::ALL
        .iter()
        .flat_map(|l| l.triggers().iter().copied())
        .chain(GROUNDING_KEYWORDS.iter().copied())
        .collect();
    (prop::sample::select(phrases), any::<bool>()).prop_map(|(p, upper)| {
        if upper {
            p.to_uppercase()
        } else {
            p.to_string()
        }
    })
}

/// Free text mixing Cyrillic filler, punctuation, whitespace and lexicon phrases.
fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[а-яА-Я ]{0,20}",
            "[ .,!?\\t\\n]{1,4}",
            arb_lexicon_phrase(),
            Just("Понимаю, это сложно.".to_string()),
            Just("Попробуй ещё раз!".to_string()),
        ],
        0..12,
    )
    .prop_map(|parts| parts.concat())
}

fn arb_user_turns() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_text(), 0..6)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn clarity_is_bounded(texts in arb_user_turns()) {
        let history: Vec<Turn> = texts.into_iter().map(Turn::user).collect();
        let clarity = measure_clarity(&history);
        prop_assert!((0.0..=1.0).contains(&clarity));
    }

    #[test]
    fn new_keyword_never_lowers_clarity(
        text in "[а-я ]{0,80}",
        keyword in prop::sample::select(GROUNDING_KEYWORDS.to_vec()),
    ) {
        let before = measure_clarity(&[Turn::user(text.clone())]);
        let after = measure_clarity(&[Turn::user(format!("{} {}", text, keyword))]);
        prop_assert!(after >= before);
    }

    #[test]
    fn detection_matches_substring_check(text in arb_text()) {
        let found = detect_patterns(&text);
        let lowered = text.to_lowercase();
        for label in PatternLabel::ALL {
            let expected = label.triggers().iter().any(|t| lowered.contains(t));
            prop_assert_eq!(found.contains(&label), expected, "label {}", label);
        }
    }

    #[test]
    fn sanitized_output_is_normalized(text in arb_text()) {
        let out = strip_templates(&text);
        prop_assert!(out.chars().count() <= MAX_REPLY_CHARS);
        prop_assert!(!out.contains("  "));
        prop_assert!(!out.contains('\n') && !out.contains('\t'));
        for edge in [' ', ',', '.', '!', '?'] {
            prop_assert!(!out.starts_with(edge));
            prop_assert!(!out.ends_with(edge));
        }
    }

    #[test]
    fn summary_ignores_turn_order(texts in arb_user_turns()) {
        let forward: Vec<Turn> = texts.iter().cloned().map(Turn::user).collect();
        let backward: Vec<Turn> = texts.iter().rev().cloned().map(Turn::user).collect();
        prop_assert_eq!(extract_problem_summary(&forward), extract_problem_summary(&backward));
    }
}
