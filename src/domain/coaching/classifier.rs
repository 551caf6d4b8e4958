//! Text classifier.
//!
//! Lexical signal detection over free text, the clarity heuristic over
//! the user's side of the conversation, and two lexical renderings of the
//! problem (trigger list and draft statement). Everything here is a pure
//! function of its inputs.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use super::lexicon::{PatternLabel, BEHAVIOR_VERBS, GROUNDING_KEYWORDS, VAGUE_WORDS};
use super::state::Turn;

/// Denominator that maps grounding-keyword hits onto `[0, 1]`.
pub const CLARITY_DENOMINATOR: f64 = 12.0;

/// Only the most recent user text (in characters) is scored.
pub const CLARITY_WINDOW_CHARS: usize = 1200;

/// Prefix of the rendered problem summary.
const SUMMARY_PREFIX: &str = "Триггеры: ";

/// Rendered when no pattern has been detected yet.
const SUMMARY_PLACEHOLDER: &str = "нужен пример";

/// Most recent notes the draft statement is built from.
pub const DRAFT_NOTES: usize = 5;

static DRAFT_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(когда|в дни|после|перед|в ситуац)[^.]{5,80}").expect("context regex compiles")
});

static DRAFT_EMOTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(тревог|страх|азарт|напряжен|паник|давлен)[^.]{0,40}")
        .expect("emotion regex compiles")
});

/// Each behavior verb with up to 60 characters of surrounding text.
static DRAFT_BEHAVIOR: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    BEHAVIOR_VERBS
        .iter()
        .map(|verb| {
            let span = Regex::new(&format!(r"(?i).{{0,60}}{}.{{0,60}}", regex::escape(verb)))
                .expect("escaped verb compiles");
            (*verb, span)
        })
        .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex compiles"));

/// Tunable parameters of the clarity heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClarityParams {
    pub window_chars: usize,
    pub denominator: f64,
}

impl Default for ClarityParams {
    fn default() -> Self {
        Self {
            window_chars: CLARITY_WINDOW_CHARS,
            denominator: CLARITY_DENOMINATOR,
        }
    }
}

/// Returns every label with at least one trigger occurring in `text`.
///
/// Matching is case-insensitive and unanchored.
pub fn detect_patterns(text: &str) -> BTreeSet<PatternLabel> {
    let lowered = text.to_lowercase();
    PatternLabel::ALL
        .into_iter()
        .filter(|label| label.triggers().iter().any(|t| lowered.contains(t)))
        .collect()
}

/// Scores how much concrete, situated detail the user has given so far.
pub fn measure_clarity(history: &[Turn]) -> f64 {
    measure_clarity_with(history, ClarityParams::default())
}

/// [`measure_clarity`] with explicit parameters.
pub fn measure_clarity_with(history: &[Turn], params: ClarityParams) -> f64 {
    let joined = history
        .iter()
        .filter(|turn| turn.is_user())
        .map(Turn::content)
        .collect::<Vec<_>>()
        .join(" ");

    let window = tail_chars(&joined, params.window_chars).to_lowercase();
    let signals = GROUNDING_KEYWORDS
        .iter()
        .filter(|kw| window.contains(*kw))
        .count();

    if params.denominator <= 0.0 {
        return if signals > 0 { 1.0 } else { 0.0 };
    }
    (signals as f64 / params.denominator).clamp(0.0, 1.0)
}

/// True if `text` carries a risk pattern, fear of loss, or self-doubt.
pub fn should_force_structural(text: &str) -> bool {
    detect_patterns(text).iter().any(|label| {
        label.is_risk() || matches!(label, PatternLabel::FearOfLoss | PatternLabel::SelfDoubt)
    })
}

/// True if `text` leans on frequency words ("иногда", "бывает") instead of
/// a concrete case.
pub fn is_vague(text: &str) -> bool {
    let lowered = text.to_lowercase();
    VAGUE_WORDS.iter().any(|w| lowered.contains(w))
}

/// True if `text` names a trading action in the first person.
pub fn has_behavior(text: &str) -> bool {
    let lowered = text.to_lowercase();
    BEHAVIOR_VERBS.iter().any(|v| lowered.contains(v))
}

/// Drafts a one-line problem statement from the user's own words:
/// context → behavior → feelings.
///
/// Only the last [`DRAFT_NOTES`] non-blank notes are read. Returns an empty
/// string when there is nothing to draft from.
pub fn draft_problem_statement<S: AsRef<str>>(notes: &[S]) -> String {
    let notes: Vec<&str> = notes
        .iter()
        .map(|n| n.as_ref().trim())
        .filter(|n| !n.is_empty())
        .collect();
    let joined = notes[notes.len().saturating_sub(DRAFT_NOTES)..].join(" ");

    let context = DRAFT_CONTEXT.find(&joined).map(|m| m.as_str());
    let emotions = DRAFT_EMOTION.find(&joined).map(|m| m.as_str());

    let lowered = joined.to_lowercase();
    let behavior = DRAFT_BEHAVIOR
        .iter()
        .find(|(verb, _)| lowered.contains(verb))
        .and_then(|(_, span)| span.find(&joined))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| head_chars(&joined, 120).to_string());

    let mut parts = Vec::new();
    if let Some(context) = context {
        parts.push(render_context(clean_fragment(context)));
    }
    if !behavior.is_empty() {
        parts.push(format!("я {}", clean_fragment(&behavior)));
    }
    if let Some(emotions) = emotions {
        parts.push(format!("(обычно чувства: {})", clean_fragment(emotions)));
    }

    let draft = if parts.is_empty() {
        head_chars(&joined, 160).to_string()
    } else {
        parts.join(" → ")
    };
    WHITESPACE.replace_all(&draft, " ").trim().to_string()
}

fn clean_fragment(fragment: &str) -> &str {
    fragment.trim().trim_end_matches('.')
}

/// Opens the statement with "Когда", folding a leading "когда" of the
/// fragment itself.
fn render_context(context: &str) -> String {
    let mut chars = context.chars();
    let head: String = chars.by_ref().take(5).collect();
    if head.to_lowercase() == "когда" {
        return format!("Когда{}", chars.as_str());
    }

    let mut chars = context.chars();
    match chars.next() {
        Some(first) => format!("Когда {}{}", first.to_lowercase(), chars.as_str()),
        None => String::new(),
    }
}

/// Renders the patterns found across all user turns as a short synthesis.
///
/// Depends only on the set of labels detected, never on turn order.
pub fn extract_problem_summary(history: &[Turn]) -> String {
    let labels: BTreeSet<PatternLabel> = history
        .iter()
        .filter(|turn| turn.is_user())
        .flat_map(|turn| detect_patterns(turn.content()))
        .collect();

    let has = |label: PatternLabel| labels.contains(&label);
    let mut parts = Vec::new();
    if has(PatternLabel::Fomo) {
        parts.push("FOMO (страх упустить)");
    }
    if has(PatternLabel::RemoveStop) || has(PatternLabel::MoveStop) {
        parts.push("трогаешь/снимаешь стоп");
    }
    if has(PatternLabel::EarlyClose) {
        parts.push("ранний выход/«в ноль»");
    }
    if has(PatternLabel::Averaging) {
        parts.push("усреднение против позиции");
    }
    if has(PatternLabel::FearOfLoss) {
        parts.push("страх стопа/потерь");
    }
    if has(PatternLabel::SelfDoubt) {
        parts.push("сомнения после входа");
    }

    if parts.is_empty() {
        format!("{}{}", SUMMARY_PREFIX, SUMMARY_PLACEHOLDER)
    } else {
        format!("{}{}", SUMMARY_PREFIX, parts.join(", "))
    }
}

/// First `n` characters of `s`.
fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Last `n` characters of `s`.
fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let skip = count - n;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}
