//! Per-user conversation state and the patch the controller produces.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::phase::CoachLoop;

/// Address register used when the record carries none ("ты" = informal).
pub const DEFAULT_STYLE: &str = "ты";

/// Extension key holding a summary awaiting the user's answer.
pub const PENDING_SUMMARY_KEY: &str = "pending_summary";

/// Extension key holding the confirmed problem statement.
pub const PROBLEM_SUMMARY_KEY: &str = "problem_summary";

/// Top-level keys owned by the typed schema or the confirmation flow;
/// store payloads may not write them.
pub const RESERVED_KEYS: [&str; 6] = [
    "history",
    "style",
    "coach",
    "problem_confirmed",
    PENDING_SUMMARY_KEY,
    PROBLEM_SUMMARY_KEY,
];

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    /// Out-of-band notices written by the surrounding application.
    System,
}

impl TurnRole {
    /// Returns true for roles that are part of the coach/user dialogue.
    pub fn is_dialogue(&self) -> bool {
        matches!(self, Self::User | Self::Assistant)
    }
}

/// One exchange unit in the history. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: TurnRole,
    content: String,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_user(&self) -> bool {
        self.role == TurnRole::User
    }
}

/// Coaching sub-state: clarity score, turn counter and current phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachState {
    #[serde(default, deserialize_with = "lenient_clarity")]
    pub clarity: f64,
    #[serde(default, deserialize_with = "lenient_turns")]
    pub turns: u32,
    #[serde(rename = "loop", default, deserialize_with = "lenient_loop")]
    pub phase: CoachLoop,
}

impl CoachState {
    /// Records a turn outcome. Clarity is clamped to `[0, 1]` and rounded to
    /// two decimals for storage.
    pub fn record(clarity: f64, turns: u32, phase: CoachLoop) -> Self {
        Self {
            clarity: round_clarity(clarity),
            turns,
            phase,
        }
    }
}

impl Default for CoachState {
    fn default() -> Self {
        Self {
            clarity: 0.0,
            turns: 0,
            phase: CoachLoop::Explore,
        }
    }
}

fn round_clarity(clarity: f64) -> f64 {
    if !clarity.is_finite() {
        return 0.0;
    }
    (clarity.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

/// Per-user aggregate read from and written back to the state store.
///
/// Anything the record carries beyond the typed fields lands in
/// `extensions`; this is where generation `store` payloads accumulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default, deserialize_with = "lenient_history")]
    pub history: Vec<Turn>,

    #[serde(default = "default_style", deserialize_with = "lenient_style")]
    pub style: String,

    #[serde(
        default,
        deserialize_with = "lenient_coach",
        skip_serializing_if = "Option::is_none"
    )]
    pub coach: Option<CoachState>,

    #[serde(default, deserialize_with = "lenient_flag")]
    pub problem_confirmed: bool,

    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl ConversationState {
    /// Creates the state for a first contact.
    pub fn new() -> Self {
        Self::with_style(DEFAULT_STYLE)
    }

    /// Creates a first-contact state with a specific address register.
    pub fn with_style(style: impl Into<String>) -> Self {
        Self {
            history: Vec::new(),
            style: style.into(),
            coach: None,
            problem_confirmed: false,
            extensions: Map::new(),
        }
    }

    /// Coaching sub-state, defaulted when absent.
    pub fn coach_or_default(&self) -> CoachState {
        self.coach.clone().unwrap_or_default()
    }

    /// Current phase, `Explore` on first contact.
    pub fn phase(&self) -> CoachLoop {
        self.coach.as_ref().map(|c| c.phase).unwrap_or_default()
    }

    /// Appends a turn to the history.
    pub fn push_turn(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    /// Reads an extension field.
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    /// Reads a string extension field.
    pub fn extension_str(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).and_then(Value::as_str)
    }

    /// Merges a controller patch key-wise: `coach` is replaced and every
    /// extension key overwrites its previous value.
    pub fn apply(&mut self, updates: &StateUpdates) {
        self.coach = Some(updates.coach.clone());
        for (key, value) in &updates.extensions {
            self.extensions.insert(key.clone(), value.clone());
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial patch produced by one turn. Never applied by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdates {
    pub coach: CoachState,

    /// Store payload entries, written at top level on the wire.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl StateUpdates {
    pub fn new(coach: CoachState) -> Self {
        Self {
            coach,
            extensions: Map::new(),
        }
    }

    /// Merges a generation `store` payload, last write wins. Returns the keys
    /// that were dropped because they collide with typed fields.
    pub fn merge_store(&mut self, store: Map<String, Value>) -> Vec<String> {
        let mut rejected = Vec::new();
        for (key, value) in store {
            if RESERVED_KEYS.contains(&key.as_str()) {
                rejected.push(key);
                continue;
            }
            self.extensions.insert(key, value);
        }
        rejected
    }
}

fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}

/// Loose boolean reading of an untyped value: empty values, zero and null
/// are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn lenient_history<'de, D>(deserializer: D) -> Result<Vec<Turn>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_style<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw.as_str().map(str::trim) {
        Some(style) if !style.is_empty() => style.to_string(),
        _ => default_style(),
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(is_truthy(&raw))
}

fn lenient_coach<'de, D>(deserializer: D) -> Result<Option<CoachState>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Object(_) => serde_json::from_value(raw).ok(),
        _ => None,
    })
}

fn lenient_loop<'de, D>(deserializer: D) -> Result<CoachLoop, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_str().map(CoachLoop::parse_lenient).unwrap_or_default())
}

fn lenient_turns<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let turns = match &raw {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    };
    Ok(u32::try_from(turns).unwrap_or(u32::MAX))
}

fn lenient_clarity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_f64().map(round_clarity).unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod turns {
        use super::*;

        #[test]
        fn constructors_set_roles() {
            assert_eq!(Turn::user("a").role(), TurnRole::User);
            assert_eq!(Turn::assistant("b").role(), TurnRole::Assistant);
            assert!(Turn::user("a").is_user());
        }

        #[test]
        fn system_turns_are_not_dialogue() {
            assert!(!TurnRole::System.is_dialogue());
            assert!(TurnRole::User.is_dialogue());
            assert!(TurnRole::Assistant.is_dialogue());
        }

        #[test]
        fn turn_round_trips_with_lowercase_role() {
            let json = serde_json::to_value(Turn::user("привет")).unwrap();
            assert_eq!(json, json!({"role": "user", "content": "привет"}));
        }
    }

    mod coach_state {
        use super::*;

        #[test]
        fn record_rounds_and_clamps_clarity() {
            assert_eq!(CoachState::record(0.5833, 2, CoachLoop::Explore).clarity, 0.58);
            assert_eq!(CoachState::record(1.7, 2, CoachLoop::Explore).clarity, 1.0);
            assert_eq!(CoachState::record(-0.2, 2, CoachLoop::Explore).clarity, 0.0);
            assert_eq!(CoachState::record(f64::NAN, 2, CoachLoop::Explore).clarity, 0.0);
        }

        #[test]
        fn serializes_phase_as_loop() {
            let json = serde_json::to_value(CoachState::record(0.25, 3, CoachLoop::Summarize)).unwrap();
            assert_eq!(json, json!({"clarity": 0.25, "turns": 3, "loop": "summarize"}));
        }

        #[test]
        fn tolerates_damaged_fields() {
            let coach: CoachState =
                serde_json::from_value(json!({"clarity": "high", "turns": "4", "loop": 7})).unwrap();
            assert_eq!(coach.clarity, 0.0);
            assert_eq!(coach.turns, 4);
            assert_eq!(coach.phase, CoachLoop::Explore);
        }
    }

    mod conversation_state {
        use super::*;

        #[test]
        fn empty_record_is_first_contact() {
            let state: ConversationState = serde_json::from_value(json!({})).unwrap();
            assert!(state.history.is_empty());
            assert_eq!(state.style, DEFAULT_STYLE);
            assert_eq!(state.coach, None);
            assert!(!state.problem_confirmed);
            assert_eq!(state.coach_or_default(), CoachState::default());
        }

        #[test]
        fn non_object_coach_is_treated_as_missing() {
            let state: ConversationState =
                serde_json::from_value(json!({"coach": "broken"})).unwrap();
            assert_eq!(state.coach, None);
            assert_eq!(state.phase(), CoachLoop::Explore);
        }

        #[test]
        fn unknown_keys_land_in_extensions() {
            let state: ConversationState = serde_json::from_value(json!({
                "style": "вы",
                "coach": {"turns": 2, "loop": "summarize"},
                "free_notes": ["двигаю стоп"],
            }))
            .unwrap();
            assert_eq!(state.style, "вы");
            assert_eq!(state.phase(), CoachLoop::Summarize);
            assert_eq!(state.extension("free_notes"), Some(&json!(["двигаю стоп"])));
        }

        #[test]
        fn damaged_top_level_fields_are_defaulted() {
            let state: ConversationState = serde_json::from_value(json!({
                "problem_confirmed": 1,
                "style": null,
                "history": [
                    {"role": "user", "content": "двигаю стоп"},
                    {"role": "tool", "content": "служебное"},
                    "мусор",
                    {"role": "assistant", "content": "Когда?"}
                ],
            }))
            .unwrap();

            assert!(state.problem_confirmed);
            assert_eq!(state.style, DEFAULT_STYLE);
            assert_eq!(
                state.history,
                vec![Turn::user("двигаю стоп"), Turn::assistant("Когда?")]
            );
        }

        #[test]
        fn null_and_mistyped_fields_fall_back() {
            let state: ConversationState = serde_json::from_value(json!({
                "problem_confirmed": null,
                "style": 5,
                "history": {"role": "user"},
            }))
            .unwrap();

            assert!(!state.problem_confirmed);
            assert_eq!(state.style, DEFAULT_STYLE);
            assert!(state.history.is_empty());

            let state: ConversationState =
                serde_json::from_value(json!({"problem_confirmed": "", "style": "  вы "})).unwrap();
            assert!(!state.problem_confirmed);
            assert_eq!(state.style, "вы");
        }

        #[test]
        fn truthiness_follows_emptiness() {
            assert!(is_truthy(&json!(true)));
            assert!(is_truthy(&json!(1)));
            assert!(is_truthy(&json!(-0.5)));
            assert!(is_truthy(&json!("false")));
            assert!(is_truthy(&json!([0])));
            assert!(is_truthy(&json!({"a": 1})));
            assert!(!is_truthy(&json!(false)));
            assert!(!is_truthy(&json!(0)));
            assert!(!is_truthy(&json!(0.0)));
            assert!(!is_truthy(&json!("")));
            assert!(!is_truthy(&json!([])));
            assert!(!is_truthy(&json!({})));
            assert!(!is_truthy(&Value::Null));
        }

        #[test]
        fn apply_replaces_coach_and_overwrites_extensions() {
            let mut state = ConversationState::new();
            state.extensions.insert("mood".into(), json!("calm"));

            let mut updates = StateUpdates::new(CoachState::record(0.5, 1, CoachLoop::Summarize));
            updates.merge_store(Map::from_iter([("mood".to_string(), json!("tense"))]));
            state.apply(&updates);

            assert_eq!(state.phase(), CoachLoop::Summarize);
            assert_eq!(state.coach_or_default().turns, 1);
            assert_eq!(state.extension_str("mood"), Some("tense"));
        }
    }

    mod state_updates {
        use super::*;

        #[test]
        fn merge_store_rejects_reserved_keys() {
            let mut updates = StateUpdates::new(CoachState::default());
            let rejected = updates.merge_store(Map::from_iter([
                ("coach".to_string(), json!("hijack")),
                ("problem_confirmed".to_string(), json!(true)),
                (PENDING_SUMMARY_KEY.to_string(), json!("модель решила")),
                (PROBLEM_SUMMARY_KEY.to_string(), json!("модель решила")),
                ("setup".to_string(), json!("breakout")),
            ]));

            assert_eq!(rejected.len(), 4);
            assert!(!updates.extensions.contains_key(PENDING_SUMMARY_KEY));
            assert!(!updates.extensions.contains_key(PROBLEM_SUMMARY_KEY));
            assert_eq!(updates.extensions.len(), 1);
            assert_eq!(updates.coach, CoachState::default());
        }

        #[test]
        fn serializes_store_entries_at_top_level() {
            let mut updates = StateUpdates::new(CoachState::record(0.1, 1, CoachLoop::Explore));
            updates.merge_store(Map::from_iter([("setup".to_string(), json!("breakout"))]));

            let json = serde_json::to_value(&updates).unwrap();
            assert_eq!(json["setup"], "breakout");
            assert_eq!(json["coach"]["loop"], "explore");
        }
    }
}
