//! Coach generation - JSON-mode completions for the explore and summarize phases.
//!
//! Both operations are total: any provider failure, timeout or malformed
//! body is logged and replaced by a fixed fallback reply, so the caller
//! always gets something it can send.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::coaching::{
    draft_problem_statement, extract_problem_summary, has_behavior, is_truthy, is_vague,
    ResponseSanitizer, Turn, TurnRole, DEFAULT_STYLE,
};
use crate::ports::{AIError, AIProvider, CompletionRequest, MessageRole, RequestMetadata};

/// Reply when explore produced no usable text.
pub const EXPLORE_EMPTY_FALLBACK: &str =
    "Давай на примере: где/когда это было и что именно сделал?";
/// Reply when the explore call failed.
pub const EXPLORE_FAILURE_FALLBACK: &str =
    "Окей, уточню: когда именно в последний раз это случилось и что сделал?";
/// Reply when summarize produced no usable text.
pub const SUMMARIZE_EMPTY_FALLBACK: &str =
    "Похоже, мы близко — сформулирую одной строкой и сверимся.";
/// Reply when the summarize call failed.
pub const SUMMARIZE_FAILURE_FALLBACK: &str = "Соберу в одну строку и сверимся, окей?";

/// Explore focus when the message leans on frequency words.
const VAGUE_FOCUS: &str =
    "Ответ размытый: попроси конкретику, в какие именно дни или условиях это случается.";
/// Explore focus when the message names no action.
const BEHAVIOR_FOCUS: &str =
    "Действие не названо: уточни, что именно пользователь делает в этот момент (глаголами).";

/// Tunables of the generation calls.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    /// Most recent history turns sent with each call.
    pub history_window: usize,
    pub explore_temperature: f32,
    pub summarize_temperature: f32,
    /// Persona name used in the instructions.
    pub coach_name: String,
    /// Upper bound for one provider call.
    pub timeout: Duration,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            history_window: 16,
            explore_temperature: 0.4,
            summarize_temperature: 0.3,
            coach_name: "Алекс".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Why a generation call produced no usable object.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("provider error: {0}")]
    Provider(#[from] AIError),

    #[error("generation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl GenerationError {
    /// Log label for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Provider(err) if err.is_malformed_response() => "malformed_response",
            GenerationError::Malformed(_) => "malformed_response",
            GenerationError::Provider(_) | GenerationError::TimedOut(_) => "generation_failure",
        }
    }
}

/// Inputs shared by both generation operations.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    /// Address register, e.g. "ты" or "вы".
    pub style: &'a str,
    /// Prior turns, oldest first. Does not include `user_text`.
    pub history: &'a [Turn],
    pub user_text: &'a str,
}

/// Explore outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ExploreReply {
    pub response_text: String,
    /// Key-value facts the model wants remembered.
    pub store: Map<String, Value>,
}

impl ExploreReply {
    fn fallback() -> Self {
        Self {
            response_text: EXPLORE_FAILURE_FALLBACK.to_string(),
            store: Map::new(),
        }
    }
}

/// Summarize outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReply {
    pub response_text: String,
    pub propose_summary: String,
    /// Never true while `propose_summary` is empty.
    pub ask_confirm: bool,
}

impl SummaryReply {
    fn fallback() -> Self {
        Self {
            response_text: SUMMARIZE_FAILURE_FALLBACK.to_string(),
            propose_summary: String::new(),
            ask_confirm: false,
        }
    }
}

/// Generation adapter over the [`AIProvider`] port.
#[derive(Clone)]
pub struct CoachGenerator {
    provider: Arc<dyn AIProvider>,
    sanitizer: ResponseSanitizer,
    settings: GeneratorSettings,
}

impl CoachGenerator {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self {
            provider,
            sanitizer: ResponseSanitizer::default(),
            settings: GeneratorSettings::default(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: ResponseSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_settings(mut self, settings: GeneratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Clarifying question for the explore phase.
    pub async fn explore(&self, input: GenerationInput<'_>, metadata: RequestMetadata) -> ExploreReply {
        let focus = explore_focus(input.user_text);
        let request = self
            .build_request(
                explore_instructions(&self.settings.coach_name, input.style, focus),
                input,
                metadata,
            )
            .with_temperature(self.settings.explore_temperature);

        match self.complete_object(request).await {
            Ok(object) => {
                let text = self.sanitizer.strip_templates(string_field(&object, "response_text"));
                let response_text = if text.is_empty() {
                    EXPLORE_EMPTY_FALLBACK.to_string()
                } else {
                    text
                };
                let store = match object.get("store") {
                    Some(Value::Object(store)) => store.clone(),
                    _ => Map::new(),
                };
                ExploreReply {
                    response_text,
                    store,
                }
            }
            Err(err) => {
                warn!(operation = "explore", kind = err.kind(), error = %err, "Generation failed, using fallback");
                ExploreReply::fallback()
            }
        }
    }

    /// Restatement of the problem with a confirmation request.
    pub async fn summarize(&self, input: GenerationInput<'_>, metadata: RequestMetadata) -> SummaryReply {
        let hint = extract_problem_summary(input.history);
        let notes: Vec<&str> = input
            .history
            .iter()
            .filter(|turn| turn.is_user())
            .map(Turn::content)
            .chain(std::iter::once(input.user_text))
            .collect();
        let draft = draft_problem_statement(&notes);
        let request = self
            .build_request(
                summarize_instructions(&self.settings.coach_name, input.style, &hint, &draft),
                input,
                metadata,
            )
            .with_temperature(self.settings.summarize_temperature);

        match self.complete_object(request).await {
            Ok(object) => {
                let text = self.sanitizer.strip_templates(string_field(&object, "response_text"));
                let propose_summary = string_field(&object, "propose_summary").trim().to_string();
                let ask_confirm = !propose_summary.is_empty()
                    && object.get("ask_confirm").map(is_truthy).unwrap_or(false);
                SummaryReply {
                    response_text: if text.is_empty() {
                        SUMMARIZE_EMPTY_FALLBACK.to_string()
                    } else {
                        text
                    },
                    propose_summary,
                    ask_confirm,
                }
            }
            Err(err) => {
                warn!(operation = "summarize", kind = err.kind(), error = %err, "Generation failed, using fallback");
                SummaryReply::fallback()
            }
        }
    }

    fn build_request(
        &self,
        instructions: String,
        input: GenerationInput<'_>,
        metadata: RequestMetadata,
    ) -> CompletionRequest {
        // Window first, then drop non-dialogue turns inside it
        let skip = input.history.len().saturating_sub(self.settings.history_window);
        let window = input.history[skip..]
            .iter()
            .filter(|turn| turn.role().is_dialogue());

        let mut request = CompletionRequest::new(metadata)
            .with_system_prompt(instructions)
            .json_object();
        for turn in window {
            let role = match turn.role() {
                TurnRole::Assistant => MessageRole::Assistant,
                _ => MessageRole::User,
            };
            request = request.with_message(role, turn.content());
        }
        request.with_message(MessageRole::User, input.user_text)
    }

    /// Runs one completion under the timeout and decodes a JSON object.
    async fn complete_object(&self, request: CompletionRequest) -> Result<Map<String, Value>, GenerationError> {
        debug!(
            trace_id = %request.metadata.trace_id,
            messages = request.messages.len(),
            prompt_chars = request.system_prompt.as_deref().map(|p| p.chars().count()).unwrap_or(0),
            "Requesting coach completion"
        );

        let response = tokio::time::timeout(self.settings.timeout, self.provider.complete(request))
            .await
            .map_err(|_| GenerationError::TimedOut(self.settings.timeout))??;

        parse_object(&response.content)
    }
}

/// Decodes provider content. Blank content counts as an empty object.
fn parse_object(content: &str) -> Result<Map<String, Value>, GenerationError> {
    let raw = if content.trim().is_empty() { "{}" } else { content };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(GenerationError::Malformed(format!(
            "expected a JSON object, got {}",
            json_type(&other)
        ))),
        Err(err) => Err(GenerationError::Malformed(err.to_string())),
    }
}

/// String value of `key`, empty when missing or not a string.
fn string_field<'a>(object: &'a Map<String, Value>, key: &str) -> &'a str {
    object.get(key).and_then(Value::as_str).unwrap_or("")
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn register(style: &str) -> &str {
    let style = style.trim();
    if style.is_empty() {
        DEFAULT_STYLE
    } else {
        style
    }
}

/// What the next clarifying question should go after, if anything.
fn explore_focus(user_text: &str) -> Option<&'static str> {
    if is_vague(user_text) {
        Some(VAGUE_FOCUS)
    } else if !has_behavior(user_text) {
        Some(BEHAVIOR_FOCUS)
    } else {
        None
    }
}

fn explore_instructions(coach_name: &str, style: &str, focus: Option<&str>) -> String {
    let mut instructions = format!(
        "Ты — {coach_name}, коуч-наставник по трейдингу. Общайся живо на «{style}».\n\
         Фаза — калибровка: уточнять контекст/эмоции/мысли, без советов и техник.\n\
         Короткие вопросы, отражение смысла. Формат — JSON: response_text, store.",
        coach_name = coach_name,
        style = register(style),
    );
    if let Some(focus) = focus {
        instructions.push('\n');
        instructions.push_str(focus);
    }
    instructions
}

fn summarize_instructions(coach_name: &str, style: &str, hint: &str, draft: &str) -> String {
    let mut instructions = format!(
        "Ты — {coach_name}. Общайся на «{style}». Сформулируй проблему словами пользователя и попроси подтвердить.\n\
         Без советов, без техник. JSON: response_text, propose_summary, ask_confirm (bool).\n\
         Подсказка по сигналам из диалога: {hint}",
        coach_name = coach_name,
        style = register(style),
        hint = hint,
    );
    if !draft.is_empty() {
        instructions.push_str("\nЧерновик формулировки словами пользователя: ");
        instructions.push_str(draft);
    }
    instructions
}
