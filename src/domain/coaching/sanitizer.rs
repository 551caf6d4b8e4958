//! Output sanitizer.
//!
//! Generated replies are never shown verbatim. The sanitizer drops control
//! characters and chat-template markers, cuts every sentence that opens with
//! a banned coaching cliché, normalizes whitespace and caps the length.

use once_cell::sync::Lazy;
use regex::Regex;

use super::lexicon::BANNED_TEMPLATES;

/// Maximum reply length in characters.
pub const MAX_REPLY_CHARS: usize = 1200;

/// Characters trimmed from both ends of a sanitized reply.
const EDGE_CHARS: &[char] = &[' ', ',', '.', '!', '?'];

/// Chat-template markers that must not leak into a reply.
const INJECTION_MARKERS: [&str; 11] = [
    "```system",
    "```assistant",
    "[INST]",
    "[/INST]",
    "<|system|>",
    "<|assistant|>",
    "<|user|>",
    "<|im_start|>",
    "<|im_end|>",
    "<<SYS>>",
    "<</SYS>>",
];

static BANNED_SPANS: Lazy<Vec<Regex>> = Lazy::new(|| {
    BANNED_TEMPLATES
        .iter()
        .map(|phrase| banned_span_regex(phrase).expect("built-in banned phrase compiles"))
        .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex compiles"));

static DEFAULT_SANITIZER: Lazy<ResponseSanitizer> = Lazy::new(ResponseSanitizer::new);

/// A span starting at a word boundary with `phrase` and running through the
/// next sentence terminator.
fn banned_span_regex(phrase: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)\b{}[^.!?]*[.!?]", regex::escape(phrase)))
}

/// Sanitizes generated replies before they reach the user.
#[derive(Debug, Clone)]
pub struct ResponseSanitizer {
    /// Banned phrases supplied on top of the built-in list.
    additional: Vec<Regex>,
    max_chars: usize,
}

impl Default for ResponseSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSanitizer {
    /// Creates a sanitizer with the built-in banned list.
    pub fn new() -> Self {
        Self {
            additional: Vec::new(),
            max_chars: MAX_REPLY_CHARS,
        }
    }

    /// Adds banned phrases. Blank entries are ignored.
    pub fn with_additional_phrases<I, S>(mut self, phrases: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for phrase in phrases {
            let phrase = phrase.as_ref().trim();
            if phrase.is_empty() {
                continue;
            }
            self.additional.push(banned_span_regex(phrase)?);
        }
        Ok(self)
    }

    /// Sets the length cap in characters.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Sanitizes a generated reply. Never fails; may return an empty string.
    ///
    /// # Steps
    /// 1. Remove control characters (whitespace controls are kept for step 4)
    /// 2. Strip chat-template markers
    /// 3. Cut banned-phrase sentences
    /// 4. Collapse whitespace, trim edges, cap length
    pub fn strip_templates(&self, text: &str) -> String {
        let cleaned = remove_control_chars(text);
        let mut result = strip_injection_markers(&cleaned);

        for re in BANNED_SPANS.iter().chain(self.additional.iter()) {
            result = re.replace_all(&result, " ").into_owned();
        }

        let collapsed = WHITESPACE.replace_all(&result, " ");
        let trimmed = collapsed.trim_matches(EDGE_CHARS);
        let capped: String = trimmed.chars().take(self.max_chars).collect();
        capped.trim_end_matches(EDGE_CHARS).to_string()
    }
}

/// Sanitizes `text` with the built-in configuration.
pub fn strip_templates(text: &str) -> String {
    DEFAULT_SANITIZER.strip_templates(text)
}

fn remove_control_chars(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect()
}

fn strip_injection_markers(s: &str) -> String {
    let mut result = s.to_string();
    for marker in INJECTION_MARKERS {
        result = result.replace(marker, " ");
    }
    result
}
