//! Coaching policy configuration
//!
//! Every field is a tunable. The defaults reproduce the production bot's
//! behavior.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::coach::GeneratorSettings;
use crate::domain::coaching::{
    ClarityParams, ResponseSanitizer, TransitionThresholds, CLARITY_DENOMINATOR,
    CLARITY_THRESHOLD, CLARITY_WINDOW_CHARS, DEFAULT_STYLE, MAX_REPLY_CHARS,
    MIN_TURNS_FOR_SUMMARY,
};

/// Coaching policy configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoachConfig {
    /// Keyword count that maps to full clarity
    pub clarity_denominator: f64,

    /// Trailing characters of user text considered for clarity
    pub clarity_window_chars: usize,

    /// Turns before the clarity threshold may end exploration
    pub min_turns_for_summary: u32,

    /// Clarity that ends exploration once enough turns passed
    pub clarity_threshold: f64,

    /// History turns sent with each generation call
    pub history_window: usize,

    /// Reply length cap in characters
    pub max_reply_chars: usize,

    /// Address register for new users
    pub default_style: String,

    /// Persona name in the instructions
    pub coach_name: String,

    pub explore_temperature: f32,

    pub summarize_temperature: f32,

    /// Phrases banned on top of the built-in list
    pub extra_banned_phrases: Vec<String>,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            clarity_denominator: CLARITY_DENOMINATOR,
            clarity_window_chars: CLARITY_WINDOW_CHARS,
            min_turns_for_summary: MIN_TURNS_FOR_SUMMARY,
            clarity_threshold: CLARITY_THRESHOLD,
            history_window: 16,
            max_reply_chars: MAX_REPLY_CHARS,
            default_style: DEFAULT_STYLE.to_string(),
            coach_name: "Алекс".to_string(),
            explore_temperature: 0.4,
            summarize_temperature: 0.3,
            extra_banned_phrases: Vec::new(),
        }
    }
}

impl CoachConfig {
    pub fn clarity_params(&self) -> ClarityParams {
        ClarityParams {
            window_chars: self.clarity_window_chars,
            denominator: self.clarity_denominator,
        }
    }

    pub fn thresholds(&self) -> TransitionThresholds {
        TransitionThresholds {
            min_turns: self.min_turns_for_summary,
            clarity: self.clarity_threshold,
        }
    }

    /// Generation settings with the provider call bounded by `timeout`
    pub fn generator_settings(&self, timeout: Duration) -> GeneratorSettings {
        GeneratorSettings {
            history_window: self.history_window,
            explore_temperature: self.explore_temperature,
            summarize_temperature: self.summarize_temperature,
            coach_name: self.coach_name.clone(),
            timeout,
        }
    }

    /// Sanitizer with the configured cap and extra phrases
    pub fn sanitizer(&self) -> Result<ResponseSanitizer, ValidationError> {
        let phrases: Vec<&str> = self
            .extra_banned_phrases
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();

        ResponseSanitizer::new()
            .with_max_chars(self.max_reply_chars)
            .with_additional_phrases(phrases.iter().copied())
            .map_err(|e| ValidationError::InvalidBannedPhrase {
                phrase: phrases.join(", "),
                reason: e.to_string(),
            })
    }

    /// Validate coaching configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.clarity_denominator.is_finite() && self.clarity_denominator > 0.0) {
            return Err(ValidationError::out_of_range("clarity_denominator", "must be positive"));
        }
        if self.clarity_window_chars == 0 {
            return Err(ValidationError::out_of_range("clarity_window_chars", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.clarity_threshold) {
            return Err(ValidationError::out_of_range("clarity_threshold", "must be within [0, 1]"));
        }
        if self.history_window == 0 {
            return Err(ValidationError::out_of_range("history_window", "must be positive"));
        }
        if self.max_reply_chars == 0 {
            return Err(ValidationError::out_of_range("max_reply_chars", "must be positive"));
        }
        for (field, temperature) in [
            ("explore_temperature", self.explore_temperature),
            ("summarize_temperature", self.summarize_temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ValidationError::out_of_range(field, "must be within [0, 2]"));
            }
        }
        if self.default_style.trim().is_empty() {
            return Err(ValidationError::MissingRequired("COACH__DEFAULT_STYLE"));
        }
        if self.coach_name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("COACH__COACH_NAME"));
        }
        self.sanitizer()?;
        Ok(())
    }
}
