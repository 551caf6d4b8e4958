//! Signal lexicon.
//!
//! Fixed dictionaries the classifier and sanitizer work from: behavioral
//! (risk) and emotional pattern triggers, grounding keywords for clarity
//! scoring, and the coach-cliché phrases banned from generated replies.
//!
//! All phrases are lower-case; matching lower-cases the input instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which dictionary a pattern label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Trade-handling behavior that breaks risk discipline.
    Risk,
    /// Emotional state reported by the trader.
    Emotional,
}

/// A named behavioral or emotional signal detected by keyword matching.
///
/// Declaration order is the sort order used by label sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternLabel {
    RemoveStop,
    MoveStop,
    EarlyClose,
    Averaging,
    Fomo,
    RuleBreaking,
    SelfDoubt,
    FearOfLoss,
    Chaos,
}

impl PatternLabel {
    /// Every label, risk patterns first.
    pub const ALL: [PatternLabel; 9] = [
        PatternLabel::RemoveStop,
        PatternLabel::MoveStop,
        PatternLabel::EarlyClose,
        PatternLabel::Averaging,
        PatternLabel::Fomo,
        PatternLabel::RuleBreaking,
        PatternLabel::SelfDoubt,
        PatternLabel::FearOfLoss,
        PatternLabel::Chaos,
    ];

    /// Wire name of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoveStop => "remove_stop",
            Self::MoveStop => "move_stop",
            Self::EarlyClose => "early_close",
            Self::Averaging => "averaging",
            Self::Fomo => "fomo",
            Self::RuleBreaking => "rule_breaking",
            Self::SelfDoubt => "self_doubt",
            Self::FearOfLoss => "fear_of_loss",
            Self::Chaos => "chaos",
        }
    }

    /// Dictionary the label lives in.
    pub fn kind(&self) -> PatternKind {
        match self {
            Self::SelfDoubt | Self::FearOfLoss | Self::Chaos => PatternKind::Emotional,
            _ => PatternKind::Risk,
        }
    }

    /// Trigger phrases; any one of them occurring as a substring fires the label.
    pub fn triggers(&self) -> &'static [&'static str] {
        match self {
            Self::RemoveStop => &["убираю стоп", "снял стоп", "без стопа"],
            Self::MoveStop => &["двигаю стоп", "отодвинул стоп", "переставил стоп"],
            Self::EarlyClose => &["закрыл рано", "вышел в ноль", "мизерный плюс", "ранний выход"],
            Self::Averaging => &["усреднение", "доливался против", "докупал против"],
            Self::Fomo => &["поезд уедет", "упустил", "уйдёт без меня", "страх упустить"],
            Self::RuleBreaking => &["нарушил план", "отошёл от плана", "игнорировал план"],
            Self::SelfDoubt => &["сомневаюсь", "не уверен", "стресс", "паника", "волнение"],
            Self::FearOfLoss => &["страх потерь", "боюсь стопа", "не хочу быть обманутым"],
            Self::Chaos => &["хаос", "суета", "путаюсь"],
        }
    }

    /// Returns true for risk-dictionary labels.
    pub fn is_risk(&self) -> bool {
        self.kind() == PatternKind::Risk
    }
}

impl fmt::Display for PatternLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temporal markers and trade-mechanics terms that signal situated detail.
pub const GROUNDING_KEYWORDS: [&str; 26] = [
    "вчера",
    "сегодня",
    "на днях",
    "на прошлой неделе",
    "на выходных",
    "когда",
    "тогда",
    "в момент",
    "после входа",
    "после открытия",
    "в сделке",
    "стоп",
    "тейк",
    "объём",
    "позиция",
    "вошёл",
    "закрыл",
    "открыл",
    "план",
    "сетап",
    "лонг",
    "шорт",
    "перенёс",
    "изменил",
    "поставил",
    "снял",
];

/// Openers of templated coaching advice that must never reach the user.
pub const BANNED_TEMPLATES: [&str; 12] = [
    "понимаю",
    "это может быть",
    "важно понять",
    "давай рассмотрим",
    "было бы полезно",
    "попробуй",
    "используй",
    "придерживайся",
    "установи",
    "сфокусируйся",
    "следуй",
    "пересмотри",
];

/// Frequency words that stand in for a concrete case.
pub const VAGUE_WORDS: [&str; 8] = [
    "определенн",
    "иногда",
    "бывает",
    "какие-то",
    "как-то",
    "периодически",
    "редко",
    "часто",
];

/// First-person trading actions; their presence means the user named what
/// they actually do.
pub const BEHAVIOR_VERBS: [&str; 29] = [
    "вхожу",
    "войти",
    "закрываю",
    "закрыть",
    "двигаю",
    "двигать",
    "переношу",
    "усредняю",
    "усреднить",
    "пересиживаю",
    "пересидеть",
    "добавляю",
    "добавить",
    "снижаю",
    "снизить",
    "повышаю",
    "повысить",
    "удваиваю",
    "удвоить",
    "фиксирую",
    "зафиксировать",
    "не ставлю",
    "ставлю",
    "меняю",
    "менять",
    "прыгаю",
    "прыгать",
    "ломаю",
    "ломать",
];
