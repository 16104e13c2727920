//! Quiz configuration fetched from the question bank.
//!
//! The bank answers with a flat string map: localized texts, indicator
//! icons and a few numeric tunables. Any key may be missing, so every
//! lookup goes through a fallback table.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Countdown length when the bank does not provide `timer_duration`.
pub const DEFAULT_TIMER_DURATION_SECS: u32 = 15;
/// Feedback display time after a graded answer.
pub const DEFAULT_ANSWER_ADVANCE_DELAY: Duration = Duration::from_millis(2000);
/// Feedback display time after a countdown expiry.
pub const DEFAULT_TIMEOUT_ADVANCE_DELAY: Duration = Duration::from_millis(1000);

pub const KEY_TIMER_DURATION: &str = "timer_duration";
pub const KEY_ANSWER_ADVANCE_DELAY_MS: &str = "answer_advance_delay_ms";
pub const KEY_TIMEOUT_ADVANCE_DELAY_MS: &str = "timeout_advance_delay_ms";

const FALLBACK_TEXTS: &[(&str, &str)] = &[
    ("feedback_correct", "Correct! 🎉"),
    ("feedback_incorrect", "Incorrect ❌"),
    ("feedback_skipped", "Time's up!"),
    ("feedback_submit_error", "Could not send your answer. Try again."),
    ("feedback_no_questions", "This quiz has no questions."),
    ("feedback_load_questions_error", "Could not load the questions."),
    ("feedback_config_error", "Something went wrong while loading the quiz."),
    ("invalid_token", "Invalid token! Please enter a valid PIN."),
    ("survey_not_found", "Oops! The quiz with ID %s does not exist."),
    ("quiz_finished", "End of the quiz"),
    ("loading_questions", "Loading questions..."),
    ("loading_config", "Loading configuration..."),
    ("question_progress", "Question %s of %s"),
    ("timer_format", "%ss"),
    ("answers_count", "%s Answers"),
    ("icon_correct", "✅"),
    ("icon_incorrect", "❌"),
    ("icon_skipped", "❓"),
    ("icon_unanswered", "·"),
    ("back_to_home", "Press [Q] to exit"),
];

/// Localized strings and tunables, keyed the way the bank sends them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigParams(BTreeMap<String, String>);

impl ConfigParams {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self(values)
    }

    /// Every known text key with its fallback value.
    pub fn defaults() -> Self {
        Self(
            FALLBACK_TEXTS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// Text for `key`, falling back to the built-in table, then to the key itself.
    pub fn text(&self, key: &str) -> String {
        self.get(key)
            .filter(|v| !v.is_empty())
            .or_else(|| fallback_text(key))
            .unwrap_or(key)
            .to_string()
    }

    /// Text for `key` with each `%s` replaced by the next argument.
    pub fn format(&self, key: &str, args: &[&dyn std::fmt::Display]) -> String {
        let mut text = self.text(key);
        for arg in args {
            let Some(pos) = text.find("%s") else {
                break;
            };
            text.replace_range(pos..pos + 2, &arg.to_string());
        }
        text
    }
}

fn fallback_text(key: &str) -> Option<&'static str> {
    FALLBACK_TEXTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
}

/// Timing knobs for one session, fixed once the config is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTuning {
    pub timer_duration_secs: u32,
    pub answer_advance_delay: Duration,
    pub timeout_advance_delay: Duration,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            timer_duration_secs: DEFAULT_TIMER_DURATION_SECS,
            answer_advance_delay: DEFAULT_ANSWER_ADVANCE_DELAY,
            timeout_advance_delay: DEFAULT_TIMEOUT_ADVANCE_DELAY,
        }
    }
}

impl SessionTuning {
    pub fn from_params(params: &ConfigParams) -> Self {
        let defaults = Self::default();
        Self {
            timer_duration_secs: parse_number(params, KEY_TIMER_DURATION)
                .and_then(|secs| u32::try_from(secs).ok())
                .map(|secs| secs.max(1))
                .unwrap_or(defaults.timer_duration_secs),
            answer_advance_delay: parse_number(params, KEY_ANSWER_ADVANCE_DELAY_MS)
                .map(Duration::from_millis)
                .unwrap_or(defaults.answer_advance_delay),
            timeout_advance_delay: parse_number(params, KEY_TIMEOUT_ADVANCE_DELAY_MS)
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout_advance_delay),
        }
    }

    /// Write the tunables back as params, the shape the bank serves them in.
    pub fn write_into(&self, params: &mut ConfigParams) {
        params.insert(KEY_TIMER_DURATION, self.timer_duration_secs.to_string());
        params.insert(
            KEY_ANSWER_ADVANCE_DELAY_MS,
            self.answer_advance_delay.as_millis().to_string(),
        );
        params.insert(
            KEY_TIMEOUT_ADVANCE_DELAY_MS,
            self.timeout_advance_delay.as_millis().to_string(),
        );
    }
}

fn parse_number(params: &ConfigParams, key: &str) -> Option<u64> {
    let raw = params.get(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring non-numeric config value {key}={raw:?}");
            None
        }
    }
}
