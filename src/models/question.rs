use serde::{Deserialize, Serialize};

/// Option id used when the bank sends a missing or non-numeric id.
pub const OPTION_ID_SENTINEL: i64 = 0;

/// One selectable answer. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: i64,
    pub text: String,
}

/// A quiz item as the player sees it. The correct answer never reaches the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub title: String,
    pub options: Vec<QuizOption>,
    pub explanation: Option<String>,
    /// Set once the grader accepted an answer.
    pub answered: bool,
    /// Grading result, only meaningful once `answered` is set.
    pub correct: Option<bool>,
    /// Set when the countdown expired before an answer was accepted.
    pub skipped: bool,
}

impl Question {
    pub fn new(id: i64, title: impl Into<String>, options: Vec<QuizOption>) -> Self {
        Self {
            id,
            title: title.into(),
            options,
            explanation: None,
            answered: false,
            correct: None,
            skipped: false,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        let explanation = explanation.into();
        self.explanation = (!explanation.trim().is_empty()).then_some(explanation);
        self
    }

    pub fn has_option(&self, option_id: i64) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }

    /// Whether the question reached a terminal marker (answered or skipped).
    pub fn is_settled(&self) -> bool {
        self.answered || self.skipped
    }

    /// Record an accepted grading result. No-op once settled.
    pub fn mark_answered(&mut self, correct: bool) -> bool {
        if self.is_settled() {
            return false;
        }
        self.answered = true;
        self.correct = Some(correct);
        true
    }

    /// Record a countdown expiry. No-op once settled.
    pub fn mark_skipped(&mut self) -> bool {
        if self.is_settled() {
            return false;
        }
        self.skipped = true;
        true
    }
}
