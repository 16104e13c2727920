//! Bank-side survey data. Unlike [`Question`](super::Question) these carry
//! the correct flags and never leave the server.

use serde::Deserialize;

use super::{Question, QuizOption};

#[derive(Debug, Clone, Deserialize)]
pub struct BankOption {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankQuestion {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub options: Vec<BankOption>,
}

impl BankQuestion {
    pub fn option(&self, option_id: i64) -> Option<&BankOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// The player-facing view of this question, without correct flags.
    pub fn to_public(&self) -> Question {
        let options = self
            .options
            .iter()
            .map(|o| QuizOption {
                id: o.id,
                text: o.text.clone(),
            })
            .collect();
        let question = Question::new(self.id, self.title.clone(), options);
        match &self.explanation {
            Some(explanation) => question.with_explanation(explanation.clone()),
            None => question,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Survey {
    pub id: i64,
    pub title: String,
    /// PIN players type to join.
    pub session_code: String,
    #[serde(default)]
    pub questions: Vec<BankQuestion>,
}

impl Survey {
    pub fn question(&self, question_id: i64) -> Option<&BankQuestion> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

/// Root of a bank file.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizBank {
    pub surveys: Vec<Survey>,
}
