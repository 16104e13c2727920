//! Contracts between the quiz session and the services it consumes.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::config::ConfigParams;
use crate::error::ApiError;
use crate::models::Question;

/// Grader verdict for one submission.
///
/// `success == false` means the submission itself was refused, not that the
/// answer was wrong. `correct` only means something when `success` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReply {
    pub success: bool,
    pub correct: bool,
}

/// Supplies localized texts and tunables, fetched once per session.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn fetch_config(&self) -> Result<ConfigParams, ApiError>;
}

/// Validates access tokens and serves the ordered questions.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuestionBankClient: Send + Sync {
    /// True iff the token authorizes play. Failures collapse to `false`.
    async fn validate_token(&self, survey_id: i64, access_token: &str) -> bool;

    async fn load_questions(
        &self,
        survey_id: i64,
        access_token: &str,
    ) -> Result<Vec<Question>, ApiError>;
}

/// Grades one answer server-side.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnswerGrader: Send + Sync {
    async fn submit_answer(
        &self,
        survey_id: i64,
        question_id: i64,
        option_id: i64,
        access_token: &str,
    ) -> Result<SubmitReply, ApiError>;
}

/// The three services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub config: Arc<dyn ConfigProvider>,
    pub bank: Arc<dyn QuestionBankClient>,
    pub grader: Arc<dyn AnswerGrader>,
}

impl Collaborators {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        bank: Arc<dyn QuestionBankClient>,
        grader: Arc<dyn AnswerGrader>,
    ) -> Self {
        Self {
            config,
            bank,
            grader,
        }
    }

    /// Use one value for all three roles.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ConfigProvider + QuestionBankClient + AnswerGrader + 'static,
    {
        Self {
            config: backend.clone(),
            bank: backend.clone(),
            grader: backend,
        }
    }
}
