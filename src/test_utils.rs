//! Shared fakes and fixtures for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::time::{self, Duration};

use crate::client::api::{AnswerGrader, ConfigProvider, QuestionBankClient, SubmitReply};
use crate::config::{ConfigParams, KEY_TIMER_DURATION};
use crate::error::ApiError;
use crate::models::Question;

pub mod fixtures {
    use crate::client::state::{SessionLaunch, SessionState};
    use crate::config::{ConfigParams, KEY_TIMER_DURATION};
    use crate::models::{Question, QuizOption};

    /// Questions 101, 102, ... each offering options 7, 8 and 9.
    pub fn questions(count: usize) -> Vec<Question> {
        (0..count)
            .map(|i| {
                let options = [7, 8, 9]
                    .into_iter()
                    .map(|id| QuizOption {
                        id,
                        text: format!("Option {id}"),
                    })
                    .collect();
                Question::new(101 + i as i64, format!("Question {}", i + 1), options)
            })
            .collect()
    }

    pub fn launch(survey_id: i64) -> SessionLaunch {
        SessionLaunch {
            survey_id,
            access_token: Some("0b5c3f4e-token".to_string()),
            survey_exists: true,
        }
    }

    /// A state already sitting on its first question.
    pub fn state_with_questions(count: usize, duration_secs: u32) -> SessionState {
        let mut state = SessionState::new(launch(1));
        let mut params = ConfigParams::defaults();
        params.insert(KEY_TIMER_DURATION, duration_secs.to_string());
        state.apply_config(params);
        state.accept_token();
        state.load_questions(questions(count));
        state
    }
}

/// How often each backend call was made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub config: usize,
    pub validate: usize,
    pub load: usize,
    pub submit: usize,
}

/// Scripted stand-in for all three collaborators.
///
/// Grades are served from the script in order; once it runs dry every
/// submission is accepted as correct.
pub struct FakeBackend {
    config: Option<ConfigParams>,
    token_valid: bool,
    questions: Option<Vec<Question>>,
    grades: Mutex<VecDeque<Result<SubmitReply, ApiError>>>,
    latency: Duration,
    submit_latency: Duration,
    config_calls: AtomicUsize,
    validate_calls: AtomicUsize,
    load_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    submissions: Mutex<Vec<(i64, i64, i64)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            config: Some(ConfigParams::defaults()),
            token_valid: true,
            questions: Some(fixtures::questions(3)),
            grades: Mutex::new(VecDeque::new()),
            latency: Duration::ZERO,
            submit_latency: Duration::ZERO,
            config_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_duration(mut self, secs: u32) -> Self {
        if let Some(config) = self.config.as_mut() {
            config.insert(KEY_TIMER_DURATION, secs.to_string());
        }
        self
    }

    pub fn with_questions(mut self, questions: Vec<Question>) -> Self {
        self.questions = Some(questions);
        self
    }

    pub fn failing_config(mut self) -> Self {
        self.config = None;
        self
    }

    pub fn invalid_token(mut self) -> Self {
        self.token_valid = false;
        self
    }

    pub fn failing_load(mut self) -> Self {
        self.questions = None;
        self
    }

    pub fn grading(self, grades: Vec<Result<SubmitReply, ApiError>>) -> Self {
        *self.grades.lock().unwrap() = grades.into();
        self
    }

    /// Delay applied to the bootstrap calls.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_submit_latency(mut self, latency: Duration) -> Self {
        self.submit_latency = latency;
        self
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            config: self.config_calls.load(Ordering::SeqCst),
            validate: self.validate_calls.load(Ordering::SeqCst),
            load: self.load_calls.load(Ordering::SeqCst),
            submit: self.submit_calls.load(Ordering::SeqCst),
        }
    }

    /// `(survey_id, question_id, option_id)` of every submission, in order.
    pub fn submissions(&self) -> Vec<(i64, i64, i64)> {
        self.submissions.lock().unwrap().clone()
    }

    async fn delay(latency: Duration) {
        if !latency.is_zero() {
            time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ConfigProvider for FakeBackend {
    async fn fetch_config(&self) -> Result<ConfigParams, ApiError> {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        Self::delay(self.latency).await;
        self.config.clone().ok_or(ApiError::Disconnected)
    }
}

#[async_trait]
impl QuestionBankClient for FakeBackend {
    async fn validate_token(&self, _survey_id: i64, _access_token: &str) -> bool {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        Self::delay(self.latency).await;
        self.token_valid
    }

    async fn load_questions(
        &self,
        _survey_id: i64,
        _access_token: &str,
    ) -> Result<Vec<Question>, ApiError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        Self::delay(self.latency).await;
        self.questions
            .clone()
            .ok_or_else(|| ApiError::Rejected("survey unavailable".to_string()))
    }
}

#[async_trait]
impl AnswerGrader for FakeBackend {
    async fn submit_answer(
        &self,
        survey_id: i64,
        question_id: i64,
        option_id: i64,
        _access_token: &str,
    ) -> Result<SubmitReply, ApiError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions
            .lock()
            .unwrap()
            .push((survey_id, question_id, option_id));
        Self::delay(self.submit_latency).await;

        let scripted = self.grades.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(SubmitReply {
            success: true,
            correct: true,
        }))
    }
}
