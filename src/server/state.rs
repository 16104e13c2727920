//! Question-bank state.
//!
//! Holds the loaded surveys, the config served to players and one attempt
//! per issued access token. Every call a connection receives is answered
//! by [`BankState::handle`] under the shared lock.

use std::collections::HashMap;

use uuid::Uuid;

use crate::config::ConfigParams;
use crate::models::{QuizBank, Survey};
use crate::protocol::{Call, QuestionPayload, Reply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    InProgress,
    /// Every question has an answer.
    Completed,
}

/// The first answer a player gave to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedAnswer {
    pub option_id: i64,
    pub correct: bool,
}

/// One player's run through a survey, identified by its access token.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub survey_id: i64,
    pub status: AttemptStatus,
    /// Recorded answer per question id.
    pub answers: HashMap<i64, RecordedAnswer>,
    pub correct: usize,
}

impl Attempt {
    fn new(survey_id: i64) -> Self {
        Self {
            survey_id,
            status: AttemptStatus::InProgress,
            answers: HashMap::new(),
            correct: 0,
        }
    }
}

pub struct BankState {
    surveys: HashMap<i64, Survey>,
    attempts: HashMap<String, Attempt>,
    params: ConfigParams,
}

impl BankState {
    pub fn new(bank: QuizBank, params: ConfigParams) -> Self {
        let surveys = bank
            .surveys
            .into_iter()
            .map(|survey| (survey.id, survey))
            .collect();
        Self {
            surveys,
            attempts: HashMap::new(),
            params,
        }
    }

    pub fn params(&self) -> &ConfigParams {
        &self.params
    }

    pub fn attempt(&self, access_token: &str) -> Option<&Attempt> {
        self.attempts.get(access_token)
    }

    pub fn survey_exists(&self, survey_id: i64) -> bool {
        self.surveys.contains_key(&survey_id)
    }

    /// Start an attempt for the survey whose session code is `pin`.
    pub fn validate_pin(&mut self, pin: &str) -> Result<(i64, String), String> {
        let pin = pin.trim();
        let Some(survey) = self.surveys.values().find(|s| s.session_code == pin) else {
            return Err("Invalid PIN".to_string());
        };

        let survey_id = survey.id;
        let access_token = Uuid::new_v4().to_string();
        self.attempts
            .insert(access_token.clone(), Attempt::new(survey_id));
        log::info!("Started attempt for survey {}", survey_id);

        Ok((survey_id, access_token))
    }

    pub fn validate_token(&self, survey_id: i64, access_token: &str) -> bool {
        self.attempts.get(access_token).is_some_and(|attempt| {
            attempt.survey_id == survey_id && attempt.status == AttemptStatus::InProgress
        })
    }

    pub fn survey_data(
        &self,
        survey_id: i64,
        access_token: &str,
    ) -> Result<Vec<QuestionPayload>, String> {
        if !self.validate_token(survey_id, access_token) {
            return Err("Invalid token".to_string());
        }
        let survey = self
            .surveys
            .get(&survey_id)
            .ok_or_else(|| "Survey not found".to_string())?;

        Ok(survey
            .questions
            .iter()
            .map(|q| QuestionPayload::from(&q.to_public()))
            .collect())
    }

    /// Grade one answer. `Ok(correct)` once recorded, `Err(reason)` when refused.
    ///
    /// A question is graded once. Resubmitting it, even after the attempt
    /// completed, returns the recorded grade so a client whose reply got
    /// lost can move on.
    pub fn submit(
        &mut self,
        survey_id: i64,
        question_id: i64,
        option_id: i64,
        access_token: &str,
    ) -> Result<bool, String> {
        let survey = self
            .surveys
            .get(&survey_id)
            .ok_or_else(|| "Survey not found".to_string())?;
        let attempt = self
            .attempts
            .get_mut(access_token)
            .filter(|attempt| attempt.survey_id == survey_id)
            .ok_or_else(|| "Invalid token".to_string())?;
        let question = survey
            .question(question_id)
            .ok_or_else(|| format!("Unknown question {}", question_id))?;
        let option = question
            .option(option_id)
            .ok_or_else(|| format!("Unknown option {}", option_id))?;

        if let Some(recorded) = attempt.answers.get(&question_id) {
            log::debug!(
                "Question {} already answered with option {}, repeating its grade",
                question_id,
                recorded.option_id
            );
            return Ok(recorded.correct);
        }
        if attempt.status != AttemptStatus::InProgress {
            return Err("Invalid token".to_string());
        }

        let correct = option.is_correct;
        let total = survey.questions.len();
        attempt
            .answers
            .insert(question_id, RecordedAnswer { option_id, correct });
        if correct {
            attempt.correct += 1;
        }
        if attempt.answers.len() >= total {
            attempt.status = AttemptStatus::Completed;
            log::info!(
                "Attempt on survey {} completed with {}/{} correct",
                survey_id,
                attempt.correct,
                total
            );
        }

        Ok(correct)
    }

    /// Answer one call.
    pub fn handle(&mut self, call: Call) -> Reply {
        match call {
            Call::GetConfigParams => Reply::ConfigParams {
                params: self.params.as_map().clone(),
            },
            Call::ValidatePin { pin } => match self.validate_pin(&pin) {
                Ok((survey_id, access_token)) => Reply::PinAccepted {
                    survey_id,
                    access_token,
                },
                Err(reason) => Reply::PinRejected { reason },
            },
            Call::SurveyExists { survey_id } => Reply::SurveyStatus {
                exists: self.survey_exists(survey_id),
            },
            Call::ValidateToken {
                survey_id,
                access_token,
            } => Reply::TokenStatus {
                valid: self.validate_token(survey_id, &access_token),
            },
            Call::GetSurveyData {
                survey_id,
                access_token,
            } => match self.survey_data(survey_id, &access_token) {
                Ok(questions) => Reply::SurveyData {
                    success: true,
                    questions,
                    error: None,
                },
                Err(error) => Reply::SurveyData {
                    success: false,
                    questions: Vec::new(),
                    error: Some(error),
                },
            },
            Call::SubmitAnswer {
                survey_id,
                question_id,
                answer_id,
                access_token,
            } => match self.submit(survey_id, question_id, answer_id, &access_token) {
                Ok(correct) => Reply::SubmitResult {
                    success: true,
                    correct,
                    error: None,
                },
                Err(error) => {
                    log::debug!("Refused submission: {}", error);
                    Reply::SubmitResult {
                        success: false,
                        correct: false,
                        error: Some(error),
                    }
                }
            },
        }
    }
}
