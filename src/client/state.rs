//! Session state and its transitions.
//!
//! [`SessionState`] is the one record a quiz attempt owns. It only changes
//! through the named transition methods below, each a plain synchronous
//! update; the session actor pairs them with timer operations and publishes
//! a clone after every change. Presenters only ever see those clones.

use std::sync::Arc;

use crate::config::{ConfigParams, SessionTuning};
use crate::models::Question;

use super::timers::ActiveTimers;

/// Where the session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Config, token validation and question loading in flight.
    Bootstrapping,
    ConfigFailed,
    SurveyMissing,
    TokenInvalid,
    /// Questions could not be loaded. Not retried.
    LoadFailed,
    NoQuestions,
    /// Countdown running (or cancelled by a selection) on the current question.
    InQuestion,
    /// Feedback shown, waiting for the advance delay.
    AwaitingAdvance,
    Finished,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            Phase::Bootstrapping | Phase::InQuestion | Phase::AwaitingAdvance
        )
    }
}

/// Position of a question relative to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressClass {
    Past,
    Current,
    Future,
}

impl ProgressClass {
    pub fn of(index: usize, current_index: usize) -> Self {
        if index < current_index {
            ProgressClass::Past
        } else if index == current_index {
            ProgressClass::Current
        } else {
            ProgressClass::Future
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProgressClass::Past => "past",
            ProgressClass::Current => "current",
            ProgressClass::Future => "future",
        }
    }
}

/// Outcome marker shown for a question in the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Skipped,
    Correct,
    Incorrect,
    Unanswered,
}

impl Indicator {
    pub fn of(question: &Question) -> Self {
        if question.skipped {
            Indicator::Skipped
        } else if question.answered {
            match question.correct {
                Some(true) => Indicator::Correct,
                _ => Indicator::Incorrect,
            }
        } else {
            Indicator::Unanswered
        }
    }

    /// Config key of the icon for this indicator.
    pub fn icon_key(self) -> &'static str {
        match self {
            Indicator::Skipped => "icon_skipped",
            Indicator::Correct => "icon_correct",
            Indicator::Incorrect => "icon_incorrect",
            Indicator::Unanswered => "icon_unanswered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Correct,
    Incorrect,
    TimedOut,
    SubmitError,
    Info,
    Error,
}

/// A localized message for the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub text: String,
}

/// What the hosting page knows before the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLaunch {
    pub survey_id: i64,
    pub access_token: Option<String>,
    pub survey_exists: bool,
}

/// Result of a countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Counting,
    Expired,
    Ignored,
}

/// Result of leaving `AwaitingAdvance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    NextQuestion,
    Finished,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    /// Bumped on every published change.
    pub version: u64,
    pub survey_id: i64,
    pub access_token: Option<String>,
    pub survey_exists: bool,
    /// Unset until validation completed.
    pub token_valid: Option<bool>,
    pub phase: Phase,
    pub questions: Vec<Question>,
    pub current_index: usize,
    pub time_left: u32,
    pub timer_duration_secs: u32,
    pub selected_option: Option<i64>,
    pub is_submission_locked: bool,
    pub last_feedback: Option<Feedback>,
    pub config: Arc<ConfigParams>,
    pub config_loaded: bool,
    /// Timers armed when this state was published.
    pub timers: ActiveTimers,
}

impl SessionState {
    pub fn new(launch: SessionLaunch) -> Self {
        let tuning = SessionTuning::default();
        Self {
            version: 0,
            survey_id: launch.survey_id,
            access_token: launch.access_token.filter(|t| !t.trim().is_empty()),
            survey_exists: launch.survey_exists,
            token_valid: None,
            phase: Phase::Bootstrapping,
            questions: Vec::new(),
            current_index: 0,
            time_left: tuning.timer_duration_secs,
            timer_duration_secs: tuning.timer_duration_secs,
            selected_option: None,
            is_submission_locked: false,
            last_feedback: None,
            config: Arc::new(ConfigParams::default()),
            config_loaded: false,
            timers: ActiveTimers::default(),
        }
    }

    // ---- bootstrap transitions ----

    pub fn apply_config(&mut self, params: ConfigParams) -> SessionTuning {
        let tuning = SessionTuning::from_params(&params);
        self.config = Arc::new(params);
        self.config_loaded = true;
        self.timer_duration_secs = tuning.timer_duration_secs;
        self.time_left = tuning.timer_duration_secs;
        tuning
    }

    pub fn fail_config(&mut self) {
        self.phase = Phase::ConfigFailed;
        self.set_feedback(FeedbackKind::Error, "feedback_config_error");
    }

    pub fn reject_survey(&mut self) {
        self.phase = Phase::SurveyMissing;
        let text = self.config.format("survey_not_found", &[&self.survey_id]);
        self.last_feedback = Some(Feedback {
            kind: FeedbackKind::Error,
            text,
        });
    }

    pub fn reject_token(&mut self) {
        self.token_valid = Some(false);
        self.phase = Phase::TokenInvalid;
        self.set_feedback(FeedbackKind::Error, "invalid_token");
    }

    pub fn accept_token(&mut self) {
        self.token_valid = Some(true);
    }

    pub fn fail_load(&mut self) {
        self.phase = Phase::LoadFailed;
        self.set_feedback(FeedbackKind::Error, "feedback_load_questions_error");
    }

    /// Install the loaded questions. Returns the phase entered.
    pub fn load_questions(&mut self, questions: Vec<Question>) -> Phase {
        if !self.questions.is_empty() {
            log::warn!("Questions already loaded, ignoring reload");
            return self.phase;
        }

        if questions.is_empty() {
            self.phase = Phase::NoQuestions;
            self.set_feedback(FeedbackKind::Info, "feedback_no_questions");
            return self.phase;
        }

        self.questions = questions;
        self.enter_question(0);
        self.phase
    }

    // ---- question transitions ----

    /// Lock the current question for `option_id`. Returns the question id to
    /// submit, or `None` when the selection must be ignored.
    pub fn begin_submission(&mut self, option_id: i64) -> Option<i64> {
        if self.is_option_disabled() || self.selected_option.is_some() {
            return None;
        }
        let question = self.current_question()?;
        if !question.has_option(option_id) {
            log::debug!(
                "Option {} does not belong to question {}",
                option_id,
                question.id
            );
            return None;
        }
        let question_id = question.id;

        self.selected_option = Some(option_id);
        self.is_submission_locked = true;
        Some(question_id)
    }

    /// The grader accepted the submission.
    pub fn record_grade(&mut self, correct: bool) {
        let index = self.current_index;
        let Some(question) = self.questions.get_mut(index) else {
            return;
        };
        question.mark_answered(correct);

        let (kind, key) = if correct {
            (FeedbackKind::Correct, "feedback_correct")
        } else {
            (FeedbackKind::Incorrect, "feedback_incorrect")
        };
        self.set_feedback(kind, key);
        self.phase = Phase::AwaitingAdvance;
    }

    /// The grader refused the submission or could not be reached. The player
    /// may pick again; the countdown stays stopped.
    pub fn reject_submission(&mut self) {
        self.is_submission_locked = false;
        self.selected_option = None;
        self.set_feedback(FeedbackKind::SubmitError, "feedback_submit_error");
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::InQuestion {
            return TickOutcome::Ignored;
        }

        if self.time_left > 0 {
            self.time_left -= 1;
            return TickOutcome::Counting;
        }

        let index = self.current_index;
        if let Some(question) = self.questions.get_mut(index) {
            question.mark_skipped();
        }
        self.set_feedback(FeedbackKind::TimedOut, "feedback_skipped");
        self.phase = Phase::AwaitingAdvance;
        TickOutcome::Expired
    }

    pub fn advance(&mut self) -> AdvanceOutcome {
        if self.phase != Phase::AwaitingAdvance {
            return AdvanceOutcome::Ignored;
        }

        if self.is_last_question() {
            self.phase = Phase::Finished;
            self.is_submission_locked = false;
            self.set_feedback(FeedbackKind::Info, "quiz_finished");
            return AdvanceOutcome::Finished;
        }

        self.enter_question(self.current_index + 1);
        AdvanceOutcome::NextQuestion
    }

    fn enter_question(&mut self, index: usize) {
        self.current_index = index;
        self.selected_option = None;
        self.last_feedback = None;
        self.is_submission_locked = false;
        self.time_left = self.timer_duration_secs;
        self.phase = Phase::InQuestion;
    }

    fn set_feedback(&mut self, kind: FeedbackKind, key: &str) {
        self.last_feedback = Some(Feedback {
            kind,
            text: self.config.text(key),
        });
    }

    // ---- derived, read-only ----

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::InQuestion | Phase::AwaitingAdvance | Phase::Finished => {
                self.questions.get(self.current_index)
            }
            _ => None,
        }
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    pub fn answered_count(&self) -> usize {
        self.questions.iter().filter(|q| q.answered).count()
    }

    pub fn progress_class(&self, index: usize) -> ProgressClass {
        ProgressClass::of(index, self.current_index)
    }

    pub fn indicator(&self, index: usize) -> Option<Indicator> {
        self.questions.get(index).map(Indicator::of)
    }

    pub fn indicator_icon(&self, index: usize) -> Option<String> {
        self.indicator(index)
            .map(|indicator| self.config.text(indicator.icon_key()))
    }

    /// Option buttons accept input only while a question is open and unlocked.
    pub fn is_option_disabled(&self) -> bool {
        self.phase != Phase::InQuestion || self.is_submission_locked
    }

    /// Remaining share of the countdown, for a proportional bar.
    pub fn timer_fraction(&self) -> f64 {
        if self.timer_duration_secs == 0 {
            return 0.0;
        }
        f64::from(self.time_left) / f64::from(self.timer_duration_secs)
    }

    /// Explanation of the current question, once it has been settled.
    pub fn visible_explanation(&self) -> Option<&str> {
        let question = self.current_question()?;
        if !question.is_settled() || self.last_feedback.is_none() {
            return None;
        }
        question.explanation.as_deref()
    }
}
