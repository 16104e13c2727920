//! The quiz session actor.
//!
//! [`mount`] spawns one task per quiz attempt. The task owns the
//! [`SessionState`], the [`TimerSet`] and the single in-flight grading call,
//! and is the only place any of them change. Presenters talk to it through a
//! [`SessionHandle`]: commands go in over a channel, snapshots come back over
//! a `watch`.
//!
//! Every transition runs to completion before the next event is taken, so a
//! selection cancels the countdown before its grading call is even polled and
//! a late grading reply can never race a timeout on the same question.

use futures_util::future::{self, BoxFuture};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::SessionTuning;
use crate::error::ApiError;

use super::api::{Collaborators, SubmitReply};
use super::state::{AdvanceOutcome, Phase, SessionLaunch, SessionState, TickOutcome};
use super::timers::{TimerEvent, TimerSet};

/// Inputs a presenter can send to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SelectOption(i64),
    Unmount,
}

/// Presenter side of a mounted session.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionState>,
    task: JoinHandle<SessionState>,
}

impl SessionHandle {
    /// Ask the session to submit `option_id` for the current question.
    ///
    /// Returns false once the session has ended. Selections the session
    /// cannot honour right now are dropped silently.
    pub fn select_option(&self, option_id: i64) -> bool {
        self.commands.send(Command::SelectOption(option_id)).is_ok()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshots.clone()
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionState {
        self.snapshots.borrow().clone()
    }

    /// Tear the session down and return its final state.
    pub async fn unmount(self) -> SessionState {
        // the task may already have ended on a terminal phase
        let _ = self.commands.send(Command::Unmount);
        self.join().await
    }

    /// Wait for the session task to end on its own.
    pub async fn join(self) -> SessionState {
        match self.task.await {
            Ok(state) => state,
            Err(err) => {
                log::error!("Session task failed: {}", err);
                self.snapshots.borrow().clone()
            }
        }
    }
}

/// Start a session and begin bootstrapping it.
///
/// Must be called from within a tokio runtime.
pub fn mount(launch: SessionLaunch, collaborators: Collaborators) -> SessionHandle {
    let state = SessionState::new(launch);
    let (publisher, snapshots) = watch::channel(state.clone());
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();

    log::info!("Mounting quiz session for survey {}", state.survey_id);

    let session = QuizSession {
        state,
        tuning: SessionTuning::default(),
        timers: TimerSet::new(),
        pending: None,
        collaborators,
        commands: commands_rx,
        publisher,
    };
    let task = tokio::spawn(session.run());

    SessionHandle {
        commands: commands_tx,
        snapshots,
        task,
    }
}

/// The one grading call allowed in flight.
struct PendingSubmission {
    question_id: i64,
    reply: BoxFuture<'static, Result<SubmitReply, ApiError>>,
}

/// The presenter unmounted (or dropped its handle) while we were waiting.
struct Unmounted;

enum Event {
    Command(Option<Command>),
    Graded(i64, Result<SubmitReply, ApiError>),
    Timer(TimerEvent),
}

struct QuizSession {
    state: SessionState,
    tuning: SessionTuning,
    timers: TimerSet,
    pending: Option<PendingSubmission>,
    collaborators: Collaborators,
    commands: mpsc::UnboundedReceiver<Command>,
    publisher: watch::Sender<SessionState>,
}

impl QuizSession {
    async fn run(mut self) -> SessionState {
        self.publish();
        if self.bootstrap().await.is_ok() {
            self.publish();
            self.drive().await;
        }
        self.teardown()
    }

    /// Config, then token, then questions. The first failure settles the
    /// session into its terminal phase.
    async fn bootstrap(&mut self) -> Result<(), Unmounted> {
        let fetched =
            until_unmount(&mut self.commands, self.collaborators.config.fetch_config()).await?;
        match fetched {
            Ok(params) => {
                self.tuning = self.state.apply_config(params);
                log::debug!("Config loaded: {:?}", self.tuning);
            }
            Err(err) => {
                log::error!("Failed to fetch config: {}", err);
                self.state.fail_config();
                return Ok(());
            }
        }

        if !self.state.survey_exists {
            log::warn!("Survey {} does not exist", self.state.survey_id);
            self.state.reject_survey();
            return Ok(());
        }

        let Some(token) = self.state.access_token.clone() else {
            log::warn!("No access token for survey {}", self.state.survey_id);
            self.state.reject_token();
            return Ok(());
        };
        self.publish();

        let survey_id = self.state.survey_id;
        let valid = until_unmount(
            &mut self.commands,
            self.collaborators.bank.validate_token(survey_id, &token),
        )
        .await?;
        if !valid {
            log::warn!("Access token rejected for survey {}", survey_id);
            self.state.reject_token();
            return Ok(());
        }
        self.state.accept_token();
        self.publish();

        let loaded = until_unmount(
            &mut self.commands,
            self.collaborators.bank.load_questions(survey_id, &token),
        )
        .await?;
        match loaded {
            Ok(questions) => {
                log::info!("Loaded {} questions for survey {}", questions.len(), survey_id);
                if self.state.load_questions(questions) == Phase::InQuestion {
                    self.timers.arm_countdown();
                }
            }
            Err(err) => {
                log::error!("Failed to load questions: {}", err);
                self.state.fail_load();
            }
        }
        Ok(())
    }

    async fn drive(&mut self) {
        while !self.state.phase.is_terminal() {
            let event = tokio::select! {
                biased;
                command = self.commands.recv() => Event::Command(command),
                (question_id, reply) = wait_pending(&mut self.pending) => {
                    Event::Graded(question_id, reply)
                }
                fired = self.timers.fired() => Event::Timer(fired),
            };

            match event {
                Event::Command(Some(Command::SelectOption(option_id))) => {
                    self.select_option(option_id)
                }
                Event::Command(Some(Command::Unmount)) | Event::Command(None) => return,
                Event::Graded(question_id, reply) => self.on_graded(question_id, reply),
                Event::Timer(TimerEvent::Tick) => self.on_tick(),
                Event::Timer(TimerEvent::Advance) => self.on_advance(),
            }
        }
        log::info!("Session settled in {:?}", self.state.phase);
    }

    fn select_option(&mut self, option_id: i64) {
        let Some(token) = self.state.access_token.clone() else {
            return;
        };
        let Some(question_id) = self.state.begin_submission(option_id) else {
            log::debug!("Ignoring selection of option {}", option_id);
            return;
        };

        self.timers.cancel_all();

        let grader = self.collaborators.grader.clone();
        let survey_id = self.state.survey_id;
        log::debug!(
            "Submitting option {} for question {}",
            option_id,
            question_id
        );
        self.pending = Some(PendingSubmission {
            question_id,
            reply: Box::pin(async move {
                grader
                    .submit_answer(survey_id, question_id, option_id, &token)
                    .await
            }),
        });
        self.publish();
    }

    fn on_graded(&mut self, question_id: i64, reply: Result<SubmitReply, ApiError>) {
        self.pending = None;

        let current = self.state.current_question().map(|q| q.id);
        if current != Some(question_id) {
            log::warn!("Dropping grade for stale question {}", question_id);
            return;
        }

        match reply {
            Ok(SubmitReply {
                success: true,
                correct,
            }) => {
                log::debug!(
                    "Question {} graded {}, awaiting advance",
                    question_id,
                    if correct { "correct" } else { "incorrect" }
                );
                self.state.record_grade(correct);
                self.timers.arm_advance(self.tuning.answer_advance_delay);
            }
            Ok(_) => {
                log::warn!("Submission for question {} was rejected", question_id);
                self.state.reject_submission();
            }
            Err(err) => {
                log::error!("Failed to submit answer for question {}: {}", question_id, err);
                self.state.reject_submission();
            }
        }
        self.publish();
    }

    fn on_tick(&mut self) {
        match self.state.tick() {
            TickOutcome::Counting => log::trace!("{}s left", self.state.time_left),
            TickOutcome::Expired => {
                log::debug!("Time ran out on question {}", self.state.current_index);
                self.timers.arm_advance(self.tuning.timeout_advance_delay);
            }
            TickOutcome::Ignored => self.timers.cancel_all(),
        }
        self.publish();
    }

    fn on_advance(&mut self) {
        match self.state.advance() {
            AdvanceOutcome::NextQuestion => {
                log::debug!("Advancing to question {}", self.state.current_index);
                self.timers.arm_countdown();
            }
            AdvanceOutcome::Finished => {
                log::debug!("Quiz finished on survey {}", self.state.survey_id);
                self.timers.cancel_all();
            }
            AdvanceOutcome::Ignored => self.timers.cancel_all(),
        }
        self.publish();
    }

    fn publish(&mut self) {
        self.state.version += 1;
        self.state.timers = self.timers.active();
        self.publisher.send_replace(self.state.clone());
    }

    fn teardown(mut self) -> SessionState {
        self.timers.cancel_all();
        if self.pending.take().is_some() {
            log::debug!("Discarding in-flight submission");
        }
        self.publish();
        log::info!("Session for survey {} unmounted", self.state.survey_id);
        self.state
    }
}

/// Await `work` unless the presenter unmounts first. Selections that arrive
/// before there is a question to answer are dropped.
async fn until_unmount<F>(
    commands: &mut mpsc::UnboundedReceiver<Command>,
    work: F,
) -> Result<F::Output, Unmounted>
where
    F: Future,
{
    tokio::pin!(work);
    loop {
        tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(Command::SelectOption(option_id)) => {
                    log::debug!("Ignoring selection of option {} during bootstrap", option_id);
                }
                Some(Command::Unmount) | None => return Err(Unmounted),
            },
            output = &mut work => return Ok(output),
        }
    }
}

async fn wait_pending(
    pending: &mut Option<PendingSubmission>,
) -> (i64, Result<SubmitReply, ApiError>) {
    match pending {
        Some(submission) => {
            let reply = submission.reply.as_mut().await;
            (submission.question_id, reply)
        }
        None => future::pending().await,
    }
}
