//! Terminal quiz player.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};

use crate::error::{ApiError, QuizError};
use crate::terminal::TerminalGuard;

use super::api::Collaborators;
use super::player::{Action, PlayerApp};
use super::rpc::{RemoteSurvey, RpcClient};
use super::session::{self, SessionHandle};
use super::state::SessionLaunch;
use super::ui;

/// How to reach the bank and which quiz to play.
#[derive(Debug, Clone)]
pub struct PlayOptions {
    pub host: String,
    pub port: u16,
    pub pin: Option<String>,
    pub survey_id: Option<i64>,
    pub access_token: Option<String>,
    pub rpc_timeout: Duration,
}

impl PlayOptions {
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Connect, resolve the launch, and play until the player quits.
pub async fn run(options: PlayOptions) -> Result<(), QuizError> {
    let remote = Arc::new(RemoteSurvey::connect(&options.url(), options.rpc_timeout).await?);
    let launch = resolve_launch(remote.rpc(), &options).await?;

    let handle = session::mount(launch, Collaborators::from_backend(Arc::clone(&remote)));
    let result = run_tui(&handle).await;

    let final_state = handle.unmount().await;
    log::info!(
        "Left quiz in {:?} with {}/{} answered",
        final_state.phase,
        final_state.answered_count(),
        final_state.total_questions()
    );

    result
}

/// Work out survey id, token and existence before mounting a session.
pub async fn resolve_launch(rpc: &RpcClient, options: &PlayOptions) -> Result<SessionLaunch, QuizError> {
    let (survey_id, access_token) = match (&options.pin, options.survey_id) {
        (Some(pin), _) => match rpc.validate_pin(pin).await {
            Ok((survey_id, token)) => (survey_id, Some(token)),
            Err(ApiError::Rejected(reason)) => return Err(QuizError::Launch(reason)),
            Err(e) => return Err(e.into()),
        },
        (None, Some(survey_id)) => (survey_id, options.access_token.clone()),
        (None, None) => {
            return Err(QuizError::Launch(
                "either a PIN or a survey id is required".to_string(),
            ));
        }
    };

    let survey_exists = rpc.survey_exists(survey_id).await?;

    Ok(SessionLaunch {
        survey_id,
        access_token,
        survey_exists,
    })
}

async fn run_tui(handle: &SessionHandle) -> Result<(), QuizError> {
    let mut terminal = TerminalGuard::enter()?;
    let snapshots = handle.subscribe();
    let mut app = PlayerApp::new(snapshots.borrow().clone());

    loop {
        {
            let latest = snapshots.borrow();
            if latest.version != app.snapshot.version {
                app.sync(latest.clone());
            }
        }

        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match app.handle_key(key.code) {
                    Action::Select(option_id) => {
                        handle.select_option(option_id);
                    }
                    Action::Quit => break,
                    Action::None => {}
                }
            }
        }
    }

    Ok(())
}
