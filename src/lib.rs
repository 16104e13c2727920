//! # quiz-runner
//!
//! A timed, single-player quiz runner for the terminal, plus the question
//! bank it plays against.
//!
//! The heart of the crate is [`client::session`]: a quiz session that
//! fetches its config, validates its access token, loads the questions and
//! then walks through them one countdown at a time, accepting at most one
//! answer per question.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use quiz_runner::client::api::Collaborators;
//! use quiz_runner::client::rpc::RemoteSurvey;
//! use quiz_runner::client::{SessionLaunch, mount};
//!
//! # async fn play() -> Result<(), quiz_runner::error::ApiError> {
//! let remote = Arc::new(RemoteSurvey::connect("ws://127.0.0.1:8712", Duration::from_secs(10)).await?);
//! let (survey_id, token) = remote.rpc().validate_pin("4321").await?;
//!
//! let handle = mount(
//!     SessionLaunch {
//!         survey_id,
//!         access_token: Some(token),
//!         survey_exists: true,
//!     },
//!     Collaborators::from_backend(remote),
//! );
//! handle.select_option(7);
//! let final_state = handle.unmount().await;
//! println!("{} answered", final_state.answered_count());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod protocol;
pub mod server;
pub mod terminal;

#[cfg(test)]
mod test_utils;
