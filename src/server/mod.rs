//! Question-bank server module.
//!
//! Serves config, PIN and token validation, survey data and grading over
//! WebSocket RPC.

mod server;
mod state;

pub use server::{ServerSettings, SharedState, run, serve};
pub use state::{Attempt, AttemptStatus, BankState, RecordedAnswer};
