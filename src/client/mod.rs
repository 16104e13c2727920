//! Quiz client module.
//!
//! The session core ([`session`], [`state`], [`timers`]), the contracts it
//! consumes ([`api`]), the WebSocket implementation of those contracts
//! ([`rpc`]) and a terminal presenter on top.

pub mod api;
mod client;
mod player;
pub mod rpc;
pub mod session;
pub mod state;
pub mod timers;
mod ui;

pub use client::{PlayOptions, resolve_launch, run};
pub use session::{Command, SessionHandle, mount};
pub use state::{Phase, SessionLaunch, SessionState};
