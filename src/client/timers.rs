//! The session's two background timers.
//!
//! A [`TimerSet`] owns the one-second countdown interval and the one-shot
//! delayed-advance sleep. Arming either one cancels everything first, so at
//! most one timer is ever live and re-arming can never leak an old one.
//! Cancelling is dropping; nothing keeps running once the set is cleared.

use std::future;
use std::pin::Pin;

use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior, Sleep};

/// Countdown resolution.
pub const TICK: Duration = Duration::from_secs(1);

/// Which timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick,
    Advance,
}

/// Which timers are currently armed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveTimers {
    pub countdown: bool,
    pub advance: bool,
}

impl ActiveTimers {
    pub fn count(&self) -> usize {
        usize::from(self.countdown) + usize::from(self.advance)
    }

    pub fn is_idle(&self) -> bool {
        self.count() == 0
    }
}

#[derive(Default)]
pub struct TimerSet {
    countdown: Option<Interval>,
    advance: Option<Pin<Box<Sleep>>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh countdown. The first tick lands one second from now.
    pub fn arm_countdown(&mut self) {
        self.cancel_all();
        let mut interval = time::interval_at(Instant::now() + TICK, TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.countdown = Some(interval);
    }

    /// Schedule a single advance after `delay`.
    pub fn arm_advance(&mut self, delay: Duration) {
        self.cancel_all();
        self.advance = Some(Box::pin(time::sleep(delay)));
    }

    pub fn cancel_all(&mut self) {
        self.countdown = None;
        self.advance = None;
    }

    pub fn active(&self) -> ActiveTimers {
        ActiveTimers {
            countdown: self.countdown.is_some(),
            advance: self.advance.is_some(),
        }
    }

    /// Resolve when the armed timer fires. Never resolves while idle.
    ///
    /// Cancel safe: dropping the future keeps the armed timer intact.
    pub async fn fired(&mut self) -> TimerEvent {
        if let Some(interval) = self.countdown.as_mut() {
            interval.tick().await;
            return TimerEvent::Tick;
        }

        if let Some(sleep) = self.advance.as_mut() {
            sleep.as_mut().await;
            self.advance = None;
            return TimerEvent::Advance;
        }

        future::pending().await
    }
}
