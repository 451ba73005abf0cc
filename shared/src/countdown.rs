use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::TimerId;
use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Counting {
        remaining: u8,
    },
    Triggered,
    Cancelled,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CountdownError {
    #[error("countdown already running")]
    AlreadyStarted,
    #[error("SOS already triggered")]
    AlreadyTriggered,
    #[error("countdown was cancelled")]
    Cancelled,
}

impl From<CountdownError> for AppError {
    fn from(e: CountdownError) -> Self {
        AppError::new(ErrorKind::InvalidState, e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; schedule the next tick.
    Continue { remaining: u8 },
    /// Reached zero on this tick. Reported once per countdown.
    Fire,
    /// The tick belongs to an abandoned run or arrived after the countdown
    /// stopped counting.
    Stale,
}

/// One SOS countdown. The countdown owns the id of its pending timer, so a
/// completion from an earlier run or from a cancelled timer is recognised as
/// stale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Countdown {
    phase: Phase,
    timer: Option<TimerId>,
}

impl Countdown {
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn remaining(&self) -> Option<u8> {
        match self.phase {
            Phase::Counting { remaining } => Some(remaining),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        matches!(self.phase, Phase::Triggered | Phase::Closed)
    }

    #[must_use]
    pub fn pending_timer(&self) -> Option<TimerId> {
        self.timer
    }

    /// Begins counting down from `from`, with `timer` as the first tick.
    /// Only an idle countdown can start; each SOS screen visit gets a fresh one.
    pub fn start(&mut self, from: u8, timer: TimerId) -> Result<u8, CountdownError> {
        match self.phase {
            Phase::Counting { .. } => Err(CountdownError::AlreadyStarted),
            Phase::Triggered | Phase::Closed => Err(CountdownError::AlreadyTriggered),
            Phase::Cancelled => Err(CountdownError::Cancelled),
            Phase::Idle => {
                let from = from.max(1);
                self.phase = Phase::Counting { remaining: from };
                self.timer = Some(timer);
                Ok(from)
            }
        }
    }

    /// Handles a fired timer. `next` is the id to use for the following tick
    /// and is only kept when the countdown continues.
    pub fn tick(&mut self, fired: TimerId, next: TimerId) -> Tick {
        let Phase::Counting { remaining } = self.phase else {
            return Tick::Stale;
        };
        if self.timer != Some(fired) {
            return Tick::Stale;
        }

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.phase = Phase::Triggered;
            self.timer = None;
            Tick::Fire
        } else {
            self.phase = Phase::Counting { remaining };
            self.timer = Some(next);
            Tick::Continue { remaining }
        }
    }

    /// Stops a running countdown. Returns the timer to cancel, if any.
    /// Has no effect once the SOS has fired.
    pub fn cancel(&mut self) -> Option<TimerId> {
        match self.phase {
            Phase::Counting { .. } | Phase::Idle => {
                self.phase = Phase::Cancelled;
                self.timer.take()
            }
            Phase::Triggered | Phase::Cancelled | Phase::Closed => None,
        }
    }

    pub fn close(&mut self) {
        if self.phase == Phase::Triggered {
            self.phase = Phase::Closed;
        }
    }
}
