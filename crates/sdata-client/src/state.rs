//! Execution state of a request: `Idle -> Running -> Idle`, with
//! `Running -> Aborted -> Idle` when the caller aborts.

use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const ABORTED: u8 = 2;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Aborted,
}

impl Phase {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RUNNING => Phase::Running,
            ABORTED => Phase::Aborted,
            _ => Phase::Idle,
        }
    }
}

/// Compare-and-set state guard allowing one execution at a time.
#[derive(Debug, Default)]
pub(crate) struct ExchangeState(AtomicU8);

impl ExchangeState {
    pub(crate) fn phase(&self) -> Phase {
        Phase::from_raw(self.0.load(Ordering::Acquire))
    }

    /// `Idle -> Running`. `None` when another execution holds the request.
    pub(crate) fn try_begin(&self) -> Option<RunGuard<'_>> {
        self.0
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(self))
    }

    /// `Running -> Aborted`. False when nothing is running.
    pub(crate) fn abort(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, ABORTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Returns the state to `Idle` when the execution ends, whatever the outcome.
#[derive(Debug)]
pub(crate) struct RunGuard<'a>(&'a ExchangeState);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0 .0.store(IDLE, Ordering::Release);
    }
}
