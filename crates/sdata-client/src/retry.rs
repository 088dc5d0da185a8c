//! Timeout retry budget.
//!
//! Only transport timeouts are retried. There is no backoff: a timed-out
//! exchange is rebuilt and resent immediately against the same target.

/// Tracks how many timed-out exchanges may still be retried.
#[derive(Debug, Clone)]
pub struct TimeoutRetry {
    remaining: u32,
    attempts: u32,
}

impl TimeoutRetry {
    /// Create a budget allowing `budget` retries after the first attempt.
    pub fn new(budget: u32) -> Self {
        Self {
            remaining: budget,
            attempts: 0,
        }
    }

    /// Record that an exchange is being sent.
    pub fn begin_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Exchanges sent so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Retries left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consume one retry after a timeout. Returns false once the budget is spent.
    pub fn try_consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}
