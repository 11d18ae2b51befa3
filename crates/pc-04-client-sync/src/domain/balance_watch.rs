//! Balance reconciliation after a purchase
//!
//! Watches balance readings until one of:
//! - the balance reaches `prior + expected`
//! - the wait exceeds `max_wait`
//! - `anomaly_threshold` consecutive readings show zero after a nonzero
//!   balance was seen
//!
//! Whatever stops the watch, the latest reading is the truth.

use std::time::Duration;

/// Why a watch stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStop {
    Reached,
    Expired,
    Anomalous,
    Cancelled,
}

/// Result of feeding one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStep {
    Continue,
    Stop(WatchStop),
}

/// Final reading of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSettlement {
    pub balance: u64,
    pub reason: WatchStop,
    pub polls: u32,
}

#[derive(Debug, Clone)]
pub struct BalanceWatch {
    target: u64,
    max_wait: Duration,
    anomaly_threshold: u32,
    seen_nonzero: bool,
    consecutive_anomalies: u32,
    polls: u32,
    last: u64,
}

impl BalanceWatch {
    pub fn new(prior: u64, expected: u64, max_wait: Duration, anomaly_threshold: u32) -> Self {
        Self {
            target: prior.saturating_add(expected),
            max_wait,
            anomaly_threshold: anomaly_threshold.max(1),
            seen_nonzero: prior > 0,
            consecutive_anomalies: 0,
            polls: 0,
            last: prior,
        }
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn last(&self) -> u64 {
        self.last
    }

    /// Feed a reading taken `elapsed` after the watch started.
    pub fn observe(&mut self, balance: u64, elapsed: Duration) -> WatchStep {
        self.polls += 1;
        self.last = balance;

        if balance >= self.target {
            return WatchStep::Stop(WatchStop::Reached);
        }

        if balance == 0 && self.seen_nonzero {
            self.consecutive_anomalies += 1;
            if self.consecutive_anomalies >= self.anomaly_threshold {
                return WatchStep::Stop(WatchStop::Anomalous);
            }
        } else {
            self.consecutive_anomalies = 0;
        }
        if balance > 0 {
            self.seen_nonzero = true;
        }

        if elapsed >= self.max_wait {
            return WatchStep::Stop(WatchStop::Expired);
        }
        WatchStep::Continue
    }

    pub fn settle(&self, reason: WatchStop) -> BalanceSettlement {
        BalanceSettlement {
            balance: self.last,
            reason,
            polls: self.polls,
        }
    }
}
