use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::config::RateLimitConfig;
use crate::errors::{LedgerError, Result};
use crate::types::EmployeeId;

/// sliding-window limit on contract edits per employee
#[derive(Debug)]
pub struct EditThrottle {
    max_requests: usize,
    window: Duration,
    attempts: Mutex<HashMap<EmployeeId, VecDeque<DateTime<Utc>>>>,
}

impl EditThrottle {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests as usize,
            window: Duration::seconds(config.window_secs as i64),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// record an attempt, failing once the window is full
    pub fn check(&self, actor: EmployeeId, now: DateTime<Utc>) -> Result<()> {
        let mut attempts = self.attempts.lock();
        let log = attempts.entry(actor).or_default();

        while let Some(oldest) = log.front() {
            if now - *oldest >= self.window {
                log.pop_front();
            } else {
                break;
            }
        }

        if log.len() >= self.max_requests {
            let retry_after = log
                .front()
                .map(|oldest| (self.window - (now - *oldest)).num_seconds().max(1))
                .unwrap_or(1);
            return Err(LedgerError::RateLimited {
                retry_after_secs: retry_after as u64,
            });
        }

        log.push_back(now);
        Ok(())
    }
}
