//! Per-caller request rate limiting for the review endpoints.
//!
//! Each scope keeps a sliding window of request instants per user. A request
//! is refused once the window already holds `num_requests` entries; the
//! caller is told how long until the oldest entry expires.

use crate::{auth::Caller, errors::AppError};
use std::{
    collections::{HashMap, VecDeque},
    fmt,
    str::FromStr,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

/// A rate such as `10/minute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub num_requests: usize,
    pub period: Duration,
}

impl FromStr for Rate {
    type Err = String;

    /// Only the first letter of the period matters: `s`, `m`, `h` or `d`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, period) = s
            .split_once('/')
            .ok_or_else(|| format!("rate `{s}` must look like `<count>/<period>`"))?;
        let num_requests = num
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("rate `{s}` has an invalid request count"))?;
        let secs = match period.trim().chars().next() {
            Some('s') => 1,
            Some('m') => 60,
            Some('h') => 60 * 60,
            Some('d') => 24 * 60 * 60,
            _ => return Err(format!("rate `{s}` has an unknown period")),
        };
        Ok(Self {
            num_requests,
            period: Duration::from_secs(secs),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrottleScope {
    ReviewList,
    ReviewDetail,
}

impl fmt::Display for ThrottleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThrottleScope::ReviewList => "reiview_list_throttle",
            ThrottleScope::ReviewDetail => "reiview_detail_throttle",
        })
    }
}

/// Rates per scope; `None` disables throttling for that scope.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub review_list: Option<Rate>,
    pub review_detail: Option<Rate>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            review_list: Some(Rate {
                num_requests: 30,
                period: Duration::from_secs(60),
            }),
            review_detail: Some(Rate {
                num_requests: 60,
                period: Duration::from_secs(60),
            }),
        }
    }
}

impl ThrottleConfig {
    fn rate(&self, scope: ThrottleScope) -> Option<Rate> {
        match scope {
            ThrottleScope::ReviewList => self.review_list,
            ThrottleScope::ReviewDetail => self.review_detail,
        }
    }
}

/// Stale windows are swept once per this many checks.
const SWEEP_EVERY: u64 = 256;

#[derive(Default)]
struct History {
    windows: HashMap<(ThrottleScope, i64), VecDeque<Instant>>,
    checks: u64,
}

impl History {
    /// Forget every window whose newest request has aged out.
    fn sweep(&mut self, config: &ThrottleConfig, now: Instant) {
        self.windows.retain(|(scope, _), entries| {
            config.rate(*scope).is_some_and(|rate| {
                entries
                    .back()
                    .is_some_and(|newest| now.duration_since(*newest) < rate.period)
            })
        });
    }
}

/// Shared request history. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct Throttle {
    config: ThrottleConfig,
    history: Arc<Mutex<History>>,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            history: Arc::default(),
        }
    }

    /// Record a request by `caller` under `scope`, or refuse it with 429.
    /// Anonymous callers are not throttled.
    pub fn allow(&self, scope: ThrottleScope, caller: &Caller) -> Result<(), AppError> {
        let Some(user) = caller.user() else {
            return Ok(());
        };
        self.check(scope, user.id, Instant::now()).map_err(|wait| {
            tracing::info!(user = user.id, %scope, "request throttled");
            AppError::throttled(wait.as_secs().max(1))
        })
    }

    /// Core window bookkeeping; returns the wait on refusal.
    pub fn check(&self, scope: ThrottleScope, user_id: i64, now: Instant) -> Result<(), Duration> {
        let Some(rate) = self.config.rate(scope) else {
            return Ok(());
        };

        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.checks += 1;
        if history.checks % SWEEP_EVERY == 0 {
            history.sweep(&self.config, now);
        }
        let entries = history.windows.entry((scope, user_id)).or_default();

        while let Some(oldest) = entries.front() {
            if now.duration_since(*oldest) >= rate.period {
                entries.pop_front();
            } else {
                break;
            }
        }

        if entries.len() >= rate.num_requests {
            let wait = entries
                .front()
                .map(|oldest| rate.period.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(rate.period);
            return Err(wait);
        }

        entries.push_back(now);
        Ok(())
    }
}
