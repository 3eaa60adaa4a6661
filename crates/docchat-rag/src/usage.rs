//! Monthly request counter
//!
//! Counts non-exempt requests per calendar month (UTC) and persists the
//! count to a small JSON file so restarts keep the tally.

use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::UsageConfig;
use crate::error::{Error, Result};

/// Persisted counter contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CounterState {
    /// Month as `YYYY-MM`
    month: String,
    count: u64,
}

impl CounterState {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            month: month_key(now),
            count: 0,
        }
    }
}

/// Counter values after recording a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageTicket {
    pub limit: u64,
    pub used: u64,
    pub remaining: u64,
    warn: bool,
}

impl UsageTicket {
    /// Add `X-RateLimit-*` headers to a response
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert("x-ratelimit-limit", HeaderValue::from(self.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(self.remaining));
        headers.insert("x-ratelimit-used", HeaderValue::from(self.used));

        if self.warn {
            let warning = format!(
                "Approaching monthly limit. {} requests remaining.",
                self.remaining
            );
            if let Ok(value) = HeaderValue::from_str(&warning) {
                headers.insert("x-ratelimit-warning", value);
            }
        }
    }
}

/// Current month's usage, for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct UsageSnapshot {
    pub enabled: bool,
    pub month: String,
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
}

/// Process-wide monthly request counter
pub struct MonthlyRequestCounter {
    enabled: bool,
    limit: u64,
    warning_threshold: u64,
    path: PathBuf,
    exempt_paths: HashSet<String>,
    state: Mutex<CounterState>,
    writer: tokio::sync::Mutex<()>,
}

impl MonthlyRequestCounter {
    /// Load the counter from its file, starting fresh when missing or unreadable
    pub fn open(config: &UsageConfig) -> Self {
        let state = match read_state(&config.counter_path) {
            Ok(state) => state,
            Err(e) => {
                tracing::debug!(
                    "Starting a fresh request counter at {}: {}",
                    config.counter_path.display(),
                    e
                );
                CounterState::fresh(Utc::now())
            }
        };

        Self {
            enabled: config.enabled,
            limit: config.monthly_limit,
            warning_threshold: config.warning_threshold,
            path: config.counter_path.clone(),
            exempt_paths: config.exempt_paths.iter().cloned().collect(),
            state: Mutex::new(state),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// Whether requests to `path` are counted
    pub fn applies_to(&self, path: &str) -> bool {
        self.enabled && !self.exempt_paths.contains(path)
    }

    /// Count one request and persist the new tally
    ///
    /// Fails with [`Error::RequestLimit`] once the month's count passes the
    /// limit; rejected requests are still counted.
    pub async fn record(&self) -> Result<UsageTicket> {
        self.record_at(Utc::now()).await
    }

    pub(crate) async fn record_at(&self, now: DateTime<Utc>) -> Result<UsageTicket> {
        let ticket = self.count_at(now);
        self.persist().await;
        ticket
    }

    fn count_at(&self, now: DateTime<Utc>) -> Result<UsageTicket> {
        let current = {
            let mut state = self.state.lock();
            let month = month_key(now);
            if state.month != month {
                tracing::info!("New month {}, resetting request counter", month);
                *state = CounterState::fresh(now);
            }
            state.count += 1;
            state.count
        };

        if current > self.limit {
            tracing::warn!("Monthly request limit {} exceeded ({})", self.limit, current);
            return Err(Error::RequestLimit {
                limit: self.limit,
                current,
                reset_date: reset_date(now),
            });
        }

        let remaining = self.limit - current;
        Ok(UsageTicket {
            limit: self.limit,
            used: current,
            remaining,
            warn: remaining < self.warning_threshold,
        })
    }

    /// Write the latest state; writers are serialized so the file never
    /// goes backwards
    async fn persist(&self) {
        let _writer = self.writer.lock().await;
        let state = self.state.lock().clone();
        if let Err(e) = write_state(&self.path, &state).await {
            tracing::warn!("Failed to persist request counter: {}", e);
        }
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let state = self.state.lock();
        UsageSnapshot {
            enabled: self.enabled,
            month: state.month.clone(),
            used: state.count,
            limit: self.limit,
            remaining: self.limit.saturating_sub(state.count),
        }
    }
}

fn month_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

/// First day of the month after `now`
fn reset_date(now: DateTime<Utc>) -> String {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn read_state(path: &Path) -> Result<CounterState> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

async fn write_state(path: &Path, state: &CounterState) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, serde_json::to_string(state)?).await?;
    Ok(())
}
