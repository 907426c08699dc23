//! Schedule expressions.
//!
//! Supported forms:
//!
//! | spec            | period              |
//! |-----------------|---------------------|
//! | `@every 30s`    | 30 seconds (`s`, `m`, `h` units) |
//! | `@hourly`       | 1 hour              |
//! | `@daily`        | 24 hours            |
//! | `*/N * * * *`   | N minutes, N divides 60 |
//!
//! Ticks are aligned to the Unix epoch, so every process evaluating the same
//! spec agrees on tick times.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Schedule parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("empty schedule spec")]
    Empty,

    #[error("unsupported schedule spec: {0}")]
    Unsupported(String),

    #[error("invalid interval in {0}")]
    InvalidInterval(String),
}

/// A parsed, fixed-period schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    period_secs: i64,
}

impl Schedule {
    /// Parse a schedule spec
    pub fn parse(spec: &str) -> Result<Self, ScheduleError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ScheduleError::Empty);
        }

        match spec {
            "@hourly" => return Ok(Self::every_secs(3600)),
            "@daily" | "@midnight" => return Ok(Self::every_secs(86_400)),
            _ => {}
        }

        if let Some(interval) = spec.strip_prefix("@every") {
            return parse_interval(interval.trim())
                .map(Self::every_secs)
                .ok_or_else(|| ScheduleError::InvalidInterval(spec.to_string()));
        }

        let fields: Vec<&str> = spec.split_whitespace().collect();
        if fields.len() == 5 && fields[1..].iter().all(|f| *f == "*") {
            if let Some(step) = fields[0].strip_prefix("*/") {
                return match step.parse::<i64>() {
                    Ok(minutes) if (1..60).contains(&minutes) && 60 % minutes == 0 => {
                        Ok(Self::every_secs(minutes * 60))
                    }
                    _ => Err(ScheduleError::InvalidInterval(spec.to_string())),
                };
            }
            if fields[0] == "*" {
                return Ok(Self::every_secs(60));
            }
        }

        Err(ScheduleError::Unsupported(spec.to_string()))
    }

    const fn every_secs(period_secs: i64) -> Self {
        Self { period_secs }
    }

    /// Tick period
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs.unsigned_abs())
    }

    /// The latest tick at or before `now`
    #[must_use]
    pub fn last_tick(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = now.timestamp().div_euclid(self.period_secs) * self.period_secs;
        DateTime::from_timestamp(secs, 0).unwrap_or(now)
    }

    /// The first tick strictly after `now`
    #[must_use]
    pub fn next_tick(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = (now.timestamp().div_euclid(self.period_secs) + 1) * self.period_secs;
        DateTime::from_timestamp(secs, 0).unwrap_or(now)
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@every {}s", self.period_secs)
    }
}

/// `30s`, `5m`, `2h`; the value must be positive
fn parse_interval(raw: &str) -> Option<i64> {
    let (split, _) = raw.char_indices().next_back()?;
    let (value, unit) = raw.split_at(split);
    let value: i64 = value.trim().parse().ok()?;
    if value <= 0 {
        return None;
    }
    let scale = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => return None,
    };
    value.checked_mul(scale)
}
