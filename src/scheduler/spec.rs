use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::ScheduleError;

static GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)([smh])").expect("interval group pattern is valid"));

static WHOLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+[smh])+$").expect("interval pattern is valid"));

/// Longest accepted period, a hundred years
pub const MAX_PERIOD: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A fixed firing period, written `@every 1h30m` (the prefix is optional)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSpec {
    period: Duration,
}

impl IntervalSpec {
    pub fn from_period(period: Duration) -> Result<Self, ScheduleError> {
        if period.is_zero() {
            return Err(ScheduleError::InvalidSpec("period must be positive".into()));
        }
        if period > MAX_PERIOD {
            return Err(ScheduleError::InvalidSpec(format!(
                "period of {}s exceeds the maximum of {}s",
                period.as_secs(),
                MAX_PERIOD.as_secs()
            )));
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl FromStr for IntervalSpec {
    type Err = ScheduleError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let body = spec.trim();
        let body = body.strip_prefix("@every").map(str::trim).unwrap_or(body);

        if !WHOLE.is_match(body) {
            return Err(ScheduleError::InvalidSpec(spec.to_string()));
        }

        let mut seconds: u64 = 0;
        for group in GROUP.captures_iter(body) {
            let number: u64 = group[1]
                .parse()
                .map_err(|_| ScheduleError::InvalidSpec(spec.to_string()))?;
            let factor = match &group[2] {
                "s" => 1,
                "m" => 60,
                _ => 60 * 60,
            };
            seconds = number
                .checked_mul(factor)
                .and_then(|s| seconds.checked_add(s))
                .ok_or_else(|| ScheduleError::InvalidSpec(spec.to_string()))?;
        }

        Self::from_period(Duration::from_secs(seconds))
            .map_err(|_| ScheduleError::InvalidSpec(spec.to_string()))
    }
}

impl fmt::Display for IntervalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut remaining = self.period.as_secs();
        let hours = remaining / 3600;
        remaining %= 3600;
        let minutes = remaining / 60;
        let seconds = remaining % 60;

        write!(f, "@every ")?;
        if hours > 0 {
            write!(f, "{hours}h")?;
        }
        if minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        if seconds > 0 || (hours == 0 && minutes == 0) {
            write!(f, "{seconds}s")?;
        }
        Ok(())
    }
}
