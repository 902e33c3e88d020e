use chrono::{DateTime, Utc};

/// Wall-clock source for history timestamps. Timers do not read it.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }
}

/// Seconds since the epoch that test clocks are pinned to.
const PINNED_SECS: i64 = 1_700_000_000;

/// The instant every `fixed_clock` reports.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(PINNED_SECS, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// A clock that always reads `fixed_now`, for repeatable history entries.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::Fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_never_moves() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().timestamp(), PINNED_SECS);
    }
}
