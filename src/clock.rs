//! What "today" means.
//!
//! Daily logs are keyed by calendar date, so the planner asks a `Clock` for the
//! date instead of reading the system time directly.

use chrono::{FixedOffset, Local, NaiveDate, NaiveDateTime, Utc};

/// Source of the current date and time.
pub trait Clock: Send + Sync {
    /// Current instant as naive UTC.
    fn now_utc(&self) -> NaiveDateTime;

    /// Calendar date the user is living in.
    fn today(&self) -> NaiveDate;
}

/// Wall clock. Uses a fixed UTC offset when configured, the local zone otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    pub fn local() -> Self {
        Self { offset: None }
    }

    /// Clock pinned to `minutes` east of UTC. Out-of-range offsets fall back
    /// to the local zone.
    pub fn with_offset_minutes(minutes: i32) -> Self {
        let offset = minutes.checked_mul(60).and_then(FixedOffset::east_opt);
        if offset.is_none() {
            tracing::warn!(minutes, "utc offset out of range, using local time zone");
        }
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    fn today(&self) -> NaiveDate {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset).date_naive(),
            None => Local::now().date_naive(),
        }
    }
}

/// Clock frozen at a given instant. Used by tests and the CLI `--date` flag.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub now: NaiveDateTime,
}

impl FixedClock {
    /// Noon UTC on `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self {
            now: date.and_hms_opt(12, 0, 0).unwrap_or_default(),
        }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> NaiveDateTime {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.now.date()
    }
}
