// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, Days, TimeZone, Utc};

/// Default day count of the "month" horizon.
pub const DEFAULT_MONTH_DAYS: u64 = 30;

/// Longest "month" horizon accepted from configuration.
pub const MAX_MONTH_DAYS: u64 = 3660;

/// The day-offset window a task list session queries against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Today,
    Tomorrow,
    Week,
    Month(u64),
}

impl Horizon {
    /// Maps a "days ahead" value to a horizon.
    /// 0, 1 and 7 are the named buckets; any other value is the month bucket,
    /// whose length comes from configuration.
    pub fn from_days(days_ahead: i64, month_days: u64) -> Self {
        match days_ahead {
            0 => Self::Today,
            1 => Self::Tomorrow,
            7 => Self::Week,
            _ => Self::Month(month_days),
        }
    }

    /// Parses the CLI/config names (`today`, `tomorrow`, `week`, `month`).
    pub fn from_key(key: &str, month_days: u64) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "today" => Some(Self::Today),
            "tomorrow" => Some(Self::Tomorrow),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month(month_days)),
            _ => None,
        }
    }

    pub fn days_ahead(&self) -> u64 {
        match self {
            Self::Today => 0,
            Self::Tomorrow => 1,
            Self::Week => 7,
            Self::Month(days) => *days,
        }
    }

    /// Stable identifier, used to namespace the stored preference.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::Week => "week",
            Self::Month(_) => "month",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Tomorrow => "Tomorrow",
            Self::Week => "This week",
            Self::Month(_) => "This month",
        }
    }

    /// Inclusive upper bound for the task query: 23:59:59 of the target day,
    /// in the timezone of `now`. Returns `None` if the date overflows.
    pub fn max_date<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
        let target_day = now
            .date_naive()
            .checked_add_days(Days::new(self.days_ahead()))?;
        let end_of_day = target_day.and_hms_opt(23, 59, 59)?;

        // `latest` resolves the ambiguous hour of a DST fold to the later instant.
        now.timezone()
            .from_local_datetime(&end_of_day)
            .latest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
