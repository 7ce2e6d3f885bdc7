use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::utils::time::start_of_day;

use super::error::AnalysisError;

/// Calendar bucket size used to split records for bar charts.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Granularity {
    #[value(alias = "days")]
    Day,
    #[value(alias = "weeks")]
    Week,
    #[value(alias = "months")]
    Month,
}

impl Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Granularity::Day => write!(f, "day"),
            Granularity::Week => write!(f, "week"),
            Granularity::Month => write!(f, "month"),
        }
    }
}

impl FromStr for Granularity {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(Granularity::Day),
            "week" | "weeks" => Ok(Granularity::Week),
            "month" | "months" => Ok(Granularity::Month),
            _ => Err(AnalysisError::UnknownGranularity(s.to_string())),
        }
    }
}

/// Identifies one day, week or month. Weeks start on Monday. Keys compare chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    first_day: NaiveDate,
    granularity: Granularity,
}

impl PartitionKey {
    /// Returns the partition of `granularity` that `date` belongs to.
    pub fn containing(granularity: Granularity, date: NaiveDate) -> Result<Self, AnalysisError> {
        let first_day = match granularity {
            Granularity::Day => Some(date),
            Granularity::Week => date.checked_sub_days(Days::new(
                date.weekday().num_days_from_monday() as u64,
            )),
            Granularity::Month => date.with_day(1),
        };
        let first_day = first_day.ok_or(AnalysisError::CalendarOverflow(date))?;
        Ok(Self {
            first_day,
            granularity,
        })
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// The partition directly after this one.
    pub fn next(&self) -> Result<Self, AnalysisError> {
        let first_day = match self.granularity {
            Granularity::Day => self.first_day.succ_opt(),
            Granularity::Week => self.first_day.checked_add_days(Days::new(7)),
            Granularity::Month => self.first_day.checked_add_months(Months::new(1)),
        };
        Ok(Self {
            first_day: first_day.ok_or(AnalysisError::CalendarOverflow(self.first_day))?,
            granularity: self.granularity,
        })
    }

    /// First instant of the partition when calendar days follow `tz`.
    pub fn start_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Utc> {
        start_of_day(tz, self.first_day)
    }

    /// First instant after the partition, which is also the start of [PartitionKey::next].
    pub fn end_in<Tz: TimeZone>(&self, tz: &Tz) -> Result<DateTime<Utc>, AnalysisError> {
        Ok(self.next()?.start_in(tz))
    }

    /// Human readable name, used for chart axes.
    pub fn label(&self) -> String {
        match self.granularity {
            Granularity::Day => self.first_day.format("%b %d, %Y").to_string(),
            Granularity::Week => {
                let week = self.first_day.iso_week();
                format!("Week {:02}, {}", week.week(), week.year())
            }
            Granularity::Month => self.first_day.format("%B %Y").to_string(),
        }
    }
}

/// Sortable key: `2024-01-31`, `2024-W05` (ISO week) or `2024-01`.
impl Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.granularity {
            Granularity::Day => write!(f, "{}", self.first_day.format("%Y-%m-%d")),
            Granularity::Week => {
                let week = self.first_day.iso_week();
                write!(f, "{}-W{:02}", week.year(), week.week())
            }
            Granularity::Month => write!(f, "{}", self.first_day.format("%Y-%m")),
        }
    }
}

impl Serialize for PartitionKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
