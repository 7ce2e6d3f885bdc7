use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use crate::{
    storage::record_provider::{ExtractConfig, RecordProvider},
    utils::time::{next_day_start, start_of_day},
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct RangeArgs {
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"1 week ago\", \"15/03/2025\", \"12:00 16/03/2025\". Defaults to the first record"
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Examples are \"today\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\". Defaults to the last record"
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take inputs as whole days. For example if start and end are both 15/03/2025 this option allows to extract the whole day"
    )]
    treat_as_days: bool,
}

impl RangeArgs {
    #[cfg(test)]
    pub fn new(start_date: Option<String>, end_date: Option<String>, treat_as_days: bool) -> Self {
        Self {
            start_date,
            end_date,
            date_style: DateStyle::Uk,
            treat_as_days,
        }
    }
}

/// Turns range arguments into an absolute range. Missing ends are taken from the stored data, so
/// [None] means there is nothing stored at all.
pub async fn resolve_range<Tz: TimeZone>(
    RangeArgs {
        start_date,
        end_date,
        date_style,
        treat_as_days,
    }: RangeArgs,
    provider: &impl RecordProvider,
    tz: &Tz,
) -> Result<Option<ExtractConfig>>
where
    Tz::Offset: Copy,
{
    let now = Utc::now().with_timezone(tz);
    let dialect: chrono_english::Dialect = date_style.into();

    let start = start_date
        .map(|s| parse_date(&s, now.clone(), dialect, "start"))
        .transpose()?;
    let end = end_date
        .map(|s| parse_date(&s, now.clone(), dialect, "end"))
        .transpose()?;

    let (mut start, mut end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (start, end) => {
            let Some((first, last)) = provider.bounds().await? else {
                return Ok(None);
            };
            (
                start.unwrap_or_else(|| first.with_timezone(tz)),
                end.unwrap_or_else(|| last.with_timezone(tz)),
            )
        }
    };

    if treat_as_days {
        start = start_of_day(tz, start.date_naive()).with_timezone(tz);
        end = next_day_start(end);
    }

    if start > end {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Start date {start:?} must be before end date {end:?}"),
            )
            .into());
    }

    Ok(Some(ExtractConfig {
        start: start.to_utc(),
        end: end.to_utc(),
    }))
}

fn parse_date<Tz: TimeZone>(
    value: &str,
    now: DateTime<Tz>,
    dialect: chrono_english::Dialect,
    name: &str,
) -> Result<DateTime<Tz>>
where
    Tz::Offset: Copy,
{
    parse_date_string(value, now, dialect).map_err(|e| {
        Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {name} date {e}"),
            )
            .into()
    })
}
