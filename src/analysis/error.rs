use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Precondition violations raised by the splitting and aggregation routines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("record '{id}' ends at {end} before it starts at {start}")]
    InvertedInterval {
        id: Arc<str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("tag depth {0} is outside of the supported range 1..=5")]
    InvalidDepth(i64),
    #[error("unknown granularity '{0}', expected one of day, week, month")]
    UnknownGranularity(String),
    #[error("partition following {0} is outside of the supported calendar range")]
    CalendarOverflow(NaiveDate),
}
