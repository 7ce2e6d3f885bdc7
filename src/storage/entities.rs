use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use std::sync::Arc;

use crate::analysis::error::AnalysisError;

/// One logged interval of tracked time. Tags form a hierarchy path, outermost first, in the order
/// they appear in the description.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TimeRecord {
    pub id: Arc<str>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub tags: Arc<[Arc<str>]>,
    pub description: Arc<str>,
}

impl TimeRecord {
    pub fn new(
        id: impl Into<Arc<str>>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tags: impl IntoIterator<Item = impl Into<Arc<str>>>,
    ) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            tags: tags.into_iter().map(Into::into).collect(),
            description: "".into(),
        }
    }

    /// Fails if the record ends before it starts. Every consumer of records goes through this
    /// check before doing any arithmetic on the interval.
    pub fn check_interval(&self) -> Result<(), AnalysisError> {
        if self.end < self.start {
            Err(AnalysisError::InvertedInterval {
                id: self.id.clone(),
                start: self.start,
                end: self.end,
            })
        } else {
            Ok(())
        }
    }

    pub fn duration(&self) -> Result<Duration, AnalysisError> {
        self.check_interval()?;
        Ok(self.end - self.start)
    }

    /// Splits an interval into 2 halves, 1 before split, 1 after. A split at or past the end
    /// leaves the record whole, so zero-length records always land in the first half.
    pub fn split_by(self, split: DateTime<Utc>) -> (Option<TimeRecord>, Option<TimeRecord>) {
        if split < self.start {
            (None, Some(self))
        } else if split >= self.end {
            (Some(self), None)
        } else {
            let before = TimeRecord {
                end: split,
                ..self.clone()
            };
            let after = TimeRecord {
                start: split,
                ..self
            };
            (Some(before), Some(after))
        }
    }

    /// Returns the part of the record inside `[from, to]`. Records that only touch an edge of the
    /// range are dropped, zero-length records inside it are kept.
    pub fn clamp(
        self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<TimeRecord>, AnalysisError> {
        self.check_interval()?;
        let start = self.start.max(from);
        let end = self.end.min(to);
        if start > end || (start == end && self.start != self.end) {
            return Ok(None);
        }
        Ok(Some(TimeRecord { start, end, ..self }))
    }

    pub fn with_description(self, description: impl Into<Arc<str>>) -> Self {
        Self {
            description: description.into(),
            ..self
        }
    }
}
