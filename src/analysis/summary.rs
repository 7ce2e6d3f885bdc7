use std::{collections::BTreeSet, sync::Arc};

use chrono::Duration;

use crate::storage::entities::TimeRecord;

use super::error::AnalysisError;

/// Headline numbers shown above the charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub records: usize,
    pub total: Duration,
    pub average: Duration,
    pub unique_tags: usize,
}

impl Summary {
    pub fn from_records(records: &[TimeRecord]) -> Result<Self, AnalysisError> {
        let mut total = Duration::zero();
        let mut tags = BTreeSet::<&Arc<str>>::new();
        for record in records {
            total += record.duration()?;
            tags.extend(record.tags.iter());
        }
        let average = match i32::try_from(records.len()) {
            Ok(0) | Err(_) => Duration::zero(),
            Ok(count) => total / count,
        };
        Ok(Self {
            records: records.len(),
            total,
            average,
            unique_tags: tags.len(),
        })
    }
}
