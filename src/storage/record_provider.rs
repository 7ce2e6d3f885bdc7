use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::entities::TimeRecord;

/// Read-only access to stored time records.
pub trait RecordProvider {
    /// Retrieves every record overlapping `[start, end]`, unmodified. Records are not cut to the
    /// range here, see [extract_between].
    fn fetch_records(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<TimeRecord>>> + Send;

    /// Earliest start and latest end over all stored records, [None] if there are no records.
    fn bounds(
        &self,
    ) -> impl Future<Output = Result<Option<(DateTime<Utc>, DateTime<Utc>)>>> + Send;
}

/// Provider over records already held in memory. Used for fixtures.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordProvider {
    records: Vec<TimeRecord>,
}

impl MemoryRecordProvider {
    pub fn new(records: Vec<TimeRecord>) -> Self {
        Self { records }
    }
}

impl RecordProvider for MemoryRecordProvider {
    async fn fetch_records(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|v| v.end >= start && v.start <= end)
            .cloned()
            .collect())
    }

    async fn bounds(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let start = self.records.iter().map(|v| v.start).min();
        let end = self.records.iter().map(|v| v.end).max();
        Ok(start.zip(end))
    }
}

pub struct ExtractConfig {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Fetches records between 2 dates and keeps only the part of each record that lies inside the
/// range. Fails on records that end before they start.
pub async fn extract_between(
    provider: &impl RecordProvider,
    config: ExtractConfig,
) -> Result<Vec<TimeRecord>> {
    let fetched = provider.fetch_records(config.start, config.end).await?;
    let fetched_count = fetched.len();

    let mut records = Vec::with_capacity(fetched_count);
    for record in fetched {
        if let Some(record) = record.clamp(config.start, config.end)? {
            records.push(record);
        }
    }

    debug!(
        "Extracted {} of {fetched_count} records between {} and {}",
        records.len(),
        config.start,
        config.end
    );
    Ok(records)
}
