use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use tracing::instrument;

use super::{
    error::AnalysisError,
    partition::PartitionKey,
    split::SplitRecord,
    tags::{Depth, TagPath},
};

/// Durations per partition and tag path, laid out for a stacked bar chart. Rows are partitions in
/// chronological order, columns are tag paths in sorted order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PeriodTable {
    cells: BTreeMap<PartitionKey, BTreeMap<TagPath, Duration>>,
}

impl PeriodTable {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn partitions(&self) -> impl Iterator<Item = &PartitionKey> {
        self.cells.keys()
    }

    pub fn columns(&self) -> Vec<&TagPath> {
        self.cells
            .values()
            .flat_map(|row| row.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Missing cells are zero.
    pub fn get(&self, partition: &PartitionKey, tag: &TagPath) -> Duration {
        self.cells
            .get(partition)
            .and_then(|row| row.get(tag))
            .copied()
            .unwrap_or_else(Duration::zero)
    }

    /// Every non-empty cell.
    pub fn cells(&self) -> impl Iterator<Item = (&PartitionKey, &TagPath, Duration)> {
        self.cells
            .iter()
            .flat_map(|(partition, row)| row.iter().map(move |(tag, v)| (partition, tag, *v)))
    }

    /// Dense rows matching [PeriodTable::columns].
    pub fn rows(&self) -> Vec<(&PartitionKey, Vec<Duration>)> {
        let columns = self.columns();
        self.cells
            .keys()
            .map(|partition| {
                let row = columns.iter().map(|tag| self.get(partition, tag)).collect();
                (partition, row)
            })
            .collect()
    }

    pub fn total(&self) -> Duration {
        self.cells().fold(Duration::zero(), |ac, (_, _, v)| ac + v)
    }
}

/// Groups split records by partition and tag path truncated to `depth`. The bar chart uses depth 1.
#[instrument(skip(records), fields(records = records.len()))]
pub fn aggregate_by_partition_and_tag(
    records: &[SplitRecord],
    depth: Depth,
) -> Result<PeriodTable, AnalysisError> {
    let mut table = PeriodTable::default();
    for record in records {
        *table
            .cells
            .entry(record.partition)
            .or_default()
            .entry(TagPath::truncate(&record.tags, depth))
            .or_insert_with(Duration::zero) += record.duration;
    }
    Ok(table)
}
