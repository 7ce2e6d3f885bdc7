use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{instrument, trace};

use crate::storage::entities::TimeRecord;

use super::{
    error::AnalysisError,
    partition::{Granularity, PartitionKey},
};

/// The part of a [TimeRecord] that falls inside a single partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRecord {
    pub parent_id: Arc<str>,
    pub partition: PartitionKey,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub tags: Arc<[Arc<str>]>,
    pub duration: Duration,
}

impl SplitRecord {
    fn new(piece: TimeRecord, partition: PartitionKey) -> Self {
        Self {
            duration: piece.end - piece.start,
            parent_id: piece.id,
            partition,
            start: piece.start,
            end: piece.end,
            tags: piece.tags,
        }
    }
}

/// Splits `record` at every partition boundary strictly inside it. Pieces are ordered, contiguous
/// and their durations add up to the duration of the record. Calendar days follow `tz`.
pub fn split_record<Tz: TimeZone>(
    record: &TimeRecord,
    granularity: Granularity,
    tz: &Tz,
) -> Result<Vec<SplitRecord>, AnalysisError> {
    record.check_interval()?;

    let mut partition =
        PartitionKey::containing(granularity, record.start.with_timezone(tz).date_naive())?;
    let mut rest = record.clone();
    let mut pieces = vec![];

    loop {
        let boundary = partition.end_in(tz)?;
        match rest.split_by(boundary) {
            (Some(before), Some(after)) => {
                pieces.push(SplitRecord::new(before, partition));
                rest = after;
                partition = partition.next()?;
            }
            (Some(before), None) => {
                pieces.push(SplitRecord::new(before, partition));
                break;
            }
            // A boundary before the remaining start only happens when a DST gap pushes the start
            // of a day past its local midnight. Move on to the following partition.
            (None, Some(after)) => {
                rest = after;
                partition = partition.next()?;
            }
            (None, None) => unreachable!(),
        }
    }

    trace!("Split {} into {} pieces", record.id, pieces.len());
    Ok(pieces)
}

/// Splits every record at partition boundaries, see [split_record]. Fails on the first record
/// that ends before it starts.
#[instrument(skip(records, tz), fields(records = records.len()))]
pub fn split_by_partition<Tz: TimeZone>(
    records: &[TimeRecord],
    granularity: Granularity,
    tz: &Tz,
) -> Result<Vec<SplitRecord>, AnalysisError> {
    let mut split = Vec::with_capacity(records.len());
    for record in records {
        split.extend(split_record(record, granularity, tz)?);
    }
    Ok(split)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

    use crate::{
        analysis::{error::AnalysisError, partition::Granularity},
        storage::entities::TimeRecord,
        utils::{logging::TEST_LOGGING, time::zones::MidnightFallBack},
    };

    use super::{split_by_partition, split_record};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn record(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> TimeRecord {
        TimeRecord::new(id, start, end, ["work", "rust"])
    }

    #[test]
    fn day_boundary_splits_in_two() -> Result<()> {
        *TEST_LOGGING;
        let source = record("a", at(2024, 1, 31, 23, 0), at(2024, 2, 1, 1, 0));
        let pieces = split_record(&source, Granularity::Day, &Utc)?;

        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].partition.to_string(), "2024-01-31");
        assert_eq!(pieces[0].start, at(2024, 1, 31, 23, 0));
        assert_eq!(pieces[0].end, at(2024, 2, 1, 0, 0));
        assert_eq!(pieces[0].duration, Duration::hours(1));
        assert_eq!(pieces[1].partition.to_string(), "2024-02-01");
        assert_eq!(pieces[1].start, at(2024, 2, 1, 0, 0));
        assert_eq!(pieces[1].end, at(2024, 2, 1, 1, 0));
        assert_eq!(pieces[1].duration, Duration::hours(1));
        assert!(pieces.iter().all(|v| &*v.parent_id == "a" && v.tags == source.tags));
        Ok(())
    }

    #[test]
    fn record_inside_partition_is_not_split() -> Result<()> {
        let source = record("a", at(2024, 3, 5, 9, 0), at(2024, 3, 5, 17, 30));
        let pieces = split_record(&source, Granularity::Day, &Utc)?;

        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].start, source.start);
        assert_eq!(pieces[0].end, source.end);
        assert_eq!(pieces[0].duration, Duration::minutes(8 * 60 + 30));
        Ok(())
    }

    #[test]
    fn end_on_boundary_is_not_split() -> Result<()> {
        let source = record("a", at(2024, 3, 5, 22, 0), at(2024, 3, 6, 0, 0));
        let pieces = split_record(&source, Granularity::Day, &Utc)?;
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].partition.to_string(), "2024-03-05");
        Ok(())
    }

    #[test]
    fn zero_duration_record_is_kept() -> Result<()> {
        let moment = at(2024, 3, 5, 12, 0);
        let pieces = split_record(&record("a", moment, moment), Granularity::Month, &Utc)?;

        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].duration, Duration::zero());
        assert_eq!(pieces[0].partition.to_string(), "2024-03");
        Ok(())
    }

    #[test]
    fn inverted_record_fails() {
        let source = record("broken", at(2024, 3, 5, 12, 0), at(2024, 3, 5, 11, 0));
        let result = split_by_partition(&[source], Granularity::Day, &Utc);
        assert!(matches!(
            result,
            Err(AnalysisError::InvertedInterval { ref id, .. }) if &**id == "broken"
        ));
    }

    #[test]
    fn long_record_crosses_several_months() -> Result<()> {
        let source = record("a", at(2024, 1, 20, 0, 0), at(2024, 4, 2, 0, 0));
        let pieces = split_record(&source, Granularity::Month, &Utc)?;

        let partitions = pieces.iter().map(|v| v.partition.to_string()).collect::<Vec<_>>();
        assert_eq!(partitions, ["2024-01", "2024-02", "2024-03", "2024-04"]);
        assert_eq!(pieces[1].duration, Duration::days(29));
        assert_eq!(pieces[3].duration, Duration::days(1));
        for pair in pieces.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        Ok(())
    }

    #[test]
    fn durations_are_conserved() -> Result<()> {
        let records = [
            record("a", at(2024, 1, 31, 23, 0), at(2024, 2, 1, 1, 0)),
            record("b", at(2023, 12, 28, 17, 13), at(2024, 1, 9, 3, 41)),
            record("c", at(2024, 2, 28, 12, 0), at(2024, 3, 1, 12, 0)),
            record("d", at(2024, 5, 5, 5, 5), at(2024, 5, 5, 5, 5)),
        ];

        for granularity in [Granularity::Day, Granularity::Week, Granularity::Month] {
            let split = split_by_partition(&records, granularity, &Utc)?;
            for source in &records {
                let total = split
                    .iter()
                    .filter(|v| v.parent_id == source.id)
                    .fold(Duration::zero(), |ac, v| ac + v.duration);
                assert_eq!(total, source.duration()?, "{} {granularity}", source.id);
            }
        }
        Ok(())
    }

    #[test]
    fn week_split_uses_monday() -> Result<()> {
        // Sunday evening to Monday morning
        let source = record("a", at(2024, 2, 4, 20, 0), at(2024, 2, 5, 8, 0));
        let pieces = split_record(&source, Granularity::Week, &Utc)?;

        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].partition.to_string(), "2024-W05");
        assert_eq!(pieces[1].partition.to_string(), "2024-W06");
        assert_eq!(pieces[0].duration, Duration::hours(4));
        Ok(())
    }

    #[test]
    fn boundaries_follow_time_zone() -> Result<()> {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        // 21:00 to 23:00 UTC is 23:00 to 01:00 at UTC+2
        let source = record("a", at(2024, 1, 31, 21, 0), at(2024, 1, 31, 23, 0));

        assert_eq!(split_record(&source, Granularity::Day, &Utc)?.len(), 1);

        let pieces = split_record(&source, Granularity::Day, &tz)?;
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].partition.to_string(), "2024-01-31");
        assert_eq!(pieces[0].end, at(2024, 1, 31, 22, 0));
        assert_eq!(pieces[1].partition.to_string(), "2024-02-01");
        Ok(())
    }

    #[test]
    fn repeated_midnight_splits_at_first_occurrence() -> Result<()> {
        // 23:00 on Nov 2 to 00:45 on Nov 3 local, midnight is repeated an hour later
        let source = record("a", at(2024, 11, 3, 3, 0), at(2024, 11, 3, 4, 45));
        let pieces = split_record(&source, Granularity::Day, &MidnightFallBack)?;

        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].partition.to_string(), "2024-11-02");
        assert_eq!(pieces[0].end, at(2024, 11, 3, 4, 0));
        assert_eq!(pieces[1].partition.to_string(), "2024-11-03");
        assert_eq!(pieces[1].duration, Duration::minutes(45));
        Ok(())
    }

    #[test]
    fn empty_input_gives_empty_output() -> Result<()> {
        assert!(split_by_partition(&[], Granularity::Week, &Utc)?.is_empty());
        Ok(())
    }
}
