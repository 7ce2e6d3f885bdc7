use std::{collections::BTreeMap, fmt::Display, ops::Deref, str::FromStr, sync::Arc};

use chrono::Duration;
use tracing::instrument;

use crate::storage::entities::TimeRecord;

use super::{error::AnalysisError, split::SplitRecord};

/// Stands in for hierarchy levels a record doesn't have.
pub const NO_TAG: &str = "<none>";

/// Requested depth of the tag hierarchy, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Depth(usize);

impl Depth {
    pub const MIN: Depth = Depth(1);
    pub const MAX: Depth = Depth(5);

    pub fn new(value: i64) -> Result<Self, AnalysisError> {
        if (Self::MIN.0 as i64..=Self::MAX.0 as i64).contains(&value) {
            Ok(Depth(value as usize))
        } else {
            Err(AnalysisError::InvalidDepth(value))
        }
    }

    /// Every depth from 1 to 5.
    pub fn all() -> impl Iterator<Item = Depth> {
        (Self::MIN.0..=Self::MAX.0).map(Depth)
    }
}

impl Deref for Depth {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Depth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Depth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Depth::new(s.trim().parse::<i64>()?)?)
    }
}

/// A tag hierarchy prefix of exactly `depth` levels. Missing levels hold [NO_TAG].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagPath(Vec<Arc<str>>);

impl TagPath {
    pub fn truncate(tags: &[Arc<str>], depth: Depth) -> Self {
        let none: Arc<str> = NO_TAG.into();
        TagPath(
            (0..*depth)
                .map(|i| tags.get(i).cloned().unwrap_or_else(|| none.clone()))
                .collect(),
        )
    }

    pub fn levels(&self) -> &[Arc<str>] {
        &self.0
    }
}

impl<T: Into<Arc<str>>> FromIterator<T> for TagPath {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        TagPath(iter.into_iter().map(Into::into).collect())
    }
}

impl Display for TagPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" > "))
    }
}

/// Anything that carries tags and a duration that can be aggregated.
pub trait Tagged {
    fn tags(&self) -> &[Arc<str>];

    fn tracked_duration(&self) -> Result<Duration, AnalysisError>;
}

impl Tagged for TimeRecord {
    fn tags(&self) -> &[Arc<str>] {
        &self.tags
    }

    fn tracked_duration(&self) -> Result<Duration, AnalysisError> {
        self.duration()
    }
}

impl Tagged for SplitRecord {
    fn tags(&self) -> &[Arc<str>] {
        &self.tags
    }

    fn tracked_duration(&self) -> Result<Duration, AnalysisError> {
        Ok(self.duration)
    }
}

/// Sums durations per tag path truncated to `depth`. Padding keeps every record in the result, so
/// the total is the same for every depth.
#[instrument(skip(records))]
pub fn aggregate_by_tag_depth<'a, T: Tagged + 'a>(
    records: impl IntoIterator<Item = &'a T>,
    depth: Depth,
) -> Result<BTreeMap<TagPath, Duration>, AnalysisError> {
    let mut totals = BTreeMap::<TagPath, Duration>::new();
    for record in records {
        let duration = record.tracked_duration()?;
        *totals
            .entry(TagPath::truncate(record.tags(), depth))
            .or_insert_with(Duration::zero) += duration;
    }
    Ok(totals)
}

pub fn total_duration<'a>(values: impl IntoIterator<Item = &'a Duration>) -> Duration {
    values
        .into_iter()
        .fold(Duration::zero(), |ac, next| ac + *next)
}
