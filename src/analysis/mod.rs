//! Turns loaded [TimeRecord](crate::storage::entities::TimeRecord)s into chart data.
//!
//! Everything here is a pure function of the records, a [Granularity](partition::Granularity),
//! a [Depth](tags::Depth) and a time zone:
//!  - [split::split_by_partition] cuts records at day, week or month boundaries.
//!  - [tags::aggregate_by_tag_depth] sums durations per tag path for sunburst charts.
//!  - [periods::aggregate_by_partition_and_tag] sums split records per partition and tag for
//!    stacked bars.

pub mod error;
pub mod partition;
pub mod periods;
pub mod split;
pub mod summary;
pub mod sunburst;
pub mod tags;
