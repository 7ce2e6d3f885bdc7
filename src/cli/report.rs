use std::{collections::BTreeMap, fmt::Display, fmt::Write, sync::Arc};

use anyhow::Result;
use chrono::{Duration, TimeZone};
use clap::ValueEnum;
use serde::Serialize;
use tracing::info;

use crate::{
    analysis::{
        partition::{Granularity, PartitionKey},
        periods::{aggregate_by_partition_and_tag, PeriodTable},
        split::split_by_partition,
        summary::Summary,
        sunburst::sunburst_nodes,
        tags::{aggregate_by_tag_depth, total_duration, Depth, TagPath},
    },
    storage::{
        entities::TimeRecord,
        record_provider::{extract_between, RecordProvider},
    },
    utils::{
        percentage::{duration_percentage, Percentage},
        time::{as_hours, format_duration},
    },
};

use super::range::{resolve_range, RangeArgs};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct SummaryCommand {
    #[command(flatten)]
    range: RangeArgs,
}

#[derive(Debug, Clone, clap::Args)]
pub struct TagsCommand {
    #[command(flatten)]
    range: RangeArgs,
    #[arg(short, long, default_value = "2", help = "Depth of the tag hierarchy, 1 to 5")]
    depth: Depth,
    #[arg(short = 'p', long = "percentage", help = "Only print tag paths with at least this share of time", default_value_t = Percentage::ZERO)]
    min_percentage: Percentage,
    #[arg(short, long, default_value_t = OutputFormat::Text, help = "Json prints sunburst nodes with values in hours")]
    format: OutputFormat,
}

#[derive(Debug, Clone, clap::Args)]
pub struct PeriodsCommand {
    #[command(flatten)]
    range: RangeArgs,
    #[arg(short, long, default_value_t = Granularity::Week, help = "Size of a period")]
    granularity: Granularity,
    #[arg(short, long, default_value = "1", help = "Depth of the tag hierarchy used for columns, 1 to 5")]
    depth: Depth,
    #[arg(short, long, default_value_t = OutputFormat::Text, help = "Json prints one series of hours per column")]
    format: OutputFormat,
}

/// Loads records of the requested range, cut to the range. [None] if nothing is stored.
async fn load_records<Tz: TimeZone>(
    range: RangeArgs,
    provider: &impl RecordProvider,
    tz: &Tz,
) -> Result<Option<Vec<TimeRecord>>>
where
    Tz::Offset: Copy,
{
    let Some(range) = resolve_range(range, provider, tz).await? else {
        return Ok(None);
    };
    let records = extract_between(provider, range).await?;
    if records.is_empty() {
        return Ok(None);
    }
    info!("Loaded {} records", records.len());
    Ok(Some(records))
}

const NO_RECORDS: &str = "No records found for the selected range";

pub async fn process_summary_command<Tz: TimeZone>(
    SummaryCommand { range }: SummaryCommand,
    provider: &impl RecordProvider,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: Copy,
{
    let Some(records) = load_records(range, provider, tz).await? else {
        println!("{NO_RECORDS}");
        return Ok(());
    };
    print!("{}", render_summary(&Summary::from_records(&records)?));
    Ok(())
}

pub async fn process_tags_command<Tz: TimeZone>(
    TagsCommand {
        range,
        depth,
        min_percentage,
        format,
    }: TagsCommand,
    provider: &impl RecordProvider,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: Copy,
{
    let records = load_records(range, provider, tz).await?.unwrap_or_default();
    let totals = aggregate_by_tag_depth(&records, depth)?;

    match format {
        OutputFormat::Text if totals.is_empty() => println!("{NO_RECORDS}"),
        OutputFormat::Text => print!("{}", render_tags(&totals, min_percentage)),
        OutputFormat::Json => print_json(&SunburstView::new(&totals))?,
    }
    Ok(())
}

pub async fn process_periods_command<Tz: TimeZone>(
    PeriodsCommand {
        range,
        granularity,
        depth,
        format,
    }: PeriodsCommand,
    provider: &impl RecordProvider,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: Copy,
{
    let records = load_records(range, provider, tz).await?.unwrap_or_default();
    let split = split_by_partition(&records, granularity, tz)?;
    let table = aggregate_by_partition_and_tag(&split, depth)?;

    match format {
        OutputFormat::Text if table.is_empty() => println!("{NO_RECORDS}"),
        OutputFormat::Text => print!("{}", render_periods(&table)),
        OutputFormat::Json => print_json(&PeriodsView::new(granularity, &table))?,
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    println!();
    Ok(())
}

fn render_summary(summary: &Summary) -> String {
    format!(
        "Records\t{}\nTotal\t{:.1} hours\nAverage\t{:.1} min\nTags\t{}\n",
        summary.records,
        as_hours(summary.total),
        as_hours(summary.average) * 60.,
        summary.unique_tags
    )
}

/// One line per tag path, longest first.
fn render_tags(totals: &BTreeMap<TagPath, Duration>, min_percentage: Percentage) -> String {
    let whole = total_duration(totals.values());
    let mut entries = totals.iter().collect::<Vec<_>>();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut output = String::new();
    for (path, duration) in entries {
        let share = duration_percentage(*duration, whole);
        if share < min_percentage {
            continue;
        }
        let _ = writeln!(
            output,
            "{}%\t{}\t{}",
            *share as i32,
            format_duration(*duration),
            path
        );
    }
    output
}

/// Header row with the columns, then one row per period.
fn render_periods(table: &PeriodTable) -> String {
    let columns = table.columns();
    let mut output = String::from("period");
    for column in &columns {
        let _ = write!(output, "\t{column}");
    }
    output.push('\n');

    for (partition, row) in table.rows() {
        output.push_str(&partition.to_string());
        for duration in row {
            let _ = write!(output, "\t{}", format_duration(duration));
        }
        output.push('\n');
    }
    output
}

/// Parallel arrays in the shape sunburst renderers take.
#[derive(Debug, Serialize, PartialEq)]
struct SunburstView {
    ids: Vec<String>,
    labels: Vec<Arc<str>>,
    parents: Vec<String>,
    hours: Vec<f64>,
}

impl SunburstView {
    fn new(totals: &BTreeMap<TagPath, Duration>) -> Self {
        let nodes = sunburst_nodes(totals);
        Self {
            ids: nodes.iter().map(|v| v.id.clone()).collect(),
            labels: nodes.iter().map(|v| v.label.clone()).collect(),
            parents: nodes.iter().map(|v| v.parent.clone()).collect(),
            hours: nodes.iter().map(|v| as_hours(v.value)).collect(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct SeriesView {
    tag: String,
    hours: Vec<f64>,
}

/// Periods on the x axis, one stacked series per column.
#[derive(Debug, Serialize, PartialEq)]
struct PeriodsView<'a> {
    granularity: String,
    periods: Vec<&'a PartitionKey>,
    labels: Vec<String>,
    series: Vec<SeriesView>,
}

impl<'a> PeriodsView<'a> {
    fn new(granularity: Granularity, table: &'a PeriodTable) -> Self {
        let periods = table.partitions().collect::<Vec<_>>();
        let series = table
            .columns()
            .into_iter()
            .map(|tag| SeriesView {
                tag: tag.to_string(),
                hours: periods
                    .iter()
                    .map(|partition| as_hours(table.get(partition, tag)))
                    .collect(),
            })
            .collect();
        Self {
            granularity: granularity.to_string(),
            labels: periods.iter().map(|v| v.label()).collect(),
            periods,
            series,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::{
        analysis::{
            partition::Granularity,
            periods::aggregate_by_partition_and_tag,
            split::split_by_partition,
            summary::Summary,
            tags::{aggregate_by_tag_depth, Depth},
        },
        storage::entities::TimeRecord,
        utils::percentage::Percentage,
    };

    use super::{render_periods, render_summary, render_tags, PeriodsView, SunburstView};

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn fixtures() -> Vec<TimeRecord> {
        vec![
            TimeRecord::new("a", at(31, 23), at(31, 23) + Duration::hours(2), ["work", "rust"]),
            TimeRecord::new("b", at(30, 9), at(30, 10), ["home"]),
            TimeRecord::new("c", at(30, 11), at(30, 12), ["work"]),
        ]
    }

    #[test]
    fn tags_text_is_sorted_by_duration() -> Result<()> {
        let totals = aggregate_by_tag_depth(&fixtures(), Depth::MIN)?;
        assert_eq!(
            render_tags(&totals, Percentage::ZERO),
            "75%\t3h0m0s\twork\n25%\t1h0m0s\thome\n"
        );
        assert_eq!(
            render_tags(&totals, "50".parse::<Percentage>()?),
            "75%\t3h0m0s\twork\n"
        );
        Ok(())
    }

    #[test]
    fn periods_text() -> Result<()> {
        let split = split_by_partition(&fixtures(), Granularity::Day, &Utc)?;
        let table = aggregate_by_partition_and_tag(&split, Depth::MIN)?;
        assert_eq!(
            render_periods(&table),
            "period\thome\twork\n\
             2024-01-30\t1h0m0s\t1h0m0s\n\
             2024-01-31\t0s\t1h0m0s\n\
             2024-02-01\t0s\t1h0m0s\n"
        );
        Ok(())
    }

    #[test]
    fn periods_json_view() -> Result<()> {
        let split = split_by_partition(&fixtures(), Granularity::Month, &Utc)?;
        let table = aggregate_by_partition_and_tag(&split, Depth::MIN)?;
        let view = PeriodsView::new(Granularity::Month, &table);

        let json = serde_json::to_value(&view)?;
        assert_eq!(json["granularity"], "month");
        assert_eq!(json["periods"], serde_json::json!(["2024-01", "2024-02"]));
        assert_eq!(
            json["labels"],
            serde_json::json!(["January 2024", "February 2024"])
        );
        assert_eq!(json["series"][1]["tag"], "work");
        assert_eq!(json["series"][1]["hours"], serde_json::json!([2.0, 1.0]));
        Ok(())
    }

    #[test]
    fn sunburst_json_view() -> Result<()> {
        let totals = aggregate_by_tag_depth(&fixtures(), Depth::new(2)?)?;
        let view = SunburstView::new(&totals);

        assert_eq!(view.ids, ["home", "work", "work > rust"]);
        assert_eq!(view.parents, ["", "", "work"]);
        assert_eq!(view.hours, [1.0, 3.0, 2.0]);
        Ok(())
    }

    #[test]
    fn summary_text() -> Result<()> {
        let summary = Summary::from_records(&fixtures())?;
        assert_eq!(
            render_summary(&summary),
            "Records\t3\nTotal\t4.0 hours\nAverage\t80.0 min\nTags\t3\n"
        );
        Ok(())
    }
}
