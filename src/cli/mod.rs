pub mod range;
pub mod report;

use anyhow::Result;
use chrono::{Local, TimeZone, Utc};
use clap::{Parser, Subcommand};
use report::{
    process_periods_command, process_summary_command, process_tags_command, PeriodsCommand,
    SummaryCommand, TagsCommand,
};
use tracing::level_filters::LevelFilter;

use crate::{
    config::{AppConfig, ConfigArgs},
    storage::{record_provider::RecordProvider, sqlite::SqliteRecordProvider},
    utils::logging::enable_logging,
};

#[derive(Parser, Debug)]
#[command(name = "Timetally", version, long_about = None)]
#[command(about = "Chart-ready summaries of TimeTagger records", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[command(flatten)]
    config: ConfigArgs,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Record count, total and average time, number of distinct tags")]
    Summary {
        #[command(flatten)]
        command: SummaryCommand,
    },
    #[command(about = "Time per tag path. Used for sunburst charts")]
    Tags {
        #[command(flatten)]
        command: TagsCommand,
    },
    #[command(about = "Time per day, week or month and tag. Used for stacked bar charts")]
    Periods {
        #[command(flatten)]
        command: PeriodsCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(args.config.log_dir(), logging_level, args.log)?;

    let config = AppConfig::resolve(args.config)?;

    let provider = SqliteRecordProvider::new(config.db_path.clone());
    if config.utc {
        run_command(args.commands, &provider, &Utc).await
    } else {
        run_command(args.commands, &provider, &Local).await
    }
}

async fn run_command<Tz: TimeZone>(
    commands: Commands,
    provider: &impl RecordProvider,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: Copy,
{
    match commands {
        Commands::Summary { command } => process_summary_command(command, provider, tz).await,
        Commands::Tags { command } => process_tags_command(command, provider, tz).await,
        Commands::Periods { command } => process_periods_command(command, provider, tz).await,
    }
}
