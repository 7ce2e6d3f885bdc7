use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::{params, Connection, OpenFlags};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{entities::TimeRecord, record_provider::RecordProvider};

const RECORDS_SELECT_SQL: &str = "SELECT _ob, t1, t2
FROM records
WHERE t2 >= ?1
  AND t1 <= ?2
ORDER BY t1";

const BOUNDS_SELECT_SQL: &str = "SELECT MIN(t1), MAX(t2) FROM records";

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("tag pattern should compile"));

/// The JSON object TimeTagger stores in the `_ob` column. Only the fields used here are read.
#[derive(Debug, Deserialize)]
struct StoredRecord {
    #[serde(default)]
    key: String,
    #[serde(default)]
    ds: String,
}

/// Reads records from a TimeTagger user database. The database is opened read-only for every
/// query, so nothing is held open between requests.
#[derive(Debug, Clone)]
pub struct SqliteRecordProvider {
    db_path: PathBuf,
}

impl SqliteRecordProvider {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

}

impl RecordProvider for SqliteRecordProvider {
    #[instrument(skip(self))]
    async fn fetch_records(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeRecord>> {
        let db_path = self.db_path.clone();
        let records = tokio::task::spawn_blocking(move || -> Result<Vec<TimeRecord>> {
            let conn = open_read_only(&db_path)?;
            query_records(&conn, start, end)
        })
        .await??;
        debug!("Fetched {} records from {:?}", records.len(), self.db_path);
        Ok(records)
    }

    async fn bounds(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || -> Result<_> {
            let conn = open_read_only(&db_path)?;
            let (min, max) = conn.query_row(BOUNDS_SELECT_SQL, [], |row| {
                Ok((row.get::<_, Option<f64>>(0)?, row.get::<_, Option<f64>>(1)?))
            })?;
            match (min, max) {
                (Some(min), Some(max)) => Ok(Some((timestamp(min)?, timestamp(max)?))),
                _ => Ok(None),
            }
        })
        .await?
    }
}

fn open_read_only(path: &Path) -> Result<Connection> {
    debug!("Opening {path:?}");
    Ok(Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?)
}

/// Columns hold fractional Unix seconds, so bounds keep their milliseconds.
fn seconds(v: DateTime<Utc>) -> f64 {
    v.timestamp_millis() as f64 / 1000.
}

fn query_records(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<TimeRecord>> {
    let mut stmt = conn.prepare(RECORDS_SELECT_SQL)?;
    let mut rows = stmt.query(params![seconds(start), seconds(end)])?;

    let mut records = vec![];
    while let Some(row) = rows.next()? {
        let ob: Option<String> = row.get("_ob")?;
        let t1: Option<f64> = row.get("t1")?;
        let t2: Option<f64> = row.get("t2")?;
        match parse_record(ob.as_deref(), t1, t2) {
            Ok(v) => records.push(v),
            Err(e) => {
                // ignore malformed rows, they can't be charted anyway
                warn!("Skipping malformed record {ob:?} ({t1:?}, {t2:?}): {e}")
            }
        }
    }
    Ok(records)
}

fn parse_record(ob: Option<&str>, t1: Option<f64>, t2: Option<f64>) -> Result<TimeRecord> {
    let stored: StoredRecord =
        serde_json::from_str(ob.ok_or_else(|| anyhow!("record object is missing"))?)?;
    let start = timestamp(t1.ok_or_else(|| anyhow!("start is missing"))?)?;
    let end = timestamp(t2.ok_or_else(|| anyhow!("end is missing"))?)?;
    let tags = extract_tags(&stored.ds);
    Ok(TimeRecord::new(stored.key, start, end, tags).with_description(stored.ds))
}

/// Tags are `#word` tokens of the description, in order of appearance, without the `#`.
pub fn extract_tags(description: &str) -> Vec<&str> {
    TAG_PATTERN
        .captures_iter(description)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// TimeTagger stores Unix timestamps in seconds, possibly fractional.
fn timestamp(seconds: f64) -> Result<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(anyhow!("timestamp {seconds} is not a number"));
    }
    DateTime::from_timestamp_millis((seconds * 1000.).round() as i64)
        .ok_or_else(|| anyhow!("timestamp {seconds} is out of range"))
}
