use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use tracing::debug;

/// Locations TimeTagger data is usually mounted at in containers.
const DEFAULT_DATA_DIRS: [&str; 3] = ["/data/timetagger", "/data", "/app/data"];

#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigArgs {
    #[arg(
        long = "db",
        env = "TIMETAGGER_DB_PATH",
        help = "Path to a TimeTagger user database"
    )]
    db_path: Option<PathBuf>,
    #[arg(
        long = "data-dir",
        env = "TIMETAGGER_DATADIR",
        help = "TimeTagger data directory. Searched for _timetagger/users/*.db when --db isn't set"
    )]
    data_dir: Option<PathBuf>,
    #[arg(long = "log-dir", help = "Also write logs into daily files in this directory")]
    log_dir: Option<PathBuf>,
    #[arg(long, help = "Use UTC instead of local time for day, week and month boundaries")]
    utc: bool,
}

impl ConfigArgs {
    /// Available before the rest is resolved, so resolution itself can be logged.
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Everything the application needs from its environment, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub utc: bool,
}

impl AppConfig {
    pub fn resolve(args: ConfigArgs) -> Result<Self> {
        Self::resolve_with(args, DEFAULT_DATA_DIRS.iter().map(PathBuf::from))
    }

    fn resolve_with(args: ConfigArgs, defaults: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
        let db_path = match args.db_path {
            Some(path) if path.is_file() => path,
            Some(path) => bail!("Database file not found: {path:?}"),
            None => {
                let search = args.data_dir.into_iter().chain(defaults).collect::<Vec<_>>();
                find_database(&search).ok_or_else(|| {
                    anyhow!(
                        "Database file not found in {search:?}. Set TIMETAGGER_DB_PATH or pass --db"
                    )
                })?
            }
        };
        debug!("Using database {db_path:?}");

        Ok(Self {
            db_path,
            utc: args.utc,
        })
    }
}

/// Returns the first `.db` file (by name) in `_timetagger/users` of the first data directory that
/// has one.
fn find_database(data_dirs: &[PathBuf]) -> Option<PathBuf> {
    data_dirs.iter().find_map(|base| {
        let users = base.join("_timetagger").join("users");
        let mut candidates = database_files(&users);
        candidates.sort();
        candidates.into_iter().next()
    })
}

fn database_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return vec![];
    };
    entries
        .filter_map(|entry| entry.ok().map(|v| v.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "db"))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;
    use tempfile::tempdir;

    use super::{AppConfig, ConfigArgs};

    #[test]
    fn explicit_database() -> Result<()> {
        let dir = tempdir()?;
        let db = dir.path().join("user.db");
        fs::write(&db, b"")?;

        let config = AppConfig::resolve_with(
            ConfigArgs {
                db_path: Some(db.clone()),
                utc: true,
                ..Default::default()
            },
            [],
        )?;
        assert_eq!(config.db_path, db);
        assert!(config.utc);
        Ok(())
    }

    #[test]
    fn explicit_missing_database_fails() {
        let dir = tempdir().unwrap();
        let result = AppConfig::resolve_with(
            ConfigArgs {
                db_path: Some(dir.path().join("missing.db")),
                ..Default::default()
            },
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn discovers_database_in_data_dir() -> Result<()> {
        let empty = tempdir()?;
        let data = tempdir()?;
        let users = data.path().join("_timetagger").join("users");
        fs::create_dir_all(&users)?;
        fs::write(users.join("b.db"), b"")?;
        fs::write(users.join("a.db"), b"")?;
        fs::write(users.join("notes.txt"), b"")?;

        let config = AppConfig::resolve_with(
            ConfigArgs {
                data_dir: Some(empty.path().to_path_buf()),
                ..Default::default()
            },
            [data.path().to_path_buf()],
        )?;
        assert_eq!(config.db_path, users.join("a.db"));
        Ok(())
    }

    #[test]
    fn log_dir_without_database() {
        let empty = tempdir().unwrap();
        let args = ConfigArgs {
            log_dir: Some(empty.path().join("logs")),
            ..Default::default()
        };

        assert_eq!(args.log_dir(), Some(empty.path().join("logs").as_path()));
        assert!(AppConfig::resolve_with(args, [empty.path().to_path_buf()]).is_err());
    }

    #[test]
    fn nothing_found_fails() {
        let empty = tempdir().unwrap();
        let result = AppConfig::resolve_with(ConfigArgs::default(), [empty.path().to_path_buf()]);
        assert!(result.is_err());
    }
}
