//!  Records are read through [record_provider::RecordProvider].
//!  The basic idea is:
//!   - The TimeTagger database is only ever read, never written.
//!   - Records are loaded fresh for every query and cut to the requested range.
//!   - Tags are extracted from record descriptions while loading.

pub mod entities;
pub mod record_provider;
pub mod sqlite;
