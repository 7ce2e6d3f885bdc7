//! Reads a TimeTagger database and turns its records into chart-ready data: time per tag path
//! for sunburst charts and time per day, week or month for stacked bar charts. Records that cross
//! a calendar boundary are split so every piece is counted in the period it happened in.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod storage;
pub mod utils;
