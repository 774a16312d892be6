pub mod challenge;
pub mod config;
pub mod goal;
pub mod read;
pub mod rule;
pub mod summary;
pub mod sync;
pub mod timer;
pub mod workout;

use chrono::NaiveDate;
use serde::Serialize;
use youfirst_core::{Clock, Config, SqliteStore, SystemClock};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print `value`, or fail with `not found: <what>` when it is `None`.
pub fn print_found<T: Serialize>(value: Option<T>, what: &str) -> CmdResult {
    match value {
        Some(value) => print_json(&value),
        None => Err(format!("not found: {what}").into()),
    }
}

/// An explicit `YYYY-MM-DD`, or today (UTC, like every stored date).
pub fn parse_date(value: Option<&str>) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match value {
        Some(s) => Ok(s
            .parse::<NaiveDate>()
            .map_err(|e| format!("invalid date '{s}': {e}"))?),
        None => Ok(SystemClock.today()),
    }
}

/// Open the database and load the configuration from the data directory.
pub fn open() -> Result<(SqliteStore, Config), Box<dyn std::error::Error>> {
    let store = SqliteStore::open()?;
    let config = Config::load()?;
    Ok((store, config))
}
