// src/timesheet.rs
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use std::io::Read;
use tracing::{debug, info, warn};

use crate::error::{AmbiguousDateError, LoadError};
use crate::name_key::normalize;
use crate::report::is_report_file_name;

pub const EMPLOYEE_NAME_COLUMN: &str = "Employee Name";
pub const CLOCK_IN_COLUMN: &str = "Clock-in Time";
/// Format of the clock-in column in the punch export, e.g. "06/02/2025 09:05 AM".
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M %p";

// Export artifacts that are never data columns.
const IGNORED_COLUMN_PREFIXES: [&str; 2] = ["legend", "unnamed"];

/// One raw punch. A punch whose timestamp could not be parsed is kept with
/// `clock_in` and `calendar_date` both `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchRecord {
    pub display_name: String,
    pub normalized_name: String,
    pub clock_in: Option<NaiveDateTime>,
    pub calendar_date: Option<NaiveDate>,
}

impl PunchRecord {
    pub fn new(display_name: &str, clock_in: Option<NaiveDateTime>) -> Self {
        Self {
            display_name: display_name.trim().to_string(),
            normalized_name: normalize(display_name),
            clock_in,
            calendar_date: clock_in.map(|ts| ts.date()),
        }
    }
}

pub fn is_ignored_column(header: &str) -> bool {
    let lower = header.trim().to_lowercase();
    IGNORED_COLUMN_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Whether a file found next to the timesheets may be picked as the latest
/// export. Published summaries and the schedule itself never qualify.
pub fn is_timesheet_candidate(file_name: &str, schedule_file: &str) -> bool {
    !is_report_file_name(file_name) && !file_name.eq_ignore_ascii_case(schedule_file)
}

/// Reads the punch export. Rows with an unreadable clock-in are retained
/// without a timestamp; only a missing required column fails the load.
pub fn load_timesheet<R: Read>(
    reader: R,
    source_name: &str,
    timestamp_format: &str,
) -> Result<Vec<PunchRecord>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        source,
        source_name: source_name.to_string(),
    };
    let missing = |column: &str| LoadError::MissingColumn {
        column: column.to_string(),
        source_name: source_name.to_string(),
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(csv_err)?.clone();
    let dropped: Vec<&str> = headers.iter().filter(|h| is_ignored_column(h)).collect();
    if !dropped.is_empty() {
        debug!("Ignoring columns in {}: {:?}", source_name, dropped);
    }

    let column_index = |name: &str| {
        headers
            .iter()
            .position(|h| h == name && !is_ignored_column(h))
    };
    let name_idx = column_index(EMPLOYEE_NAME_COLUMN).ok_or_else(|| missing(EMPLOYEE_NAME_COLUMN))?;
    let clock_idx = column_index(CLOCK_IN_COLUMN).ok_or_else(|| missing(CLOCK_IN_COLUMN))?;

    let mut records = Vec::new();
    let mut unparsed = 0usize;
    for record in csv_reader.records() {
        let record = record.map_err(csv_err)?;
        let name = record.get(name_idx).unwrap_or("");
        let raw_clock_in = record.get(clock_idx).unwrap_or("");
        let clock_in = NaiveDateTime::parse_from_str(raw_clock_in, timestamp_format).ok();
        if clock_in.is_none() {
            unparsed += 1;
            debug!(
                "Unparseable clock-in '{}' for '{}' in {}",
                raw_clock_in, name, source_name
            );
        }
        records.push(PunchRecord::new(name, clock_in));
    }

    if unparsed > 0 {
        warn!(
            "{} of {} punches in {} have no readable clock-in time",
            unparsed,
            records.len(),
            source_name
        );
    }
    info!("Loaded {} punches from {}", records.len(), source_name);
    Ok(records)
}

/// The single calendar date covered by the timesheet. Punches without a
/// readable timestamp do not count.
pub fn resolve_target_date(records: &[PunchRecord]) -> Result<NaiveDate, AmbiguousDateError> {
    let dates: BTreeSet<NaiveDate> = records.iter().filter_map(|r| r.calendar_date).collect();
    let found: Vec<NaiveDate> = dates.into_iter().collect();
    if let [date] = found.as_slice() {
        return Ok(*date);
    }
    Err(AmbiguousDateError { found })
}
