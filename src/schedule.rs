// src/schedule.rs
use chrono::{NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::name_key::normalize;

pub const NAME_COLUMN: &str = "Name";

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

// "9am", "9:30am", "09:30PM"
static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?::(\d{1,2}))?([ap])m$").expect("static regex is valid")
});

// --- Schedule Structures ---

/// One employee's row of the weekly schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub display_name: String,
    pub normalized_name: String,
    pub per_weekday_text: HashMap<Weekday, String>,
}

impl ScheduleEntry {
    pub fn new(display_name: &str, per_weekday_text: HashMap<Weekday, String>) -> Self {
        Self {
            display_name: display_name.trim().to_string(),
            normalized_name: normalize(display_name),
            per_weekday_text,
        }
    }

    /// Schedule text for the given day, empty when the column was absent.
    pub fn weekday_text(&self, day: Weekday) -> &str {
        self.per_weekday_text
            .get(&day)
            .map(|s| s.trim())
            .unwrap_or("")
    }
}

/// What a single schedule cell says about a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleCell {
    /// Empty or "off".
    Off,
    /// A shift. `start` is `None` when the text could not be read as a clock time;
    /// lateness is then never reported.
    Shift { start: Option<NaiveTime> },
}

pub fn read_cell(cell_text: &str) -> ScheduleCell {
    let text = cell_text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("off") {
        return ScheduleCell::Off;
    }
    let start_text = text.split('-').next().unwrap_or("").trim();
    ScheduleCell::Shift {
        start: parse_clock_time(start_text),
    }
}

/// Scheduled start of a shift cell such as "9am-5pm" or "9:30am-5pm".
/// Returns `None` for days off and for text that is not a recognizable time.
pub fn parse_scheduled_start(cell_text: &str) -> Option<NaiveTime> {
    match read_cell(cell_text) {
        ScheduleCell::Off => None,
        ScheduleCell::Shift { start } => start,
    }
}

fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    let caps = CLOCK_TIME.captures(text)?;
    let hour12: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if !(1..=12).contains(&hour12) {
        return None;
    }
    let is_pm = caps.get(3)?.as_str().eq_ignore_ascii_case("p");
    let hour = match (hour12, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn weekday_from_header(header: &str) -> Option<Weekday> {
    let lower = header.trim().to_lowercase();
    WEEKDAYS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, day)| *day)
}

// --- Loading ---

/// Reads the weekly schedule CSV. Requires a `Name` column; weekday columns
/// are picked up by their full English name.
pub fn load_schedule<R: Read>(reader: R, source_name: &str) -> Result<Vec<ScheduleEntry>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        source,
        source_name: source_name.to_string(),
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(csv_err)?.clone();
    let name_idx = headers
        .iter()
        .position(|h| h == NAME_COLUMN)
        .ok_or_else(|| LoadError::MissingColumn {
            column: NAME_COLUMN.to_string(),
            source_name: source_name.to_string(),
        })?;

    let weekday_columns: Vec<(usize, Weekday)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, h)| weekday_from_header(h).map(|day| (idx, day)))
        .collect();
    debug!(
        "Schedule {} has {} weekday columns",
        source_name,
        weekday_columns.len()
    );

    let mut entries = Vec::new();
    for (row_idx, record) in csv_reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let name = record.get(name_idx).unwrap_or("");
        if name.is_empty() {
            warn!("Skipping schedule row {} in {}: blank name", row_idx + 1, source_name);
            continue;
        }
        let per_weekday_text = weekday_columns
            .iter()
            .map(|(idx, day)| (*day, record.get(*idx).unwrap_or("").to_string()))
            .collect();
        entries.push(ScheduleEntry::new(name, per_weekday_text));
    }

    info!("Loaded {} schedule entries from {}", entries.len(), source_name);
    Ok(entries)
}
