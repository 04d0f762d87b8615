// src/attendance.rs
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::name_key::title_case;
use crate::schedule::{read_cell, ScheduleCell, ScheduleEntry};
use crate::timesheet::PunchRecord;

/// Display format of a clock-in time, e.g. "09:05 AM".
pub const CLOCK_IN_DISPLAY_FORMAT: &str = "%I:%M %p";

// --- Attendance Structures ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttendanceStatus {
    #[serde(rename = "Absent")]
    Absent,
    #[serde(rename = "Late Clock-in")]
    LateClockIn,
    #[serde(rename = "Not Scheduled")]
    NotScheduled,
    #[serde(rename = "Present")]
    Present,
    #[serde(rename = "Present (No Schedule)")]
    PresentNoSchedule,
}

impl AttendanceStatus {
    /// Report label. Rows are ordered by this text.
    pub fn label(&self) -> &'static str {
        match self {
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::LateClockIn => "Late Clock-in",
            AttendanceStatus::NotScheduled => "Not Scheduled",
            AttendanceStatus::Present => "Present",
            AttendanceStatus::PresentNoSchedule => "Present (No Schedule)",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One line of the attendance summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRow {
    #[serde(rename = "Employee Name")]
    pub display_name: String,
    #[serde(rename = "Status")]
    pub status: AttendanceStatus,
    #[serde(rename = "Scheduled")]
    pub scheduled_text: String,
    #[serde(rename = "Clock-in")]
    pub clock_in_display: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
}

/// A person's punches on the target date, reduced to the earliest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchGroup {
    /// Display name of the first punch in source order.
    pub display_name: String,
    pub first_clock_in: NaiveDateTime,
    pub punch_count: usize,
}

// --- Classification ---

/// Groups the target date's punches by normalized name, keeping the earliest
/// clock-in. Punches without a timestamp or without a name are ignored.
pub fn group_punches(punches: &[PunchRecord], target_date: NaiveDate) -> BTreeMap<String, PunchGroup> {
    let mut groups: BTreeMap<String, PunchGroup> = BTreeMap::new();
    for punch in punches {
        let clock_in = match punch.clock_in {
            Some(ts) if punch.calendar_date == Some(target_date) => ts,
            _ => continue,
        };
        if punch.normalized_name.is_empty() {
            continue;
        }
        groups
            .entry(punch.normalized_name.clone())
            .and_modify(|group| {
                group.first_clock_in = group.first_clock_in.min(clock_in);
                group.punch_count += 1;
            })
            .or_insert_with(|| PunchGroup {
                display_name: punch.display_name.clone(),
                first_clock_in: clock_in,
                punch_count: 1,
            });
    }
    groups
}

/// True only when a start time is known and the clock-in is strictly after it.
pub fn is_late(clock_in: NaiveTime, scheduled_start: Option<NaiveTime>) -> bool {
    scheduled_start.map_or(false, |start| clock_in > start)
}

fn format_clock_in(clock_in: NaiveDateTime) -> String {
    clock_in.time().format(CLOCK_IN_DISPLAY_FORMAT).to_string()
}

fn scheduled_row(
    entry: &ScheduleEntry,
    weekday: Weekday,
    group: Option<&PunchGroup>,
    target_date: NaiveDate,
) -> AttendanceRow {
    let scheduled_text = entry.weekday_text(weekday).to_string();
    let (status, clock_in_display) = match (read_cell(&scheduled_text), group) {
        (ScheduleCell::Off, _) => (AttendanceStatus::NotScheduled, String::new()),
        (ScheduleCell::Shift { .. }, None) => (AttendanceStatus::Absent, String::new()),
        (ScheduleCell::Shift { start }, Some(group)) => {
            let status = if is_late(group.first_clock_in.time(), start) {
                AttendanceStatus::LateClockIn
            } else {
                AttendanceStatus::Present
            };
            (status, format_clock_in(group.first_clock_in))
        }
    };
    AttendanceRow {
        display_name: entry.display_name.clone(),
        status,
        scheduled_text,
        clock_in_display,
        date: target_date,
    }
}

fn unscheduled_row(group: &PunchGroup, target_date: NaiveDate) -> AttendanceRow {
    AttendanceRow {
        display_name: group.display_name.clone(),
        status: AttendanceStatus::PresentNoSchedule,
        scheduled_text: String::new(),
        clock_in_display: format_clock_in(group.first_clock_in),
        date: target_date,
    }
}

/// Rows keyed by normalized name; the first insert for a key wins.
#[derive(Debug, Default)]
struct RowLedger {
    rows: Vec<AttendanceRow>,
    index: HashMap<String, usize>,
}

impl RowLedger {
    fn insert_first(&mut self, key: &str, row: AttendanceRow) -> bool {
        if self.index.contains_key(key) {
            debug!("Dropping duplicate attendance row for '{}'", key);
            return false;
        }
        self.index.insert(key.to_string(), self.rows.len());
        self.rows.push(row);
        true
    }

    fn into_rows(self) -> Vec<AttendanceRow> {
        self.rows
    }
}

/// Reconciles the schedule against the punches of `target_date`.
///
/// Every person found in either source gets exactly one row. Schedule rows
/// come first and win over punch-only rows for the same normalized name;
/// punch-only people are added in normalized-name order. The result is
/// sorted by status label, then by title-cased display name.
pub fn classify(
    schedule: &[ScheduleEntry],
    punches: &[PunchRecord],
    target_date: NaiveDate,
) -> Vec<AttendanceRow> {
    let groups = group_punches(punches, target_date);
    let weekday = target_date.weekday();
    debug!(
        "Classifying {} schedule entries against {} punch groups for {} ({:?})",
        schedule.len(),
        groups.len(),
        target_date,
        weekday
    );

    let mut ledger = RowLedger::default();
    for entry in schedule {
        let row = scheduled_row(
            entry,
            weekday,
            groups.get(&entry.normalized_name),
            target_date,
        );
        ledger.insert_first(&entry.normalized_name, row);
    }

    let scheduled_names: HashSet<&str> = schedule
        .iter()
        .map(|entry| entry.normalized_name.as_str())
        .collect();
    for (name, group) in &groups {
        if scheduled_names.contains(name.as_str()) {
            continue;
        }
        ledger.insert_first(name, unscheduled_row(group, target_date));
    }

    let mut rows = ledger.into_rows();
    for row in &mut rows {
        row.display_name = title_case(&row.display_name);
    }
    rows.sort_by(|a, b| {
        a.status
            .label()
            .cmp(b.status.label())
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
    rows
}
