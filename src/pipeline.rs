// src/pipeline.rs
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

use crate::attendance::{classify, AttendanceRow};
use crate::error::AppError;
use crate::report::{render_csv, render_xlsx, report_file_name};
use crate::schedule::load_schedule;
use crate::store::DocumentStore;
use crate::timesheet::{load_timesheet, resolve_target_date, DEFAULT_TIMESTAMP_FORMAT};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub timestamp_format: String,
    /// Publish a CSV copy of the summary next to the workbook.
    pub export_csv: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            export_csv: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub target_date: NaiveDate,
    pub report_name: String,
    pub location: String,
    pub rows: Vec<AttendanceRow>,
}

pub fn status_counts(rows: &[AttendanceRow]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts.entry(row.status.label()).or_insert(0) += 1;
    }
    counts
}

/// Fetches both inputs, reconciles them and publishes the summary.
/// Any load or date error aborts before anything is published.
pub async fn run<S: DocumentStore + ?Sized>(store: &S, options: &RunOptions) -> Result<RunSummary, AppError> {
    info!("Starting attendance reconciliation...");
    let (schedule_doc, timesheet_doc) =
        tokio::try_join!(store.fetch_schedule(), store.fetch_latest_timesheet())?;

    let schedule = load_schedule(schedule_doc.bytes.as_slice(), &schedule_doc.name)?;
    let punches = load_timesheet(
        timesheet_doc.bytes.as_slice(),
        &timesheet_doc.name,
        &options.timestamp_format,
    )?;
    let target_date = resolve_target_date(&punches)?;
    info!("Target date resolved from {}: {}", timesheet_doc.name, target_date);

    let rows = classify(&schedule, &punches, target_date);
    for (status, count) in status_counts(&rows) {
        info!("{}: {}", status, count);
    }

    let report_name = report_file_name(target_date, "xlsx");
    let workbook = render_xlsx(&rows)?;
    info!("Publishing summary: {}", report_name);
    let location = store.publish_report(&report_name, workbook).await?;

    if options.export_csv {
        let csv_name = report_file_name(target_date, "csv");
        let csv_location = store.publish_report(&csv_name, render_csv(&rows)?).await?;
        info!("CSV copy published: {}", csv_location);
    }

    info!("Summary published: {}", location);
    Ok(RunSummary {
        target_date,
        report_name,
        location,
        rows,
    })
}
