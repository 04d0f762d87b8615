// src/report.rs
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, FormatAlign, Workbook};
use thiserror::Error;

use crate::attendance::AttendanceRow;

pub const REPORT_HEADERS: [&str; 5] = ["Employee Name", "Status", "Scheduled", "Clock-in", "Date"];
const REPORT_FILE_PREFIX: &str = "attendance_summary_";
const COLUMN_PADDING: usize = 2;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Spreadsheet rendering failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV rendering failed")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer could not be flushed")]
    Io(#[from] std::io::Error),
}

/// `attendance_summary_<YYYY-MM-DD>.<extension>`
pub fn report_file_name(date: NaiveDate, extension: &str) -> String {
    format!("{}{}.{}", REPORT_FILE_PREFIX, date.format("%Y-%m-%d"), extension)
}

/// True for files this crate publishes, whatever their extension.
pub fn is_report_file_name(file_name: &str) -> bool {
    file_name.to_lowercase().starts_with(REPORT_FILE_PREFIX)
}

fn row_cells(row: &AttendanceRow) -> [String; 5] {
    [
        row.display_name.clone(),
        row.status.label().to_string(),
        row.scheduled_text.clone(),
        row.clock_in_display.clone(),
        row.date.format("%Y-%m-%d").to_string(),
    ]
}

/// Character width of the widest cell in each column, header included.
pub fn column_widths(rows: &[AttendanceRow]) -> [usize; 5] {
    let mut widths = REPORT_HEADERS.map(|h| h.chars().count());
    for row in rows {
        for (col, cell) in row_cells(row).iter().enumerate() {
            widths[col] = widths[col].max(cell.chars().count());
        }
    }
    widths
}

/// Renders the summary as an xlsx workbook: bold centered header, columns
/// sized to their content, header row frozen.
pub fn render_xlsx(rows: &[AttendanceRow]) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold().set_align(FormatAlign::Center);

    let sheet = workbook.add_worksheet();
    sheet.set_name("Attendance")?;

    for (col, header) in REPORT_HEADERS.iter().enumerate() {
        sheet.write_with_format(0, col as u16, *header, &header_format)?;
    }
    for (idx, row) in rows.iter().enumerate() {
        let sheet_row = (idx + 1) as u32;
        for (col, cell) in row_cells(row).iter().enumerate() {
            sheet.write_string(sheet_row, col as u16, cell.as_str())?;
        }
    }

    for (col, width) in column_widths(rows).iter().enumerate() {
        sheet.set_column_width(col as u16, (width + COLUMN_PADDING) as f64)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    Ok(workbook.save_to_buffer()?)
}

/// Plain CSV rendering of the same table.
pub fn render_csv(rows: &[AttendanceRow]) -> Result<Vec<u8>, ReportError> {
    // Header written explicitly so an empty report still has one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(REPORT_HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| ReportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendanceStatus;

    fn rows() -> Vec<AttendanceRow> {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        vec![
            AttendanceRow {
                display_name: "Dave".to_string(),
                status: AttendanceStatus::Absent,
                scheduled_text: "9am-5pm".to_string(),
                clock_in_display: String::new(),
                date,
            },
            AttendanceRow {
                display_name: "Maximiliana Featherstonehaugh".to_string(),
                status: AttendanceStatus::PresentNoSchedule,
                scheduled_text: String::new(),
                clock_in_display: "07:45 AM".to_string(),
                date,
            },
        ]
    }

    #[test]
    fn test_report_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert_eq!(
            report_file_name(date, "xlsx"),
            "attendance_summary_2025-06-02.xlsx"
        );
    }

    #[test]
    fn test_is_report_file_name() {
        assert!(is_report_file_name("attendance_summary_2025-06-02.csv"));
        assert!(is_report_file_name("Attendance_Summary_2025-06-02.xlsx"));
        assert!(!is_report_file_name("punches_2025-06-02.csv"));
        assert!(!is_report_file_name("summary_attendance_summary_.csv"));
    }

    #[test]
    fn test_column_widths_cover_header_and_cells() {
        let widths = column_widths(&rows());
        assert_eq!(widths[0], "Maximiliana Featherstonehaugh".len());
        assert_eq!(widths[1], "Present (No Schedule)".len());
        assert_eq!(widths[2], "Scheduled".len());
        assert_eq!(widths[3], "Clock-in".len());
        assert_eq!(widths[4], "2025-06-02".len());
    }

    #[test]
    fn test_render_xlsx_produces_zip_container() {
        let bytes = render_xlsx(&rows()).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_render_csv() {
        let bytes = render_csv(&rows()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Employee Name,Status,Scheduled,Clock-in,Date");
        assert_eq!(lines[1], "Dave,Absent,9am-5pm,,2025-06-02");
        assert_eq!(
            lines[2],
            "Maximiliana Featherstonehaugh,Present (No Schedule),,07:45 AM,2025-06-02"
        );
    }
}
