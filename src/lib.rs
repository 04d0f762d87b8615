// src/lib.rs
//! Daily attendance reconciliation: joins the weekly schedule against the
//! day's clock-in punches and publishes a status summary.

pub mod attendance;
pub mod config;
pub mod error;
pub mod graph_client;
pub mod name_key;
pub mod pipeline;
pub mod report;
pub mod schedule;
pub mod store;
pub mod timesheet;

mod attendance_tests;

pub use attendance::{classify, AttendanceRow, AttendanceStatus};
pub use error::{AmbiguousDateError, AppError, LoadError};
pub use name_key::normalize;
pub use schedule::{parse_scheduled_start, ScheduleEntry};
pub use timesheet::{load_timesheet, resolve_target_date, PunchRecord};
