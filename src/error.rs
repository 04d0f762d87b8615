// src/error.rs
use chrono::NaiveDate;
use thiserror::Error;

use crate::graph_client::GraphError;
use crate::report::ReportError;

// --- Input Errors ---

/// Structural problems with a schedule or timesheet source. Fatal to the run.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{source_name} is missing required column '{column}'")]
    MissingColumn { column: String, source_name: String },

    #[error("Failed to read CSV from {source_name}")]
    Csv {
        #[source]
        source: csv::Error,
        source_name: String,
    },
}

/// The timesheet must cover exactly one calendar date.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Expected exactly 1 date in timesheet, found {}: {found:?}", found.len())]
pub struct AmbiguousDateError {
    pub found: Vec<NaiveDate>,
}

// --- Application Error ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Input could not be loaded")]
    Load(#[from] LoadError),

    #[error(transparent)]
    AmbiguousDate(#[from] AmbiguousDateError),

    #[error("Graph drive error")]
    Graph(#[from] GraphError),

    #[error("Report rendering failed")]
    Report(#[from] ReportError),

    #[error("Configuration error")]
    Config(#[from] envy::Error),

    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("No timesheet found: {0}")]
    NoTimesheet(String),
}

// Helper to create context-aware IO errors
pub fn io_context<E: Into<std::io::Error>, S: Into<String>>(source: E, context: S) -> AppError {
    AppError::Io {
        source: source.into(),
        context: context.into(),
    }
}
