use chrono::NaiveDate;
use thiserror::Error;

/// Failures of the progress state machine.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("No program started. Start the program first.")]
    NotStarted,

    #[error("Day must be between 1 and 63 (got {0})")]
    OutOfRange(i64),

    #[error("The program must start on a Sunday ({0} is a {weekday})", weekday = .0.format("%A"))]
    InvalidStartDay(NaiveDate),

    #[error("The start date must be a Sunday ({0} is a {weekday})", weekday = .0.format("%A"))]
    NotSunday(NaiveDate),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Failures of content lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("Invalid day number {0}. Must be between 1 and 63.")]
    InvalidDay(i64),

    #[error("Invalid week number {0}. Must be between 1 and 9.")]
    InvalidWeek(i64),

    #[error("Reflection for day {0} not found")]
    NotFound(u32),
}
