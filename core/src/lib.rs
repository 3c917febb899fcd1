pub mod calendar;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod store;

pub use error::{ContentError, ProgressError};
pub use service::{ManualDayAnchor, ProgressTracker};
