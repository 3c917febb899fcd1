use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{ContentError, ProgressError};

/// Number of days in the program.
pub const TOTAL_DAYS: u32 = 63;

/// Number of weeks in the program.
pub const TOTAL_WEEKS: u32 = 9;

pub const DAYS_PER_WEEK: u32 = 7;

/// Week number for a program day: `ceil(day / 7)`.
///
/// Days past the end of the program map to weeks past 9.
#[must_use]
pub fn week_of(day: u32) -> u32 {
    day.div_ceil(DAYS_PER_WEEK)
}

/// Validate a day argument for a progress mutation.
pub fn validate_day(day: i64) -> Result<u32, ProgressError> {
    match u32::try_from(day) {
        Ok(d) if (1..=TOTAL_DAYS).contains(&d) => Ok(d),
        _ => Err(ProgressError::OutOfRange(day)),
    }
}

pub(crate) fn validate_content_day(day: i64) -> Result<u32, ContentError> {
    match u32::try_from(day) {
        Ok(d) if (1..=TOTAL_DAYS).contains(&d) => Ok(d),
        _ => Err(ContentError::InvalidDay(day)),
    }
}

pub(crate) fn validate_content_week(week: i64) -> Result<u32, ContentError> {
    match u32::try_from(week) {
        Ok(w) if (1..=TOTAL_WEEKS).contains(&w) => Ok(w),
        _ => Err(ContentError::InvalidWeek(week)),
    }
}

/// The single persisted progress record.
///
/// `current_day` is a cache of the value derived from `start_date` at the
/// time of the last read or write; [`crate::service::ProgressTracker`]
/// recomputes it on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRecord {
    pub start_date: NaiveDate,
    pub current_day: u32,
    pub last_access_date: NaiveDateTime,
    /// Insertion order. Use [`ProgressRecord::sorted_favorites`] for display.
    pub favorites: Vec<u32>,
}

impl ProgressRecord {
    #[must_use]
    pub fn current_week(&self) -> u32 {
        week_of(self.current_day)
    }

    /// True once the derived day has moved past the last program day.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.current_day > TOTAL_DAYS
    }

    #[must_use]
    pub fn is_favorite(&self, day: u32) -> bool {
        self.favorites.contains(&day)
    }

    #[must_use]
    pub fn sorted_favorites(&self) -> Vec<u32> {
        let mut favorites = self.favorites.clone();
        favorites.sort_unstable();
        favorites
    }
}

/// Everything a presentation layer needs to render the home view.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressStatus {
    pub today: NaiveDate,
    pub is_sunday: bool,
    pub days_until_sunday: u32,
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
    pub completed: bool,
}

/// One day of program content, decorated with its week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reflection {
    pub day: u32,
    pub week: u32,
    pub title: String,
    pub quote: String,
    pub reflection: String,
    /// Not present in the line-based content; always empty.
    pub practice: String,
    /// Not present in the line-based content; always empty.
    pub affirmation: String,
    pub lines: Vec<String>,
}

impl Reflection {
    /// Build a reflection from raw lines: first line is the title, second the
    /// quote, the rest the body separated by blank lines.
    #[must_use]
    pub fn from_lines(day: u32, lines: Vec<String>) -> Self {
        let title = lines
            .first()
            .cloned()
            .unwrap_or_else(|| format!("Dia {day}"));
        let quote = lines.get(1).cloned().unwrap_or_default();
        let reflection = lines
            .get(2..)
            .map(|body| body.join("\n\n"))
            .unwrap_or_default();
        Self {
            day,
            week: week_of(day),
            title,
            quote,
            reflection,
            practice: String::new(),
            affirmation: String::new(),
            lines,
        }
    }
}

/// A fixed prayer text shown alongside the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prayer {
    pub title: String,
    pub content: String,
}

impl Prayer {
    /// Paragraphs of `content`, split on blank lines.
    ///
    /// A literal `/n` counts as a line break. Lines inside a paragraph are
    /// kept.
    #[must_use]
    pub fn paragraphs(&self) -> Vec<String> {
        let normalized = self.content.replace("\r\n", "\n").replace("/n", "\n");
        let mut paragraphs = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in normalized.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    paragraphs.push(current.join("\n"));
                    current.clear();
                }
            } else {
                current.push(line.trim());
            }
        }
        if !current.is_empty() {
            paragraphs.push(current.join("\n"));
        }
        paragraphs
    }
}
