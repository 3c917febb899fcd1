//! The storage port for the progress record and its persisted layout.
//!
//! The record lives in one named slot. The payload is a versioned JSON
//! document; anything that does not decode cleanly is treated as absent.

use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{ProgressRecord, TOTAL_DAYS};

/// Name of the slot holding the progress record.
pub const PROGRESS_SLOT: &str = "spiritual-program-progress";

/// Current schema version of the persisted record.
pub const SCHEMA_VERSION: u32 = 1;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Get/set/delete on a single named slot.
///
/// Implemented by [`crate::db::Database`] for durable storage and by
/// [`MemoryStore`] for tests.
pub trait ProgressStore {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, payload: &str) -> Result<()>;
    /// Returns whether a payload was present.
    fn remove(&self) -> Result<bool>;
}

impl<S: ProgressStore + ?Sized> ProgressStore for &S {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn save(&self, payload: &str) -> Result<()> {
        (**self).save(payload)
    }

    fn remove(&self) -> Result<bool> {
        (**self).remove()
    }
}

/// In-memory slot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with a raw payload, e.g. a legacy or corrupted one.
    #[must_use]
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(payload.into())),
        }
    }

    /// Raw payload currently in the slot.
    #[must_use]
    pub fn payload(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.payload())
    }

    fn save(&self, payload: &str) -> Result<()> {
        *self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(payload.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<bool> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .is_some())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProgress {
    #[serde(default = "legacy_version")]
    version: u32,
    start_date: String,
    #[serde(default)]
    current_day: Option<i64>,
    last_access_date: String,
    #[serde(default)]
    favorites: Vec<i64>,
}

fn legacy_version() -> u32 {
    SCHEMA_VERSION
}

/// Serialize a record into the persisted layout.
pub fn encode_record(record: &ProgressRecord) -> Result<String> {
    let stored = StoredProgress {
        version: SCHEMA_VERSION,
        start_date: record
            .start_date
            .and_time(chrono::NaiveTime::MIN)
            .format(DATETIME_FORMAT)
            .to_string(),
        current_day: Some(i64::from(record.current_day)),
        last_access_date: record.last_access_date.format(DATETIME_FORMAT).to_string(),
        favorites: record.favorites.iter().copied().map(i64::from).collect(),
    };
    serde_json::to_string(&stored).context("failed to serialize progress record")
}

/// Parse a persisted payload.
///
/// `current_day` is taken from storage as-is; callers recompute it.
/// Favorites outside the program range and duplicates are dropped.
pub fn decode_record(payload: &str) -> Result<ProgressRecord> {
    let stored: StoredProgress =
        serde_json::from_str(payload).context("progress payload is not a valid record")?;

    if stored.version != SCHEMA_VERSION {
        bail!("unsupported progress schema version {}", stored.version);
    }

    let start_date = parse_timestamp(&stored.start_date)
        .with_context(|| format!("invalid startDate '{}'", stored.start_date))?
        .date();
    let last_access_date = parse_timestamp(&stored.last_access_date)
        .with_context(|| format!("invalid lastAccessDate '{}'", stored.last_access_date))?;

    let mut favorites: Vec<u32> = Vec::with_capacity(stored.favorites.len());
    for day in stored.favorites {
        match u32::try_from(day) {
            Ok(d) if (1..=TOTAL_DAYS).contains(&d) && !favorites.contains(&d) => {
                favorites.push(d);
            }
            _ => tracing::debug!(day, "dropping invalid stored favorite"),
        }
    }

    let current_day = stored
        .current_day
        .and_then(|d| u32::try_from(d).ok())
        .unwrap_or(1)
        .max(1);

    Ok(ProgressRecord {
        start_date,
        current_day,
        last_access_date,
        favorites,
    })
}

/// Accepts naive local date-times, RFC 3339 with an offset (converted to
/// local time), and bare dates.
fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Local).naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")?;
    Ok(date.and_time(chrono::NaiveTime::MIN))
}
