//! Read-only program content: reflections keyed by program day, and prayers.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::ContentError;
use crate::models::{
    Prayer, Reflection, TOTAL_DAYS, validate_content_day, validate_content_week, week_of,
};

/// Day number → ordered text lines, plus the prayer list.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    days: BTreeMap<u32, Vec<String>>,
    prayers: Vec<Prayer>,
}

impl ContentStore {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON object of the form `{ "1": ["title", "quote", ...], ... }`.
    ///
    /// Keys that are not day numbers within the program are skipped.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<String>> =
            serde_json::from_str(json).context("reflection content must map day numbers to lines")?;

        let mut days = BTreeMap::new();
        for (key, lines) in raw {
            match key.trim().parse::<u32>() {
                Ok(day) if (1..=TOTAL_DAYS).contains(&day) => {
                    days.insert(day, lines);
                }
                _ => tracing::warn!(key = %key, "skipping reflection with invalid day key"),
            }
        }
        Ok(Self {
            days,
            prayers: Vec::new(),
        })
    }

    /// Load content from a file. A missing file gives an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "reflection content not found, serving no content");
            return Ok(Self::empty());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reflections: {}", path.display()))?;
        let store = Self::from_json_str(&json)
            .with_context(|| format!("Failed to parse reflections: {}", path.display()))?;
        tracing::debug!(days = store.len(), path = %path.display(), "loaded reflections");
        Ok(store)
    }

    /// Attach prayers from a JSON array of `{ "title": ..., "content": ... }`.
    pub fn with_prayers_json(mut self, json: &str) -> Result<Self> {
        self.prayers = serde_json::from_str(json)
            .context("prayers must be a list of objects with a title and content")?;
        Ok(self)
    }

    /// Attach prayers from a file. A missing file leaves the list empty.
    pub fn load_prayers(self, path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no prayers file");
            return Ok(self);
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prayers: {}", path.display()))?;
        let store = self
            .with_prayers_json(&json)
            .with_context(|| format!("Failed to parse prayers: {}", path.display()))?;
        tracing::debug!(prayers = store.prayers.len(), "loaded prayers");
        Ok(store)
    }

    /// Prayers in file order.
    #[must_use]
    pub fn prayers(&self) -> &[Prayer] {
        &self.prayers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn reflection(&self, day: i64) -> Result<Reflection, ContentError> {
        let day = validate_content_day(day)?;
        self.days
            .get(&day)
            .map(|lines| Reflection::from_lines(day, lines.clone()))
            .ok_or(ContentError::NotFound(day))
    }

    /// All reflections of a week, ascending by day.
    pub fn week(&self, week: i64) -> Result<Vec<Reflection>, ContentError> {
        let week = validate_content_week(week)?;
        Ok(self
            .days
            .iter()
            .filter(|(day, _)| week_of(**day) == week)
            .map(|(day, lines)| Reflection::from_lines(*day, lines.clone()))
            .collect())
    }

    #[must_use]
    pub fn all(&self) -> Vec<Reflection> {
        self.days
            .iter()
            .map(|(day, lines)| Reflection::from_lines(*day, lines.clone()))
            .collect()
    }
}
