use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use vigil_core::ManualDayAnchor;
use vigil_core::ProgressTracker;
use vigil_core::content::ContentStore;
use vigil_core::db::Database;

/// Overrides the platform data directory (useful for tests and portable installs).
const DATA_DIR_ENV: &str = "VIGIL_DATA_DIR";

/// Optional settings read from `config.toml` in the platform config directory.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    content_path: Option<PathBuf>,
    prayers_path: Option<PathBuf>,
    manual_day_anchor: ManualDayAnchor,
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config file: {}", path.display()))
    }
}

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub content_path: PathBuf,
    pub prayers_path: PathBuf,
    pub manual_day_anchor: ManualDayAnchor,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "vigil").context("Could not determine home directory")?;

        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => proj_dirs.data_dir().to_path_buf(),
        };
        let file = FileConfig::read(&proj_dirs.config_dir().join("config.toml"))?;

        Self::from_parts(data_dir, file)
    }

    fn from_parts(data_dir: PathBuf, file: FileConfig) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("vigil.db");
        let content_path = file
            .content_path
            .unwrap_or_else(|| data_dir.join("reflections.json"));
        let prayers_path = file
            .prayers_path
            .unwrap_or_else(|| data_dir.join("prayers.json"));

        Ok(Config {
            db_path,
            data_dir,
            content_path,
            prayers_path,
            manual_day_anchor: file.manual_day_anchor,
        })
    }

    pub fn open_tracker(&self) -> Result<ProgressTracker<Database>> {
        let db = Database::open(&self.db_path)?;
        Ok(ProgressTracker::new(db).with_manual_day_anchor(self.manual_day_anchor))
    }

    /// Load reflections from `path_override`, or the configured content path,
    /// together with the configured prayers.
    pub fn load_content(&self, path_override: Option<&Path>) -> Result<ContentStore> {
        ContentStore::load(path_override.unwrap_or(&self.content_path))?
            .load_prayers(&self.prayers_path)
    }
}
