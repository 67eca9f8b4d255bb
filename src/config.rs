//! # Configuration Module
//!
//! Locates setlist's data files and carries the settings a front end needs to
//! open a catalog session.
//!
//! ## Data Storage
//!
//! The catalog database and the preference file live in the platform-standard
//! data directory:
//! - Linux: `~/.local/share/setlist/`
//! - macOS: `~/Library/Application Support/setlist/`
//! - Windows: `%APPDATA%\setlist\`
//!
//! Both paths can be overridden per invocation (see [`RuntimeConfig`]).

use crate::recommend::RecommendConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "setlist";
const DB_FILE: &str = "catalog.db";
const PREFERENCES_FILE: &str = "preferences.json";

/// User id used when none is configured.
pub const DEFAULT_USER: &str = "default";

/// Creates `<base>/setlist` if needed and returns it.
fn app_dir_in(base: &Path) -> Result<PathBuf> {
    let dir = base.join(APP_DIR);
    fs::create_dir_all(&dir).with_context(|| {
        format!(
            "Failed to create setlist data directory at {}. Please check file permissions.",
            dir.display()
        )
    })?;
    Ok(dir)
}

/// Returns the platform-appropriate setlist data directory, creating it on
/// first use.
///
/// # Errors
///
/// Fails if the platform has no standard data directory or the `setlist`
/// subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. \
             Use --db and --prefs to choose file locations."
        )
    })?;
    app_dir_in(&data_dir)
}

/// Returns the path of the SQLite catalog, `catalog.db` inside
/// [`get_data_dir`].
///
/// ```no_run
/// use setlist::config::get_db_path;
///
/// let db_path = get_db_path()?;
/// println!("Catalog location: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Returns the path of the listening-preference file, `preferences.json`
/// inside [`get_data_dir`].
pub fn get_preferences_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(PREFERENCES_FILE))
}

/// Everything a session needs: where the data lives, whose preferences to
/// use, and recommendation tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub db_path: PathBuf,
    pub preferences_path: PathBuf,
    pub user: String,
    #[serde(default)]
    pub recommend: RecommendConfig,
}

impl RuntimeConfig {
    /// Resolves command-line overrides against the platform defaults. The
    /// data directory is only consulted for paths that were not given.
    pub fn resolve(
        db_path: Option<PathBuf>,
        preferences_path: Option<PathBuf>,
        user: Option<String>,
    ) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => get_db_path()?,
        };
        let preferences_path = match preferences_path {
            Some(path) => path,
            None => get_preferences_path()?,
        };
        let user = user
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_USER.to_string());

        Ok(Self { db_path, preferences_path, user, recommend: RecommendConfig::default() })
    }
}
