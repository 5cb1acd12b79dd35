//! Command line configuration
//!
//! Read from a TOML file, then `SUPABASE_URL` and `SUPABASE_ANON_KEY`
//! from the environment override the file's endpoint settings.

use anyhow::{Context, Result};
use reframe_backend::PreprocessConfig;
use reframe_core::WorkflowConfig;
use reframe_supabase::SupabaseConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "reframe";
const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) supabase: SupabaseConfig,
    pub(crate) workflow: WorkflowConfig,
    pub(crate) preprocess: PreprocessConfig,
    /// Where the signed-in session is kept between runs
    pub(crate) session_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load `path`, or the per-user config file if it exists
    ///
    /// An explicitly named file must exist; the default one is optional.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_dir().map(|dir| dir.join(CONFIG_FILE)) {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub(crate) fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SUPABASE_URL").filter(|v| !v.is_empty()) {
            self.supabase.url = url;
        }
        if let Some(key) = lookup("SUPABASE_ANON_KEY").filter(|v| !v.is_empty()) {
            self.supabase.anon_key = key;
        }
    }

    /// Session file location; `None` keeps the session in memory only
    pub(crate) fn session_path(&self) -> Option<PathBuf> {
        self.session_file
            .clone()
            .or_else(|| default_dir().map(|dir| dir.join(SESSION_FILE)))
    }
}

fn default_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}
