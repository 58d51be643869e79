//! Configuration for vocalog.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VOCALOG_HOME, VOCALOG_BACKEND, ...)
//! 2. Config file (.vocalog/config.yaml)
//! 3. Defaults (~/.vocalog, local backend)
//!
//! Config file discovery:
//! - Searches current directory and parents for .vocalog/config.yaml
//! - Paths in the config file are relative to the config file's directory
//!
//! The analysis API key is taken from the environment only, never from the
//! config file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<std::result::Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub analysis: Option<AnalysisConfig>,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to the config file)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: Option<BackendKind>,
    pub base_url: Option<String>,
    pub user_id: Option<String>,
}

/// Which store backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Local,
    Remote,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to vocalog home (journal state)
    pub home: PathBuf,

    /// Analysis service settings
    pub analysis: AnalysisSettings,

    /// Storage backend settings
    pub storage: StorageSettings,

    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: BackendKind,
    pub remote_base_url: Option<String>,
    pub user_id: String,
    /// Auth token for the remote backend, env-only (VOCALOG_STORE_KEY)
    pub api_key: String,
}

fn default_analysis_url() -> String {
    "http://localhost:8787".to_string()
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".vocalog").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".vocalog");

    let config_file = find_config_file();
    let file = match config_file.as_ref() {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };

    // Home: env > file > default
    let home = if let Ok(env_home) = std::env::var("VOCALOG_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home_str) = file.as_ref().and_then(|f| f.paths.home.as_ref()) {
        let base = config_file
            .as_ref()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));
        resolve_path(base, home_str)
    } else {
        default_home
    };

    // Analysis endpoint: env > file > default; the key is env-only
    let analysis = AnalysisSettings {
        base_url: std::env::var("VOCALOG_ANALYSIS_URL").ok().unwrap_or_else(|| {
            file.as_ref()
                .and_then(|f| f.analysis.as_ref())
                .and_then(|a| a.base_url.clone())
                .unwrap_or_else(default_analysis_url)
        }),
        api_key: std::env::var("VOCALOG_ANALYSIS_KEY").unwrap_or_default(),
    };

    // Storage backend: env > file > local default
    let file_storage = file.as_ref().and_then(|f| f.storage.clone());
    let backend = match std::env::var("VOCALOG_BACKEND").ok().as_deref() {
        Some("remote") => BackendKind::Remote,
        Some("local") => BackendKind::Local,
        Some(other) => anyhow::bail!("Unknown VOCALOG_BACKEND value: {other}"),
        None => file_storage
            .as_ref()
            .and_then(|s| s.backend)
            .unwrap_or(BackendKind::Local),
    };

    let storage = StorageSettings {
        backend,
        remote_base_url: std::env::var("VOCALOG_REMOTE_URL")
            .ok()
            .or_else(|| file_storage.as_ref().and_then(|s| s.base_url.clone())),
        user_id: std::env::var("VOCALOG_USER").ok().unwrap_or_else(|| {
            file_storage
                .as_ref()
                .and_then(|s| s.user_id.clone())
                .unwrap_or_else(|| "default".to_string())
        }),
        api_key: std::env::var("VOCALOG_STORE_KEY").unwrap_or_default(),
    };

    Ok(ResolvedConfig {
        home,
        analysis,
        storage,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Get the vocalog home directory (journal state).
pub fn vocalog_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

/// Get the on-device journal blob path ($VOCALOG_HOME/journal.json)
pub fn journal_path() -> Result<PathBuf> {
    Ok(config()?.home.join("journal.json"))
}
