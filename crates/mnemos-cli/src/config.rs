//! CLI settings – reads/writes `~/.mnemos/config.toml`.
//!
//! ```toml
//! top_k = 3
//!
//! [memory]
//! path = "memory.json"
//! strategy = "hashed"        # or "counting"
//! hash_dimensions = 512
//! normalize_counts = false
//! backend = "auto"           # "brute_force" | "flat_inner_product"
//! ```

use mnemos_memory::DEFAULT_TOP_K;
use mnemos_types::{EmbeddingStrategy, IndexBackend, MemoryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user configuration stored in `~/.mnemos/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of hits `/query` asks for.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Construction parameters handed to the memory manager.
    #[serde(default)]
    pub memory: MemoryConfig,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for Config {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            memory: MemoryConfig::default(),
        }
    }
}

/// Return the path to `~/.mnemos/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".mnemos").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Load the config, falling back to defaults (plus env overrides) when the
/// file is missing or unreadable.  The error, if any, is returned alongside.
pub fn load_or_default() -> (Config, Option<String>) {
    match load() {
        Ok(Some(cfg)) => (cfg, None),
        Ok(None) => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            (cfg, None)
        }
        Err(e) => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            (cfg, Some(e))
        }
    }
}

/// Apply `MNEMOS_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `MNEMOS_MEMORY_PATH` | `memory.path` |
/// | `MNEMOS_STRATEGY` | `memory.strategy` |
/// | `MNEMOS_HASH_DIMENSIONS` | `memory.hash_dimensions` |
/// | `MNEMOS_BACKEND` | `memory.backend` |
/// | `MNEMOS_TOP_K` | `top_k` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("MNEMOS_MEMORY_PATH")
        && !v.trim().is_empty()
    {
        cfg.memory.path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("MNEMOS_STRATEGY")
        && let Ok(strategy) = v.parse::<EmbeddingStrategy>()
    {
        cfg.memory.strategy = strategy;
    }
    if let Ok(v) = std::env::var("MNEMOS_HASH_DIMENSIONS")
        && let Ok(dims) = v.parse::<usize>()
        && dims > 0
    {
        cfg.memory.hash_dimensions = dims;
    }
    if let Ok(v) = std::env::var("MNEMOS_BACKEND")
        && let Ok(backend) = v.parse::<IndexBackend>()
    {
        cfg.memory.backend = backend;
    }
    if let Ok(v) = std::env::var("MNEMOS_TOP_K")
        && let Ok(k) = v.parse::<usize>()
    {
        cfg.top_k = k;
    }
}

/// Save the config to disk, creating `~/.mnemos/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
