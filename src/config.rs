use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HookError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source enumeration and extraction settings
    pub scan: ScanConfig,

    /// Hook cache settings
    pub cache: CacheConfig,

    /// Live mode bookkeeping settings
    pub live_mode: LiveModeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// File extensions treated as PHP source
    pub extensions: Vec<String>,

    /// Dependency-manager directories skipped as whole path segments
    pub dependency_dirs: Vec<String>,

    /// Test directories skipped as whole path segments
    pub test_dirs: Vec<String>,

    /// Whether shortcodes are reported alongside actions and filters
    pub include_shortcodes: bool,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether scan results are cached per folder
    pub enabled: bool,

    /// Directory holding one JSON file per scanned folder
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveModeConfig {
    /// Directory holding live mode markers and logs
    pub dir: PathBuf,

    /// How long a marked hook stays observed
    pub window_minutes: i64,

    /// Number of log entries returned per request
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig {
                extensions: vec!["php".to_string()],
                dependency_dirs: vec!["vendor".to_string(), "node_modules".to_string()],
                test_dirs: vec!["test".to_string(), "tests".to_string()],
                include_shortcodes: true,
                max_file_size: 2 * 1024 * 1024, // 2MB
            },
            cache: CacheConfig {
                enabled: true,
                dir: PathBuf::from(".captain-hooks/cache"),
            },
            live_mode: LiveModeConfig {
                dir: PathBuf::from(".captain-hooks/live"),
                window_minutes: 10,
                page_size: 20,
            },
        }
    }
}

/// File names tried in the working directory when no config path is given
const CONFIG_CANDIDATES: [&str; 3] = [
    "CaptainHooks.toml",
    "captain-hooks.toml",
    ".captain-hooks.toml",
];

impl Config {
    /// Load configuration from a TOML file; parse errors name the file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| HookError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HookError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// An explicit path that does not exist yields the defaults, as does
    /// finding none of the candidate files
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        if let Some(path) = path {
            let path = path.as_ref();
            return if path.exists() { Self::load(path) } else { Ok(Self::default()) };
        }

        // Try common config file locations
        match CONFIG_CANDIDATES.iter().map(Path::new).find(|p| p.exists()) {
            Some(found) => Self::load(found),
            None => Ok(Self::default()),
        }
    }
}
