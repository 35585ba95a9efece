//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LTRP_ROOT_FOLDER";

/// Optional machine-local TOML configuration
///
/// Looked up at `~/.config/ltrp/config.toml`, then `/etc/ltrp/config.toml`.
/// Every field is optional; a missing file is not an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding `config/` (parameters, error codes, sound files)
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging section of the TOML configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
    }

    /// Load the platform config file if one exists
    ///
    /// A malformed file is logged and ignored so the node still starts with
    /// command-line and compiled defaults.
    pub fn load_default() -> Option<Self> {
        let path = config_file_path()?;
        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Root folder resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: Option<&TomlConfig>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(root_folder) = toml_config.and_then(|c| c.root_folder.as_ref()) {
        return root_folder.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Location of the platform config file, if one exists
pub fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("ltrp").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/ltrp/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/ltrp (or /var/lib/ltrp for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("ltrp"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/ltrp"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("ltrp"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/ltrp"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("ltrp"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\ltrp"))
    } else {
        PathBuf::from("./ltrp_data")
    }
}

/// Well-known file locations below a node's root folder
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    root_folder: PathBuf,
}

impl ConfigPaths {
    pub fn new(root_folder: impl Into<PathBuf>) -> Self {
        Self {
            root_folder: root_folder.into(),
        }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root_folder.join("config")
    }

    pub fn parameters(&self) -> PathBuf {
        self.config_dir().join("parameters.json")
    }

    pub fn error_code_list(&self) -> PathBuf {
        self.config_dir().join("error_code_list.json")
    }

    /// Default directory for generated sound assets
    pub fn sound_dir(&self) -> PathBuf {
        self.config_dir().join("sound_files")
    }
}
