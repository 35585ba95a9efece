//! Typed view of the shared `parameters.json` document
//!
//! Every node of the robot reads the same document. Sections wrap their
//! payload in a `VALUE` object:
//!
//! ```json
//! {
//!   "NODE_CODE": { "VALUE": { "BROADCAST": 7, "DRIVE_CONTROL": 3 } },
//!   "DEFAULT_VALUES": { "COMMON": { "VALUE": { "SYSTEM_SHUTDOWN_CODE": 255 } } },
//!   "BROADCAST": { "VALUE": { "TICK_RATE_HZ": 20 } }
//! }
//! ```

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Section payload wrapper (`{ "VALUE": ... }`)
#[derive(Debug, Clone, Deserialize)]
pub struct Valued<T> {
    #[serde(rename = "VALUE")]
    pub value: T,
}

/// Defaults shared by every node
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CommonDefaults {
    pub default_err_code: u8,
    pub node_state_error: u8,
    pub node_state_offline: u8,
    pub node_state_online: u8,
    pub system_shutdown_code: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultValues {
    #[serde(rename = "COMMON")]
    pub common: Valued<CommonDefaults>,
}

/// `BROADCAST_SOUND_LIST` section
#[derive(Debug, Clone, Deserialize)]
pub struct SoundList {
    /// Symbolic sound name -> event code
    #[serde(rename = "VALUE")]
    pub codes: HashMap<String, u8>,

    /// Event code (as string) -> file name below the sound directory
    #[serde(rename = "FILE_NAME")]
    pub file_names: HashMap<String, String>,

    /// Names of sounds that loop until cancelled
    #[serde(rename = "REPEAT", default)]
    pub repeat: Option<Vec<String>>,
}

impl SoundList {
    pub fn code(&self, name: &str) -> Option<u8> {
        self.codes.get(name).copied()
    }

    pub fn file_name(&self, code: u8) -> Option<&str> {
        self.file_names.get(&code.to_string()).map(String::as_str)
    }
}

/// The whole parameters document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Parameters {
    pub node_code: Valued<HashMap<String, u8>>,
    pub default_values: DefaultValues,
    pub remote_control_command: Valued<HashMap<String, u8>>,
    pub broadcast_sound_list: SoundList,

    /// Per-node sections (`"BROADCAST": { "VALUE": {...} }`, ...)
    #[serde(flatten)]
    pub node_sections: HashMap<String, serde_json::Value>,
}

impl Parameters {
    /// Read and parse a parameters document
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn common(&self) -> &CommonDefaults {
        &self.default_values.common.value
    }

    /// Look up a node's identity code by name
    pub fn node_code(&self, name: &str) -> Result<u8> {
        self.node_code
            .value
            .get(name)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("NODE_CODE.{}", name)))
    }

    /// Look up a remote control command code by name
    pub fn remote_command(&self, name: &str) -> Result<u8> {
        self.remote_control_command
            .value
            .get(name)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("REMOTE_CONTROL_COMMAND.{}", name)))
    }

    /// Deserialize a node's own `VALUE` section
    ///
    /// A node without a section gets `T::default()`.
    pub fn node_section<T>(&self, node_name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.node_sections.get(node_name) {
            None => Ok(T::default()),
            Some(section) => {
                let valued: Valued<T> = serde_json::from_value(section.clone()).map_err(|e| {
                    Error::Config(format!("Invalid {} section: {}", node_name, e))
                })?;
                Ok(valued.value)
            }
        }
    }
}
