//! Shared error code list (`error_code_list.json`)
//!
//! The document mixes two kinds of keys in one object: symbolic names mapping
//! to numeric codes (`"ERR_PARAMETER_LOADING_FAILED": 3`) and numeric codes
//! mapping to human readable descriptions (`"3": "Parameter loading failed."`).

use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Code used when the error code list itself cannot be loaded
pub const ERR_CODE_LIST_LOADING_FAILED: u8 = 2;

#[derive(Debug, Clone, Default)]
pub struct ErrorCodeList {
    codes: HashMap<String, u8>,
    descriptions: HashMap<u8, String>,
}

impl ErrorCodeList {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let raw: HashMap<String, Value> = serde_json::from_str(content)?;
        let mut list = Self::default();

        for (key, value) in raw {
            match (key.parse::<u8>(), value) {
                (Ok(code), Value::String(description)) => {
                    list.descriptions.insert(code, description);
                }
                (Err(_), Value::Number(n)) => {
                    let code = n
                        .as_u64()
                        .and_then(|c| u8::try_from(c).ok())
                        .ok_or_else(|| {
                            Error::InvalidInput(format!("Error code {} out of range: {}", key, n))
                        })?;
                    list.codes.insert(key, code);
                }
                (_, other) => {
                    return Err(Error::InvalidInput(format!(
                        "Unexpected entry in error code list: {} = {}",
                        key, other
                    )));
                }
            }
        }

        Ok(list)
    }

    /// Numeric code for a symbolic name
    pub fn code(&self, name: &str) -> Option<u8> {
        self.codes.get(name).copied()
    }

    /// Human readable description for a numeric code
    pub fn describe(&self, code: u8) -> Option<&str> {
        self.descriptions.get(&code).map(String::as_str)
    }

    /// Description, falling back to a generic text for unlisted codes
    pub fn describe_or_unknown(&self, code: u8) -> String {
        self.describe(code)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unknown error code {}", code))
    }
}
