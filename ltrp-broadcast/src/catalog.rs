//! Sound catalog: event code -> audio asset
//!
//! Built once at startup from `BROADCAST_SOUND_LIST` and read-only afterwards.

use crate::error::{Error, Result};
use ltrp_common::params::SoundList;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ALARM_SOUND: &str = "ALARM_SOUND";
pub const TEST_SOUND: &str = "TEST_SOUND";
pub const SHUT_DOWN_MSG: &str = "SHUT_DOWN_MSG";
pub const CANCEL_BROADCASTING: &str = "CANCEL_BROADCASTING";
/// Spelling used by older parameter documents
pub const CANCEL_BROADCASTING_LEGACY: &str = "CANCLE_BROADCASTING";

/// Sounds that loop until cancelled when `REPEAT` is not configured
const DEFAULT_REPEATING: [&str; 2] = [ALARM_SOUND, TEST_SOUND];

/// One playable sound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub code: u8,
    pub path: PathBuf,
    /// Replay after each completion until cancelled
    pub repeat: bool,
}

#[derive(Debug, Clone)]
pub struct SoundCatalog {
    entries: HashMap<u8, CatalogEntry>,
    test_sound: u8,
    shutdown_jingle: u8,
    cancel_code: u8,
}

impl SoundCatalog {
    /// Build the catalog from the sound list section
    ///
    /// Fails if the test sound, the shutdown jingle or the cancel code is not
    /// configured, or if the test sound / jingle have no file. Missing files on
    /// disk are only warned about here.
    pub fn from_sound_list(list: &SoundList, sound_dir: &Path) -> Result<Self> {
        let repeating: Vec<&str> = match &list.repeat {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => DEFAULT_REPEATING.to_vec(),
        };

        let mut entries = HashMap::new();
        for (name, &code) in &list.codes {
            let Some(file_name) = list.file_name(code) else {
                debug!("Sound {} ({}) has no file, not playable", name, code);
                continue;
            };

            let path = sound_dir.join(file_name);
            if !path.exists() {
                warn!("Sound file for {} ({}) missing: {}", name, code, path.display());
            }

            entries.insert(
                code,
                CatalogEntry {
                    code,
                    path,
                    repeat: repeating.contains(&name.as_str()),
                },
            );
        }

        let required = |name: &str| {
            list.code(name)
                .ok_or_else(|| Error::Catalog(format!("{} is not configured", name)))
        };

        let test_sound = required(TEST_SOUND)?;
        let shutdown_jingle = required(SHUT_DOWN_MSG)?;
        let cancel_code = list
            .code(CANCEL_BROADCASTING)
            .or_else(|| list.code(CANCEL_BROADCASTING_LEGACY))
            .ok_or_else(|| Error::Catalog(format!("{} is not configured", CANCEL_BROADCASTING)))?;

        for (name, code) in [(TEST_SOUND, test_sound), (SHUT_DOWN_MSG, shutdown_jingle)] {
            if !entries.contains_key(&code) {
                return Err(Error::Catalog(format!("{} ({}) has no sound file", name, code)));
            }
            if code == cancel_code {
                return Err(Error::Catalog(format!(
                    "{} shares code {} with {}",
                    name, code, CANCEL_BROADCASTING
                )));
            }
        }

        // The cancel code is a command, never a sound
        entries.remove(&cancel_code);

        Ok(Self {
            entries,
            test_sound,
            shutdown_jingle,
            cancel_code,
        })
    }

    /// Look up a playable sound
    pub fn resolve(&self, code: u8) -> Option<&CatalogEntry> {
        self.entries.get(&code)
    }

    pub fn is_cancel(&self, code: u8) -> bool {
        code == self.cancel_code
    }

    pub fn test_sound(&self) -> &CatalogEntry {
        // Presence checked at construction
        &self.entries[&self.test_sound]
    }

    pub fn shutdown_jingle(&self) -> &CatalogEntry {
        &self.entries[&self.shutdown_jingle]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
