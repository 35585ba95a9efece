//! Headless audio sink
//!
//! Stands in for the output device on machines without one (and in tests):
//! every clip "plays" for a fixed duration. Files can be marked as failing to
//! exercise the playback-fatal path.

use crate::audio::AudioSink;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default)]
struct History {
    started: Vec<PathBuf>,
    completed: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct SimulatedSink {
    clip_duration: Duration,
    failing: Mutex<HashSet<PathBuf>>,
    history: Mutex<History>,
}

impl SimulatedSink {
    pub fn new(clip_duration: Duration) -> Self {
        Self {
            clip_duration,
            failing: Mutex::new(HashSet::new()),
            history: Mutex::new(History::default()),
        }
    }

    /// Make every later play of `path` fail after the clip duration
    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into());
    }

    fn history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clips whose playback began, in order
    pub fn started(&self) -> Vec<PathBuf> {
        self.history().started.clone()
    }

    /// Clips played to the end without error, in order
    pub fn completed(&self) -> Vec<PathBuf> {
        self.history().completed.clone()
    }

    pub fn completed_count(&self, path: &Path) -> usize {
        self.history().completed.iter().filter(|p| *p == path).count()
    }
}

impl AudioSink for SimulatedSink {
    fn play(&self, path: &Path) -> Result<()> {
        debug!("Simulating {} for {:?}", path.display(), self.clip_duration);
        self.history().started.push(path.to_path_buf());

        std::thread::sleep(self.clip_duration);

        let fails = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path);
        if fails {
            return Err(Error::AudioOutput(format!(
                "Simulated device failure on {}",
                path.display()
            )));
        }

        self.history().completed.push(path.to_path_buf());
        Ok(())
    }
}
