//! Audio backend
//!
//! The playback worker only sees the [`AudioSink`] trait: play one file to
//! completion, synchronously. Two implementations:
//! - [`DeviceSink`]: symphonia decode, rubato resample, cpal output
//! - [`SimulatedSink`]: headless stand-in that sleeps for a fixed clip length

pub mod decoder;
pub mod output;
pub mod resampler;
pub mod simulated;

pub use decoder::{DecodedClip, SimpleDecoder};
pub use output::DeviceSink;
pub use resampler::Resampler;
pub use simulated::SimulatedSink;

use crate::error::Result;
use std::path::Path;

/// Synchronous audio output used by the playback worker
///
/// `play` blocks until the whole clip has been rendered or an error occurs.
/// There is no way to interrupt a clip once started.
pub trait AudioSink: Send + Sync {
    fn play(&self, path: &Path) -> Result<()>;
}
