//! Playback worker
//!
//! The only code path that touches the audio device.

pub mod worker;

pub use worker::PlaybackWorker;
