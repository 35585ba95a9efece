//! # LTRP Broadcast Node Library (ltrp-broadcast)
//!
//! Notification broadcaster for the robot: maps event codes to audio clips
//! and plays them, one at a time, while reporting node health and taking part
//! in the coordinated shutdown sequence.
//!
//! **Architecture:**
//! - `state`: the lock-protected playback flags shared by every actor
//! - `dispatcher`: accept / drop / cancel decisions for incoming events
//! - `playback`: the single playback worker thread
//! - `supervisor`: liveness loop and ordered shutdown
//! - `audio`: symphonia + rubato + cpal device backend
//! - `api`: HTTP/SSE adapter standing in for the message bus

pub mod api;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod node;
pub mod playback;
pub mod state;
pub mod supervisor;

pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use error::{Error, Result};
pub use node::{BroadcastNode, StartupFailure};
pub use state::SharedPlaybackState;
