//! Test helper modules for ltrp-broadcast integration tests
//!
//! - fixtures: temporary root folder with parameters, error codes and sounds
//! - audio_generator: deterministic WAV files for decoder tests

#![allow(dead_code)]

pub mod audio_generator;
pub mod fixtures;

pub use audio_generator::{generate_mono_sine_wav, generate_sine_wav};
pub use fixtures::{drain_events, ConfigFixture, TestNode, DRIVE_CONTROL, NODE_CODE};
