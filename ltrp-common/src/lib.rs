//! # LTRP Common Library
//!
//! Shared code for LTRP robot nodes including:
//! - Error type
//! - Root folder resolution and TOML configuration
//! - Typed `parameters.json` document and error code list
//! - Node readiness, outbound report and inbound message types
//! - EventBus for outbound reports

pub mod config;
pub mod error;
pub mod error_codes;
pub mod events;
pub mod params;

pub use error::{Error, Result};
pub use error_codes::ErrorCodeList;
pub use params::Parameters;
