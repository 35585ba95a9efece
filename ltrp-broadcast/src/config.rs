//! ltrp-broadcast specific configuration
//!
//! Built from the shared `parameters.json` document: node identity, shutdown
//! code, readiness wire values, remote control commands and the node's own
//! `BROADCAST` section.

use crate::error::{Error, Result};
use ltrp_common::events::ReadinessCodes;
use ltrp_common::Parameters;
use serde::Deserialize;
use std::time::Duration;

/// Name of this node in `NODE_CODE` and of its parameter section
pub const NODE_NAME: &str = "BROADCAST";

/// Origin accepted for broadcast requests when none are configured
pub const DEFAULT_ORIGIN: &str = "DRIVE_CONTROL";

pub const REMOTE_PLAY_TEST_SOUND: &str = "REMOTE_PLAY_TEST_SOUND";
pub const REMOTE_STOP_PLAYING_SOUND: &str = "REMOTE_STOP_PLAYING_SOUND";

const DEFAULT_TICK_RATE_HZ: u32 = 20;
const DEFAULT_SHUTDOWN_POLL_MS: u64 = 50;
const DEFAULT_VITAL_INTERVAL_MS: u64 = 1000;

/// Optional tunables in `BROADCAST.VALUE`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct BroadcastSection {
    tick_rate_hz: Option<u32>,
    shutdown_poll_ms: Option<u64>,
    vital_interval_ms: Option<u64>,
    accepted_origins: Option<Vec<String>>,
}

/// Supervisor loop cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTiming {
    /// Liveness loop period
    pub tick: Duration,
    /// Upper bound between off-air re-checks during shutdown
    pub shutdown_poll: Duration,
    /// Period of vital reports
    pub vital_interval: Duration,
}

impl Default for SupervisorTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1) / DEFAULT_TICK_RATE_HZ,
            shutdown_poll: Duration::from_millis(DEFAULT_SHUTDOWN_POLL_MS),
            vital_interval: Duration::from_millis(DEFAULT_VITAL_INTERVAL_MS),
        }
    }
}

/// Remote control command codes this node reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteCommands {
    pub play_test_sound: u8,
    pub stop_playing_sound: u8,
}

/// Broadcast node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// This node's identity code
    pub node_code: u8,
    /// Shutdown code addressed to every node
    pub system_shutdown_code: u8,
    /// Error code reported while healthy
    pub default_err_code: u8,
    pub readiness_codes: ReadinessCodes,
    /// Node codes allowed to request broadcasts (empty = any)
    pub accepted_origins: Vec<u8>,
    pub remote: RemoteCommands,
    pub timing: SupervisorTiming,
}

impl NodeConfig {
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let common = params.common();
        let section: BroadcastSection = params.node_section(NODE_NAME)?;

        let origin_names = section
            .accepted_origins
            .unwrap_or_else(|| vec![DEFAULT_ORIGIN.to_string()]);
        let accepted_origins = origin_names
            .iter()
            .map(|name| params.node_code(name))
            .collect::<ltrp_common::Result<Vec<u8>>>()?;

        let tick_rate_hz = section.tick_rate_hz.unwrap_or(DEFAULT_TICK_RATE_HZ);
        if tick_rate_hz == 0 {
            return Err(Error::Config("TICK_RATE_HZ must be positive".to_string()));
        }

        let timing = SupervisorTiming {
            tick: Duration::from_secs(1) / tick_rate_hz,
            shutdown_poll: Duration::from_millis(
                section.shutdown_poll_ms.unwrap_or(DEFAULT_SHUTDOWN_POLL_MS).max(1),
            ),
            vital_interval: Duration::from_millis(
                section.vital_interval_ms.unwrap_or(DEFAULT_VITAL_INTERVAL_MS),
            ),
        };

        Ok(Self {
            node_code: params.node_code(NODE_NAME)?,
            system_shutdown_code: common.system_shutdown_code,
            default_err_code: common.default_err_code,
            readiness_codes: ReadinessCodes::from(common),
            accepted_origins,
            remote: RemoteCommands {
                play_test_sound: params.remote_command(REMOTE_PLAY_TEST_SOUND)?,
                stop_playing_sound: params.remote_command(REMOTE_STOP_PLAYING_SOUND)?,
            },
            timing,
        })
    }

    /// Whether a broadcast from `origin_node` should be considered
    pub fn accepts_origin(&self, origin_node: u8) -> bool {
        self.accepted_origins.is_empty() || self.accepted_origins.contains(&origin_node)
    }

    /// Whether a shutdown code addresses this node
    pub fn is_shutdown_for_me(&self, code: u8) -> bool {
        code == self.system_shutdown_code || code == self.node_code
    }
}
