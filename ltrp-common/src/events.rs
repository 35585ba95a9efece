//! Node report and message types for the LTRP event system
//!
//! Provides the inbound message shapes, the outbound reports every node
//! publishes, and the EventBus used to fan reports out to transports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::params::CommonDefaults;

/// Node readiness as seen by the rest of the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Online,
    Offline,
    Error,
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Readiness::Online => write!(f, "online"),
            Readiness::Offline => write!(f, "offline"),
            Readiness::Error => write!(f, "error"),
        }
    }
}

/// Numeric wire values for each readiness state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessCodes {
    pub online: u8,
    pub offline: u8,
    pub error: u8,
}

impl ReadinessCodes {
    pub fn code(&self, readiness: Readiness) -> u8 {
        match readiness {
            Readiness::Online => self.online,
            Readiness::Offline => self.offline,
            Readiness::Error => self.error,
        }
    }
}

impl Default for ReadinessCodes {
    fn default() -> Self {
        Self {
            online: 1,
            offline: 0,
            error: 9,
        }
    }
}

impl From<&CommonDefaults> for ReadinessCodes {
    fn from(defaults: &CommonDefaults) -> Self {
        Self {
            online: defaults.node_state_online,
            offline: defaults.node_state_offline,
            error: defaults.node_state_error,
        }
    }
}

// ========================================
// Inbound messages
// ========================================

/// Broadcast request from an upstream controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Node code of the sender
    pub origin_node: u8,
    /// Sound or control code
    pub event_code: u8,
}

/// Remote control command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteControlMessage {
    pub command: u8,
}

/// Shutdown request, either system-wide or targeted at one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownMessage {
    pub code: u8,
}

// ========================================
// Outbound reports
// ========================================

/// Periodic liveness report ("vital")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Reporting node (None if identity could not be loaded)
    pub node_code: Option<u8>,
    pub readiness: Readiness,
    /// Wire value of `readiness`
    pub state: u8,
    pub error_code: u8,
}

/// Unrecoverable condition report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub node_code: Option<u8>,
    pub error_code: u8,
    pub description: String,
}

/// Readiness result consumed by the node manager
///
/// Emitted when a node enters Error and once when it terminates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespawnResult {
    pub timestamp: DateTime<Utc>,
    pub node_code: Option<u8>,
    pub readiness: Readiness,
    /// Wire value of `readiness`
    pub state: u8,
}

/// Outbound node events
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeEvent {
    Vital(HealthReport),
    Error(ErrorReport),
    RespawnResult(RespawnResult),
}

impl NodeEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            NodeEvent::Vital(_) => "Vital",
            NodeEvent::Error(_) => "Error",
            NodeEvent::RespawnResult(_) => "RespawnResult",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central distribution bus for outbound node events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish from plain threads (no runtime required)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use ltrp_common::events::{EventBus, NodeEvent, ErrorReport};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(NodeEvent::Error(ErrorReport {
///     node_code: Some(7),
///     error_code: 3,
///     description: "Parameter loading failed.".to_string(),
/// }));
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NodeEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: NodeEvent,
    ) -> Result<usize, broadcast::error::SendError<NodeEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: NodeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
