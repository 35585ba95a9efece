//! Node health: readiness, error code and outbound reports
//!
//! Reports are projections of the values held here and are published on the
//! EventBus: vital on every readiness transition and when the supervisor asks,
//! error + respawn result when the node enters Error, and the respawn result
//! once more at termination.

use chrono::Utc;
use ltrp_common::events::{
    ErrorReport, EventBus, HealthReport, NodeEvent, Readiness, ReadinessCodes, RespawnResult,
};
use ltrp_common::ErrorCodeList;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};

#[derive(Debug)]
struct HealthInner {
    readiness: Readiness,
    error_code: u8,
}

pub struct NodeHealth {
    node_code: Option<u8>,
    codes: ReadinessCodes,
    error_codes: Arc<ErrorCodeList>,
    bus: EventBus,
    inner: Mutex<HealthInner>,
}

impl NodeHealth {
    /// New health record, initially Offline with `default_err_code`
    pub fn new(
        node_code: Option<u8>,
        codes: ReadinessCodes,
        default_err_code: u8,
        error_codes: Arc<ErrorCodeList>,
        bus: EventBus,
    ) -> Self {
        Self {
            node_code,
            codes,
            error_codes,
            bus,
            inner: Mutex::new(HealthInner {
                readiness: Readiness::Offline,
                error_code: default_err_code,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HealthInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn node_code(&self) -> Option<u8> {
        self.node_code
    }

    pub fn readiness(&self) -> Readiness {
        self.lock().readiness
    }

    pub fn error_code(&self) -> u8 {
        self.lock().error_code
    }

    /// Current vital report
    pub fn report(&self) -> HealthReport {
        let inner = self.lock();
        HealthReport {
            node_code: self.node_code,
            readiness: inner.readiness,
            state: self.codes.code(inner.readiness),
            error_code: inner.error_code,
        }
    }

    /// Move to `readiness`; publishes a vital report if it changed
    ///
    /// Returns whether it changed.
    pub fn set_readiness(&self, readiness: Readiness) -> bool {
        let changed = {
            let mut inner = self.lock();
            let changed = inner.readiness != readiness;
            inner.readiness = readiness;
            changed
        };

        if changed {
            info!("Node readiness -> {}", readiness);
            self.publish_vital();
        }
        changed
    }

    pub fn publish_vital(&self) {
        self.bus.emit_lossy(NodeEvent::Vital(self.report()));
    }

    pub fn publish_respawn_result(&self) -> RespawnResult {
        let readiness = self.readiness();
        let result = RespawnResult {
            timestamp: Utc::now(),
            node_code: self.node_code,
            readiness,
            state: self.codes.code(readiness),
        };
        self.bus.emit_lossy(NodeEvent::RespawnResult(result.clone()));
        result
    }

    /// Enter Error with `error_code`
    ///
    /// `detail` is logged in place of the listed description and becomes the
    /// reported description for codes missing from the error code list.
    pub fn raise_error(&self, error_code: u8, detail: Option<&str>) {
        let description = match (self.error_codes.describe(error_code), detail) {
            (Some(listed), _) => listed.to_string(),
            (None, Some(detail)) => detail.to_string(),
            (None, None) => self.error_codes.describe_or_unknown(error_code),
        };
        error!(
            "Error code: {} - {}",
            error_code,
            detail.unwrap_or(description.as_str())
        );

        {
            let mut inner = self.lock();
            inner.error_code = error_code;
            inner.readiness = Readiness::Error;
        }

        self.publish_respawn_result();
        self.bus.emit_lossy(NodeEvent::Error(ErrorReport {
            node_code: self.node_code,
            error_code,
            description,
        }));
    }

    /// Terminal transition: Offline, final vital, then the respawn result
    pub fn finish(&self) -> RespawnResult {
        if !self.set_readiness(Readiness::Offline) {
            self.publish_vital();
        }
        self.publish_respawn_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health(bus: &EventBus) -> NodeHealth {
        let errors = ErrorCodeList::from_json(
            r#"{ "ERR_MAL_FUNCTION": 4, "4": "Node malfunction." }"#,
        )
        .unwrap();
        NodeHealth::new(
            Some(7),
            ReadinessCodes::default(),
            0,
            Arc::new(errors),
            bus.clone(),
        )
    }

    #[test]
    fn test_transition_publishes_once() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let health = health(&bus);

        health.set_readiness(Readiness::Online);
        health.set_readiness(Readiness::Online);

        match rx.try_recv().unwrap() {
            NodeEvent::Vital(report) => {
                assert_eq!(report.readiness, Readiness::Online);
                assert_eq!(report.state, 1);
                assert_eq!(report.node_code, Some(7));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_raise_error_reports() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let health = health(&bus);

        health.raise_error(4, None);

        assert_eq!(health.readiness(), Readiness::Error);
        assert_eq!(health.error_code(), 4);
        match rx.try_recv().unwrap() {
            NodeEvent::RespawnResult(result) => {
                assert_eq!(result.readiness, Readiness::Error);
                assert_eq!(result.state, 9);
            }
            other => panic!("unexpected event {:?}", other),
        }
        match rx.try_recv().unwrap() {
            NodeEvent::Error(report) => {
                assert_eq!(report.error_code, 4);
                assert_eq!(report.description, "Node malfunction.");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unlisted_code_uses_detail() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let health = NodeHealth::new(
            None,
            ReadinessCodes::default(),
            0,
            Arc::new(ErrorCodeList::default()),
            bus.clone(),
        );

        health.raise_error(2, Some("Error code list loading failed."));

        let events: Vec<NodeEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(events.iter().any(|e| matches!(
            e,
            NodeEvent::Error(r) if r.description == "Error code list loading failed." && r.node_code.is_none()
        )));
    }

    #[test]
    fn test_finish_ends_with_respawn_result() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let health = health(&bus);
        health.set_readiness(Readiness::Online);
        let _ = rx.try_recv();

        let result = health.finish();
        assert_eq!(result.readiness, Readiness::Offline);

        let events: Vec<NodeEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 2, "events: {:?}", events);
        assert!(matches!(&events[0], NodeEvent::Vital(r) if r.readiness == Readiness::Offline));
        assert!(matches!(events.last(), Some(NodeEvent::RespawnResult(_))));
    }

    #[test]
    fn test_finish_while_offline_still_publishes_final_vital() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let health = health(&bus);

        health.finish();

        let events: Vec<NodeEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 2, "events: {:?}", events);
        assert!(matches!(&events[0], NodeEvent::Vital(r) if r.readiness == Readiness::Offline));
        assert!(matches!(&events[1], NodeEvent::RespawnResult(_)));
    }
}
