//! End-to-end playback scenarios against a loaded node
//!
//! Nodes are loaded from the shipped configuration documents (in a temporary
//! root folder) and play through the simulated sink.

mod helpers;

use helpers::{drain_events, ConfigFixture, TestNode, DRIVE_CONTROL, NODE_CODE};
use ltrp_broadcast::audio::SimulatedSink;
use ltrp_broadcast::DispatchOutcome;
use ltrp_common::events::{BroadcastMessage, EventBus, NodeEvent, Readiness};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn broadcast(code: u8) -> BroadcastMessage {
    BroadcastMessage {
        origin_node: DRIVE_CONTROL,
        event_code: code,
    }
}

#[test]
fn test_alarm_repeats_until_cancelled() {
    let test = TestNode::load(Duration::from_millis(10));
    let dispatcher = test.node.dispatcher();

    assert_eq!(
        dispatcher.handle_broadcast(&broadcast(5)),
        DispatchOutcome::Started { code: 5 }
    );
    let flags = test.node.state().snapshot();
    assert!(flags.on_air && flags.repeat);

    thread::sleep(Duration::from_millis(40));
    assert!(test.node.state().is_on_air());

    assert_eq!(dispatcher.handle_broadcast(&broadcast(8)), DispatchOutcome::Cancelled);
    let flags = test.node.state().snapshot();
    assert!(!flags.on_air && !flags.repeat);
    assert!(test.sink.completed_count(&test.sound("alarm.mp3")) >= 2);
}

#[test]
fn test_broadcast_while_on_air_is_dropped() {
    let test = TestNode::load(Duration::from_millis(30));
    let dispatcher = test.node.dispatcher();

    dispatcher.handle_broadcast(&broadcast(5));
    assert_eq!(dispatcher.handle_broadcast(&broadcast(7)), DispatchOutcome::Busy);
    assert_eq!(test.node.state().snapshot().current_code, Some(5));

    dispatcher.cancel_and_join();
    assert_eq!(test.sink.completed_count(&test.sound("rotation_start.mp3")), 0);
}

#[test]
fn test_shutdown_while_idle_plays_jingle_then_reports_offline() {
    let mut test = TestNode::load(Duration::from_millis(20));
    let supervisor = test.spawn_supervisor();

    thread::sleep(Duration::from_millis(20));
    assert_eq!(
        test.node.dispatcher().handle_shutdown(NODE_CODE),
        DispatchOutcome::ShutdownRequested
    );
    let result = supervisor.join().unwrap();

    assert_eq!(result.readiness, Readiness::Offline);
    assert_eq!(test.sink.completed(), vec![test.sound("shutdown_message.mp3")]);

    let events = drain_events(&mut test.events);
    let last_vital = events
        .iter()
        .rev()
        .find_map(|e| match e {
            NodeEvent::Vital(report) => Some(report.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_vital.readiness, Readiness::Offline);
    let offline_vitals = events
        .iter()
        .filter(|e| matches!(e, NodeEvent::Vital(r) if r.readiness == Readiness::Offline))
        .count();
    assert_eq!(offline_vitals, 1);
    assert!(matches!(events.last(), Some(NodeEvent::RespawnResult(r)) if r.readiness == Readiness::Offline));
}

#[test]
fn test_unknown_code_has_no_effect() {
    let mut test = TestNode::load(Duration::from_millis(1));
    let before = test.node.state().snapshot();

    assert_eq!(
        test.node.dispatcher().handle_broadcast(&broadcast(255)),
        DispatchOutcome::Ignored
    );

    assert_eq!(test.node.state().snapshot(), before);
    assert!(test.sink.started().is_empty());
    assert!(!drain_events(&mut test.events)
        .iter()
        .any(|e| matches!(e, NodeEvent::Error(_))));
}

#[test]
fn test_concurrent_broadcasts_start_one_worker() {
    let test = TestNode::load(Duration::from_millis(50));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = [5u8, 6, 7, 5, 6, 7, 5, 6]
        .into_iter()
        .map(|code| {
            let node = Arc::clone(&test.node);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                node.dispatcher().handle_broadcast(&broadcast(code))
            })
        })
        .collect();

    let outcomes: Vec<DispatchOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let started = outcomes
        .iter()
        .filter(|o| matches!(o, DispatchOutcome::Started { .. }))
        .count();
    assert_eq!(started, 1, "outcomes: {:?}", outcomes);
    assert_eq!(
        outcomes.iter().filter(|o| **o == DispatchOutcome::Busy).count(),
        7
    );

    test.node.dispatcher().join_worker();
    assert_eq!(test.sink.started().len(), test.sink.completed().len());
}

#[test]
fn test_playback_failure_keeps_node_operational() {
    let test = TestNode::load(Duration::from_millis(5));
    test.sink.fail_on(test.sound("alarm.mp3"));
    let dispatcher = test.node.dispatcher();

    dispatcher.handle_broadcast(&broadcast(5));
    assert!(test.node.state().wait_until_off_air_for(Duration::from_secs(2)));

    let flags = test.node.state().snapshot();
    assert!(flags.operational && !flags.repeat);
    assert_eq!(test.node.health().readiness(), Readiness::Offline);

    assert_eq!(
        dispatcher.handle_broadcast(&broadcast(7)),
        DispatchOutcome::Started { code: 7 }
    );
    dispatcher.join_worker();
    assert_eq!(test.sink.completed(), vec![test.sound("rotation_start.mp3")]);
}

#[test]
fn test_shutdown_interrupts_alarm_after_current_clip() {
    let test = TestNode::load(Duration::from_millis(15));
    let supervisor = test.spawn_supervisor();
    let dispatcher = test.node.dispatcher();

    dispatcher.handle_broadcast(&broadcast(5));
    thread::sleep(Duration::from_millis(40));
    dispatcher.handle_shutdown(255);
    supervisor.join().unwrap();

    let completed = test.sink.completed();
    assert!(completed.len() >= 2);
    assert_eq!(completed.last(), Some(&test.sound("shutdown_message.mp3")));
    assert!(completed[..completed.len() - 1]
        .iter()
        .all(|p| *p == test.sound("alarm.mp3")));
}

// ============================================================================
// Startup failures
// ============================================================================

fn load_failure(fixture: &ConfigFixture) -> (ltrp_broadcast::StartupFailure, Vec<NodeEvent>) {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let sink = Arc::new(SimulatedSink::new(Duration::ZERO));

    let failure = match fixture.load(sink, bus) {
        Ok(_) => panic!("Node loaded from a broken root folder"),
        Err(failure) => failure,
    };
    (failure, drain_events(&mut rx))
}

#[test]
fn test_missing_error_code_list() {
    let fixture = ConfigFixture::with_documents(Some(helpers::fixtures::PARAMETERS), None);
    let (failure, events) = load_failure(&fixture);

    assert_eq!(failure.error_code, 2);
    assert_eq!(failure.description, "Error code list loading failed.");
    assert!(events.iter().any(|e| matches!(
        e,
        NodeEvent::RespawnResult(r) if r.readiness == Readiness::Error && r.state == 9
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        NodeEvent::Error(r) if r.error_code == 2 && r.description == "Error code list loading failed."
    )));
}

#[test]
fn test_malformed_parameters() {
    let fixture = ConfigFixture::with_documents(Some("{ not json"), Some(helpers::fixtures::ERROR_CODES));
    let (failure, events) = load_failure(&fixture);

    assert_eq!(failure.error_code, 3);
    assert_eq!(failure.description, "Parameter loading failed.");
    assert!(events.iter().any(|e| matches!(e, NodeEvent::Error(r) if r.error_code == 3)));
}

#[test]
fn test_missing_shutdown_message_rejected() {
    let mut params: serde_json::Value =
        serde_json::from_str(helpers::fixtures::PARAMETERS).unwrap();
    params["BROADCAST_SOUND_LIST"]["FILE_NAME"]
        .as_object_mut()
        .unwrap()
        .remove("9");

    let fixture = ConfigFixture::with_documents(
        Some(&params.to_string()),
        Some(helpers::fixtures::ERROR_CODES),
    );
    let (failure, _) = load_failure(&fixture);
    assert_eq!(failure.error_code, 3);
}
