//! Temporary node root folders and ready-to-run test nodes

use ltrp_broadcast::audio::SimulatedSink;
use ltrp_broadcast::{BroadcastNode, StartupFailure};
use ltrp_common::config::ConfigPaths;
use ltrp_common::events::{EventBus, NodeEvent, RespawnResult};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Shipped configuration documents
pub const PARAMETERS: &str = include_str!("../../config/parameters.json");
pub const ERROR_CODES: &str = include_str!("../../config/error_code_list.json");

/// Codes from the shipped parameters
pub const NODE_CODE: u8 = 7;
pub const DRIVE_CONTROL: u8 = 3;

/// Temporary root folder laid out like a deployed node
pub struct ConfigFixture {
    _dir: TempDir,
    paths: ConfigPaths,
}

impl ConfigFixture {
    /// Shipped documents with a fast supervisor cadence
    pub fn new() -> Self {
        Self::with_documents(Some(&fast_parameters()), Some(ERROR_CODES))
    }

    /// Write the given documents; `None` leaves the file out
    pub fn with_documents(parameters: Option<&str>, error_codes: Option<&str>) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let paths = ConfigPaths::new(dir.path());
        std::fs::create_dir_all(paths.sound_dir()).expect("Failed to create sound dir");

        if let Some(content) = parameters {
            std::fs::write(paths.parameters(), content).expect("Failed to write parameters");
            create_sound_files(&paths, content);
        }
        if let Some(content) = error_codes {
            std::fs::write(paths.error_code_list(), content).expect("Failed to write error codes");
        }

        Self { _dir: dir, paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn sound_path(&self, file_name: &str) -> PathBuf {
        self.paths.sound_dir().join(file_name)
    }

    /// Load a node backed by `sink`
    pub fn load(
        &self,
        sink: Arc<SimulatedSink>,
        bus: EventBus,
    ) -> Result<BroadcastNode, StartupFailure> {
        BroadcastNode::load(&self.paths, &self.paths.sound_dir(), sink, bus)
    }
}

/// Shipped parameters with millisecond-scale supervisor timing
pub fn fast_parameters() -> String {
    let mut params: Value = serde_json::from_str(PARAMETERS).expect("Invalid shipped parameters");
    params["BROADCAST"]["VALUE"]["TICK_RATE_HZ"] = 200.into();
    params["BROADCAST"]["VALUE"]["SHUTDOWN_POLL_MS"] = 5.into();
    params["BROADCAST"]["VALUE"]["VITAL_INTERVAL_MS"] = 50.into();
    params.to_string()
}

/// Empty placeholder for every listed sound so the catalog finds them
fn create_sound_files(paths: &ConfigPaths, parameters: &str) {
    let Ok(params) = serde_json::from_str::<Value>(parameters) else {
        return;
    };
    if let Some(files) = params["BROADCAST_SOUND_LIST"]["FILE_NAME"].as_object() {
        for name in files.values().filter_map(Value::as_str) {
            std::fs::write(paths.sound_dir().join(name), b"").expect("Failed to write sound file");
        }
    }
}

/// Loaded node over a simulated sink, with a bus subscription taken before load
pub struct TestNode {
    pub node: Arc<BroadcastNode>,
    pub sink: Arc<SimulatedSink>,
    pub events: broadcast::Receiver<NodeEvent>,
    pub fixture: ConfigFixture,
}

impl TestNode {
    pub fn load(clip: Duration) -> Self {
        let fixture = ConfigFixture::new();
        let sink = Arc::new(SimulatedSink::new(clip));
        let bus = EventBus::new(1024);
        let events = bus.subscribe();
        let node = fixture.load(Arc::clone(&sink), bus).expect("Node failed to load");

        Self {
            node: Arc::new(node),
            sink,
            events,
            fixture,
        }
    }

    /// Run the supervisor on its own thread
    pub fn spawn_supervisor(&self) -> JoinHandle<RespawnResult> {
        let node = Arc::clone(&self.node);
        thread::spawn(move || node.run())
    }

    pub fn sound(&self, file_name: &str) -> PathBuf {
        self.fixture.sound_path(file_name)
    }
}

/// Everything currently queued on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<NodeEvent>) -> Vec<NodeEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}
