//! Broadcast node assembly
//!
//! Loads the shared configuration documents, wires state, dispatcher, health
//! and supervisor together, and reports startup failures the same way runtime
//! errors are reported.

use crate::audio::AudioSink;
use crate::catalog::SoundCatalog;
use crate::config::NodeConfig;
use crate::dispatcher::EventDispatcher;
use crate::error::Result;
use crate::health::NodeHealth;
use crate::state::SharedPlaybackState;
use crate::supervisor::Supervisor;
use ltrp_common::config::ConfigPaths;
use ltrp_common::error_codes::ERR_CODE_LIST_LOADING_FAILED;
use ltrp_common::events::{EventBus, ReadinessCodes, RespawnResult};
use ltrp_common::{ErrorCodeList, Parameters};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Name of the parameter loading error in `error_code_list.json`
pub const ERR_PARAMETER_LOADING_FAILED: &str = "ERR_PARAMETER_LOADING_FAILED";

/// Used when the error code list does not name the parameter loading error
const FALLBACK_PARAMETER_ERROR_CODE: u8 = 3;

/// Node could not be brought up; already reported on the bus
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Startup failed with error code {error_code}: {description}")]
pub struct StartupFailure {
    pub error_code: u8,
    pub description: String,
}

pub struct BroadcastNode {
    dispatcher: Arc<EventDispatcher>,
    health: Arc<NodeHealth>,
    bus: EventBus,
}

impl BroadcastNode {
    /// Assemble a node from already loaded configuration
    pub fn new(
        config: NodeConfig,
        catalog: SoundCatalog,
        error_codes: Arc<ErrorCodeList>,
        sink: Arc<dyn AudioSink>,
        bus: EventBus,
    ) -> Self {
        let health = Arc::new(NodeHealth::new(
            Some(config.node_code),
            config.readiness_codes,
            config.default_err_code,
            error_codes,
            bus.clone(),
        ));
        let dispatcher = Arc::new(EventDispatcher::new(
            config,
            catalog,
            Arc::new(SharedPlaybackState::new()),
            sink,
        ));

        Self {
            dispatcher,
            health,
            bus,
        }
    }

    /// Load `error_code_list.json` and `parameters.json` below `paths`
    ///
    /// Any failure enters Error readiness, publishes the error report and
    /// respawn result on `bus`, and is returned as [`StartupFailure`].
    pub fn load(
        paths: &ConfigPaths,
        sound_dir: &Path,
        sink: Arc<dyn AudioSink>,
        bus: EventBus,
    ) -> std::result::Result<Self, StartupFailure> {
        let error_codes = match ErrorCodeList::load(&paths.error_code_list()) {
            Ok(list) => Arc::new(list),
            Err(e) => {
                return Err(report_startup_failure(
                    Arc::new(ErrorCodeList::default()),
                    ERR_CODE_LIST_LOADING_FAILED,
                    &e.to_string(),
                    "Error code list loading failed.",
                    &bus,
                ));
            }
        };

        match load_configuration(paths, sound_dir) {
            Ok((config, catalog)) => {
                info!(
                    "Loaded configuration: node {}, {} sounds, accepted origins {:?}",
                    config.node_code,
                    catalog.len(),
                    config.accepted_origins
                );
                Ok(Self::new(config, catalog, error_codes, sink, bus))
            }
            Err(e) => {
                let code = error_codes
                    .code(ERR_PARAMETER_LOADING_FAILED)
                    .unwrap_or(FALLBACK_PARAMETER_ERROR_CODE);
                Err(report_startup_failure(
                    error_codes,
                    code,
                    &e.to_string(),
                    "Parameter loading failed.",
                    &bus,
                ))
            }
        }
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn state(&self) -> &Arc<SharedPlaybackState> {
        self.dispatcher.state()
    }

    pub fn health(&self) -> &Arc<NodeHealth> {
        &self.health
    }

    pub fn config(&self) -> &NodeConfig {
        self.dispatcher.config()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Run the supervisor on the calling thread until the node terminates
    pub fn run(&self) -> RespawnResult {
        Supervisor::new(Arc::clone(&self.dispatcher), Arc::clone(&self.health)).run()
    }
}

fn load_configuration(paths: &ConfigPaths, sound_dir: &Path) -> Result<(NodeConfig, SoundCatalog)> {
    let params = Parameters::load(&paths.parameters())?;
    let config = NodeConfig::from_parameters(&params)?;
    let catalog = SoundCatalog::from_sound_list(&params.broadcast_sound_list, sound_dir)?;
    Ok((config, catalog))
}

/// Publish the failure through a health record with no node identity
fn report_startup_failure(
    error_codes: Arc<ErrorCodeList>,
    error_code: u8,
    detail: &str,
    fallback_description: &str,
    bus: &EventBus,
) -> StartupFailure {
    let description = error_codes
        .describe(error_code)
        .unwrap_or(fallback_description)
        .to_string();

    error!("Startup failed: {}", detail);
    let health = NodeHealth::new(None, ReadinessCodes::default(), error_code, error_codes, bus.clone());
    health.raise_error(error_code, Some(&description));

    StartupFailure {
        error_code,
        description,
    }
}
