//! Event dispatcher
//!
//! Turns inbound broadcast, remote control and shutdown messages into
//! transactions on [`SharedPlaybackState`] and owns the single playback worker
//! slot. Accepting, spawning and storing a worker all happen under the slot
//! lock; cancelling releases it before joining.

use crate::audio::AudioSink;
use crate::catalog::{CatalogEntry, SoundCatalog};
use crate::config::NodeConfig;
use crate::playback::PlaybackWorker;
use crate::state::{AcceptMode, Acceptance, PlaybackRequest, SharedPlaybackState};
use ltrp_common::events::BroadcastMessage;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Attempts at starting the shutdown jingle when a late broadcast wins the slot
const JINGLE_ATTEMPTS: u32 = 3;

/// What a dispatched message did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A worker was spawned for `code`
    Started { code: u8 },
    /// Another playback is on air; the request was dropped
    Busy,
    /// The on-air playback finished after its repeat flag was cleared
    Cancelled,
    /// Not addressed to this node, unknown, or nothing to do
    Ignored,
    ShutdownRequested,
    /// The worker thread could not be started
    Failed,
}

pub struct EventDispatcher {
    config: NodeConfig,
    catalog: SoundCatalog,
    state: Arc<SharedPlaybackState>,
    sink: Arc<dyn AudioSink>,
    slot: Mutex<Option<PlaybackWorker>>,
}

impl EventDispatcher {
    pub fn new(
        config: NodeConfig,
        catalog: SoundCatalog,
        state: Arc<SharedPlaybackState>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        Self {
            config,
            catalog,
            state,
            sink,
            slot: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &Arc<SharedPlaybackState> {
        &self.state
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    fn slot(&self) -> MutexGuard<'_, Option<PlaybackWorker>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Broadcast request from another node
    pub fn handle_broadcast(&self, message: &BroadcastMessage) -> DispatchOutcome {
        if !self.config.accepts_origin(message.origin_node) {
            debug!(
                "Ignoring broadcast {} from node {}",
                message.event_code, message.origin_node
            );
            return DispatchOutcome::Ignored;
        }

        if self.catalog.is_cancel(message.event_code) {
            return self.cancel_and_join();
        }

        match self.catalog.resolve(message.event_code) {
            Some(entry) => self.start_playback(request_for(entry, entry.repeat), AcceptMode::Normal),
            None => {
                debug!("Unknown broadcast code {}", message.event_code);
                DispatchOutcome::Ignored
            }
        }
    }

    /// Remote control command
    pub fn handle_remote_control(&self, command: u8) -> DispatchOutcome {
        let remote = self.config.remote;

        if command == remote.play_test_sound {
            info!("Remote request: play test sound");
            self.start_playback(request_for(self.catalog.test_sound(), true), AcceptMode::Normal)
        } else if command == remote.stop_playing_sound {
            info!("Remote request: stop playing sound");
            self.cancel_and_join()
        } else {
            debug!("Ignoring remote control command {}", command);
            DispatchOutcome::Ignored
        }
    }

    /// Shutdown message; only flips flags, the supervisor does the rest
    pub fn handle_shutdown(&self, code: u8) -> DispatchOutcome {
        if !self.config.is_shutdown_for_me(code) {
            debug!("Ignoring shutdown code {}", code);
            return DispatchOutcome::Ignored;
        }

        info!("Shutdown requested (code {})", code);
        self.state.request_shutdown();
        DispatchOutcome::ShutdownRequested
    }

    /// Accept `request` and start its worker
    fn start_playback(&self, request: PlaybackRequest, mode: AcceptMode) -> DispatchOutcome {
        let mut slot = self.slot();

        match self.state.try_accept_request(&request, mode) {
            Acceptance::Accepted => {}
            Acceptance::OnAir => {
                debug!("On air, dropping sound {}", request.code);
                return DispatchOutcome::Busy;
            }
            Acceptance::NotOperational => {
                debug!("Not operational, dropping sound {}", request.code);
                return DispatchOutcome::Ignored;
            }
        }

        // Any previous worker has already run mark_stopped
        if let Some(previous) = slot.take() {
            previous.join();
        }

        let code = request.code;
        match PlaybackWorker::spawn(request, Arc::clone(&self.state), Arc::clone(&self.sink)) {
            Ok(worker) => {
                *slot = Some(worker);
                DispatchOutcome::Started { code }
            }
            Err(e) => {
                error!("Failed to spawn playback worker for sound {}: {}", code, e);
                self.state.mark_stopped();
                DispatchOutcome::Failed
            }
        }
    }

    /// Clear `repeat` and wait for the on-air worker to exit
    ///
    /// No-op when nothing is on air.
    pub fn cancel_and_join(&self) -> DispatchOutcome {
        let (cancelled, worker) = {
            let mut slot = self.slot();
            let Some(cancelled) = self.state.request_cancel() else {
                debug!("Cancel with nothing on air");
                return DispatchOutcome::Ignored;
            };
            (cancelled, slot.take())
        };

        match worker {
            Some(worker) => {
                info!("Cancelling sound {}", worker.request().code);
                worker.join();
            }
            // A concurrent cancel holds the handle
            None => self
                .state
                .wait_until_released(cancelled, self.config.timing.shutdown_poll),
        }
        DispatchOutcome::Cancelled
    }

    /// Stop whatever is on air and start the shutdown jingle
    ///
    /// Returns the id of the jingle request, or `None` if it could not be
    /// started.
    pub fn play_shutdown_jingle(&self) -> Option<Uuid> {
        let jingle = self.catalog.shutdown_jingle();

        for attempt in 1..=JINGLE_ATTEMPTS {
            self.cancel_and_join();

            let request = request_for(jingle, false);
            let id = request.id;
            match self.start_playback(request, AcceptMode::ShutdownJingle) {
                DispatchOutcome::Started { .. } => {
                    info!("Playing shutdown message");
                    return Some(id);
                }
                DispatchOutcome::Busy => {
                    warn!("Shutdown message lost the slot (attempt {})", attempt);
                }
                _ => return None,
            }
        }

        error!("Could not start shutdown message after {} attempts", JINGLE_ATTEMPTS);
        None
    }

    /// Stop repeating and join the worker in the slot, if any
    pub fn join_worker(&self) {
        let worker = {
            let mut slot = self.slot();
            self.state.request_cancel();
            slot.take()
        };

        if let Some(worker) = worker {
            worker.join();
        }
    }
}

fn request_for(entry: &CatalogEntry, repeat: bool) -> PlaybackRequest {
    PlaybackRequest::new(entry.code, entry.path.clone(), repeat)
}
