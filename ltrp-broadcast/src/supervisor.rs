//! Liveness loop and ordered shutdown
//!
//! While the node is operational the supervisor only ticks and publishes
//! vitals. Once `operational` drops it runs the teardown in a fixed order:
//! shutdown message (if shutting down) played to the end, worker joined, flags
//! forced terminal, final vital, respawn result.

use crate::dispatcher::EventDispatcher;
use crate::health::NodeHealth;
use ltrp_common::events::{Readiness, RespawnResult};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Supervisor {
    dispatcher: Arc<EventDispatcher>,
    health: Arc<NodeHealth>,
}

impl Supervisor {
    pub fn new(dispatcher: Arc<EventDispatcher>, health: Arc<NodeHealth>) -> Self {
        Self { dispatcher, health }
    }

    /// Run until the node stops; blocks the calling thread
    pub fn run(&self) -> RespawnResult {
        self.liveness_loop();
        self.shutdown()
    }

    fn liveness_loop(&self) {
        let timing = self.dispatcher.config().timing;
        let state = self.dispatcher.state();
        let vital_every = timing.vital_interval.max(timing.tick);

        self.health.set_readiness(Readiness::Online);
        info!(
            "Supervisor running (tick {:?}, vital every {:?})",
            timing.tick, vital_every
        );

        let mut next_tick = Instant::now();
        let mut next_vital = next_tick + vital_every;

        while state.is_operational() {
            let now = Instant::now();
            if now >= next_vital {
                self.health.publish_vital();
                next_vital += vital_every;
                if next_vital <= now {
                    next_vital = now + vital_every;
                }
            }

            next_tick += timing.tick;
            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            } else {
                // Fell behind; don't try to catch up
                next_tick = now;
            }
        }
    }

    fn shutdown(&self) -> RespawnResult {
        let state = self.dispatcher.state();
        let poll = self.dispatcher.config().timing.shutdown_poll;
        debug!("Left liveness loop: {:?}", state.snapshot());

        if state.is_shutting_down() {
            match self.dispatcher.play_shutdown_jingle() {
                Some(jingle) => {
                    state.wait_until_released(jingle, poll);
                    info!("Shutdown message finished");
                }
                None => warn!("Shutdown message not played, terminating anyway"),
            }
        }

        self.dispatcher.join_worker();
        state.force_terminal();

        let result = self.health.finish();
        info!("Broadcast node terminated");
        result
    }
}
