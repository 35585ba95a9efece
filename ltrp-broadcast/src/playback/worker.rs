//! Single playback worker thread
//!
//! A worker is bound to one [`PlaybackRequest`] for its lifetime: it plays the
//! clip, re-checks `repeat` under the state lock after every completion, and
//! loops while it is set. However the loop ends (completion, backend error,
//! panic), a drop guard calls `mark_stopped` so `on_air` can never stay stuck.

use crate::audio::AudioSink;
use crate::state::{PlaybackRequest, SharedPlaybackState};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Calls `mark_stopped` when dropped, including during unwinding
struct StopGuard<'a> {
    state: &'a SharedPlaybackState,
    request: &'a PlaybackRequest,
}

impl Drop for StopGuard<'_> {
    fn drop(&mut self) {
        info!(request = %self.request.id, "Stop playing sound {}", self.request.code);
        self.state.mark_stopped();
    }
}

/// Handle to the running worker thread
#[derive(Debug)]
pub struct PlaybackWorker {
    request: PlaybackRequest,
    handle: JoinHandle<()>,
}

impl PlaybackWorker {
    /// Start a worker for an already accepted request
    ///
    /// The caller must have won `try_accept_request` for `request`. If the
    /// thread cannot be spawned the error is returned and the caller is
    /// responsible for `mark_stopped`.
    pub fn spawn(
        request: PlaybackRequest,
        state: Arc<SharedPlaybackState>,
        sink: Arc<dyn AudioSink>,
    ) -> std::io::Result<Self> {
        let thread_request = request.clone();
        let handle = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || run(&thread_request, &state, sink.as_ref()))?;

        Ok(Self { request, handle })
    }

    pub fn request(&self) -> &PlaybackRequest {
        &self.request
    }

    /// Wait for the worker thread to exit
    pub fn join(self) {
        if self.handle.join().is_err() {
            // The guard already ran during unwinding
            error!(request = %self.request.id, "Playback worker panicked");
        }
    }
}

fn run(request: &PlaybackRequest, state: &SharedPlaybackState, sink: &dyn AudioSink) {
    let _guard = StopGuard { state, request };
    info!(
        request = %request.id,
        "Start playing sound {}: {}",
        request.code,
        request.path.display()
    );

    let mut plays = 0u32;
    loop {
        if let Err(e) = sink.play(&request.path) {
            error!(request = %request.id, "Playback of sound {} failed: {}", request.code, e);
            break;
        }
        plays += 1;

        if !state.should_repeat() {
            break;
        }
        debug!(request = %request.id, "Repeating sound {} (played {}x)", request.code, plays);
    }
}
