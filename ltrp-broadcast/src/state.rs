//! Shared playback state
//!
//! The flags every actor of the node observes: `on_air`, `repeat`,
//! `operational` and `shutting_down`, plus the request currently bound to the
//! playback worker. All of them live behind one mutex and every operation is a
//! single check-then-act transaction under that lock.
//!
//! Lock order: the dispatcher's worker slot may be held while calling into
//! this type, never the other way round.

use std::path::PathBuf;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// One accepted broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    /// Correlates log lines of one playback
    pub id: Uuid,
    pub code: u8,
    pub path: PathBuf,
    pub repeat: bool,
}

impl PlaybackRequest {
    pub fn new(code: u8, path: PathBuf, repeat: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            path,
            repeat,
        }
    }
}

/// Gate an accept goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptMode {
    /// Broadcast or remote play; refused once the node is not operational
    Normal,
    /// The shutdown message; only needs nothing on air
    ShutdownJingle,
}

/// Answer of [`SharedPlaybackState::try_accept_request`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Accepted,
    /// Another playback is on air
    OnAir,
    /// The node has left the liveness loop
    NotOperational,
}

impl Acceptance {
    pub fn is_accepted(self) -> bool {
        self == Acceptance::Accepted
    }
}

/// Point-in-time copy of the flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PlaybackFlags {
    pub on_air: bool,
    pub repeat: bool,
    pub operational: bool,
    pub shutting_down: bool,
    /// Code of the request bound to the worker, if any
    pub current_code: Option<u8>,
}

#[derive(Debug)]
struct Inner {
    on_air: bool,
    repeat: bool,
    operational: bool,
    shutting_down: bool,
    current: Option<PlaybackRequest>,
}

/// Lock-protected playback flags shared by dispatcher, worker and supervisor
#[derive(Debug)]
pub struct SharedPlaybackState {
    inner: Mutex<Inner>,
    /// Signalled whenever `on_air` drops to false
    off_air: Condvar,
}

impl SharedPlaybackState {
    /// Fresh state: operational, idle
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                on_air: false,
                repeat: false,
                operational: true,
                shutting_down: false,
                current: None,
            }),
            off_air: Condvar::new(),
        }
    }

    // Transactions are plain assignments; a poisoned lock still holds
    // consistent flags.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept `request` if nothing is on air
    ///
    /// On success `on_air` is set, `repeat` follows the request, and the
    /// request becomes the bound one. A [`AcceptMode::Normal`] request is also
    /// refused once `operational` is false. Refusals have no side effect.
    pub fn try_accept_request(&self, request: &PlaybackRequest, mode: AcceptMode) -> Acceptance {
        let mut inner = self.lock();
        if mode == AcceptMode::Normal && !inner.operational {
            return Acceptance::NotOperational;
        }
        if inner.on_air {
            return Acceptance::OnAir;
        }
        inner.on_air = true;
        inner.repeat = request.repeat;
        inner.current = Some(request.clone());
        Acceptance::Accepted
    }

    /// Ask the worker to stop after the clip it is playing
    ///
    /// Returns the id of the request that was cancelled, or `None` with no
    /// change when nothing is on air.
    pub fn request_cancel(&self) -> Option<Uuid> {
        let mut inner = self.lock();
        if !inner.on_air {
            return None;
        }
        inner.repeat = false;
        inner.current.as_ref().map(|r| r.id)
    }

    /// Worker exit: clear `on_air`/`repeat` and wake off-air waiters
    pub fn mark_stopped(&self) {
        let mut inner = self.lock();
        inner.on_air = false;
        inner.repeat = false;
        inner.current = None;
        drop(inner);
        self.off_air.notify_all();
    }

    /// Leave the liveness loop and play the shutdown jingle. Idempotent.
    pub fn request_shutdown(&self) {
        let mut inner = self.lock();
        inner.operational = false;
        inner.shutting_down = true;
    }

    /// Leave the liveness loop without the shutdown jingle
    pub fn stop_operation(&self) {
        self.lock().operational = false;
    }

    /// Re-checked by the worker after every completed clip
    pub fn should_repeat(&self) -> bool {
        self.lock().repeat
    }

    pub fn is_on_air(&self) -> bool {
        self.lock().on_air
    }

    pub fn is_operational(&self) -> bool {
        self.lock().operational
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }

    /// Request currently bound to the worker
    pub fn current_request(&self) -> Option<PlaybackRequest> {
        self.lock().current.clone()
    }

    pub fn snapshot(&self) -> PlaybackFlags {
        let inner = self.lock();
        PlaybackFlags {
            on_air: inner.on_air,
            repeat: inner.repeat,
            operational: inner.operational,
            shutting_down: inner.shutting_down,
            current_code: inner.current.as_ref().map(|r| r.code),
        }
    }

    /// Block until `on_air` is observably false
    ///
    /// Woken by `mark_stopped`; `poll` bounds the time between re-checks.
    pub fn wait_until_off_air(&self, poll: Duration) {
        let mut inner = self.lock();
        while inner.on_air {
            inner = self
                .off_air
                .wait_timeout(inner, poll)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    /// Block until request `id` is no longer the bound one
    ///
    /// Unlike `wait_until_off_air` this returns even if another request was
    /// accepted after `id` stopped.
    pub fn wait_until_released(&self, id: Uuid, poll: Duration) {
        let mut inner = self.lock();
        while inner.current.as_ref().is_some_and(|r| r.id == id) {
            inner = self
                .off_air
                .wait_timeout(inner, poll)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    /// Like `wait_until_off_air` but gives up after `timeout`
    ///
    /// Returns true if the state went off air in time.
    pub fn wait_until_off_air_for(&self, timeout: Duration) -> bool {
        let inner = self.lock();
        let (inner, _) = self
            .off_air
            .wait_timeout_while(inner, timeout, |inner| inner.on_air)
            .unwrap_or_else(PoisonError::into_inner);
        !inner.on_air
    }

    /// Final teardown: nothing on air, not operational
    ///
    /// `shutting_down` keeps its value so the terminal state still records
    /// why the node stopped.
    pub fn force_terminal(&self) {
        let mut inner = self.lock();
        inner.on_air = false;
        inner.repeat = false;
        inner.operational = false;
        inner.current = None;
        drop(inner);
        self.off_air.notify_all();
    }
}

impl Default for SharedPlaybackState {
    fn default() -> Self {
        Self::new()
    }
}
