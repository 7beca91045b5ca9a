//! Shared progress state.
//!
//! `ProgressState` owns the `loading` flag, the continuous counter behind the
//! displayed percentage, and at most one running interpolation.
//!
//! `loading` is optimistic: [`ProgressState::start`] raises it immediately and
//! hands back a [`ProgressGuard`]. The guard belongs to the async scope that
//! triggered the cycle; dropping it, on success, failure or cancellation of
//! that scope, settles the cycle. When the last overlapping guard settles the
//! flag drops back to `false`, the counter resets to 0 and the interpolation
//! is cancelled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use waypoint_core::{AnimationId, Timings, TransitionId};

use crate::animation::{AnimationHandle, Easing, Interpolation};

/// Target of every interpolation.
pub const PROGRESS_MAX: f64 = 100.0;

/// What subscribers see: the flag and the rounded percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    /// Whether an indication cycle is active
    pub loading: bool,
    /// Rounded counter, always in `0..=100`
    pub value: u8,
}

struct Inner {
    /// Unsettled optimistic scopes
    pending: usize,
    /// Continuous counter driven by the interpolation
    counter: f64,
    animation: Option<AnimationHandle>,
    mounted: bool,
}

/// Progress state machine shared by one provider subtree.
pub struct ProgressState {
    inner: Mutex<Inner>,
    tx: watch::Sender<ProgressSnapshot>,
    timings: Timings,
    easing: Easing,
    live: Arc<AtomicUsize>,
    unmounted: CancellationToken,
}

impl ProgressState {
    /// Create an idle state.
    pub fn new(timings: Timings, easing: Easing) -> Arc<Self> {
        let (tx, _rx) = watch::channel(ProgressSnapshot::default());
        Arc::new(Self {
            inner: Mutex::new(Inner {
                pending: 0,
                counter: 0.0,
                animation: None,
                mounted: true,
            }),
            tx,
            timings,
            easing,
            live: Arc::new(AtomicUsize::new(0)),
            unmounted: CancellationToken::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic inside a critical section leaves plain data behind; keep going.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Begin (or re-begin) an indication cycle.
    ///
    /// Sets `loading` synchronously, cancels any running interpolation and
    /// launches a new one from the current counter toward 100. The cycle
    /// lasts until the returned guard, and every other outstanding guard, is
    /// dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(self: &Arc<Self>) -> ProgressGuard {
        let transition = TransitionId::new();
        let mut inner = self.lock();

        if !inner.mounted {
            debug!("Ignoring progress start for {}: provider unmounted", transition);
            return ProgressGuard {
                state: Weak::new(),
                transition,
            };
        }

        if let Some(previous) = inner.animation.take() {
            previous.cancel();
            debug!("Cancelled animation {} for restart", previous.id());
        }

        let interpolation = Interpolation {
            from: inner.counter,
            to: PROGRESS_MAX,
            duration: self.timings.progress_duration(),
            frame: self.timings.frame_interval(),
            easing: self.easing,
        };
        let weak = Arc::downgrade(self);
        let handle = AnimationHandle::spawn(interpolation, self.live.clone(), move |id, value| {
            match weak.upgrade() {
                Some(state) => state.apply_frame(id, value),
                None => false,
            }
        });
        // Counted only once the task exists, so a failed spawn leaves no scope open.
        inner.pending += 1;
        info!(
            "Progress started ({}, animation {}, pending {})",
            transition,
            handle.id(),
            inner.pending
        );
        inner.animation = Some(handle);
        self.publish(&inner);

        ProgressGuard {
            state: Arc::downgrade(self),
            transition,
        }
    }

    /// Write one interpolation frame. Frames from a superseded animation are
    /// dropped and tell the task to stop.
    fn apply_frame(&self, id: AnimationId, value: f64) -> bool {
        let mut inner = self.lock();
        let current = inner.animation.as_ref().map(AnimationHandle::id);
        if current != Some(id) || inner.pending == 0 {
            return false;
        }
        inner.counter = value.clamp(0.0, PROGRESS_MAX);
        self.publish(&inner);
        true
    }

    fn settle(&self, transition: TransitionId) {
        let mut inner = self.lock();
        if inner.pending == 0 {
            return;
        }
        inner.pending -= 1;
        if inner.pending > 0 {
            debug!("Transition {} settled, {} still pending", transition, inner.pending);
            return;
        }

        Self::reset(&mut inner);
        info!("Progress settled ({})", transition);
        self.publish(&inner);
    }

    fn reset(inner: &mut Inner) {
        if let Some(animation) = inner.animation.take() {
            animation.cancel();
        }
        inner.counter = 0.0;
    }

    fn publish(&self, inner: &Inner) {
        let snapshot = if inner.pending > 0 {
            ProgressSnapshot {
                loading: true,
                value: inner.counter.round().clamp(0.0, PROGRESS_MAX) as u8,
            }
        } else {
            ProgressSnapshot::default()
        };
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Cancel the interpolation and refuse further cycles. Idempotent.
    pub(crate) fn teardown(&self) {
        let mut inner = self.lock();
        if !inner.mounted {
            return;
        }
        inner.mounted = false;
        inner.pending = 0;
        Self::reset(&mut inner);
        self.publish(&inner);
        drop(inner);
        self.unmounted.cancel();
        debug!("Progress state torn down");
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.tx.borrow()
    }

    /// Whether a cycle is active.
    pub fn is_loading(&self) -> bool {
        self.snapshot().loading
    }

    /// Rounded percentage.
    pub fn value(&self) -> u8 {
        self.snapshot().value
    }

    /// Receive a new snapshot on every change.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }

    /// Identifier of the interpolation the state currently owns.
    pub fn active_animation(&self) -> Option<AnimationId> {
        self.lock()
            .animation
            .as_ref()
            .filter(|a| !a.is_cancelled() && !a.is_finished())
            .map(AnimationHandle::id)
    }

    /// Number of interpolation tasks still executing.
    pub fn live_animations(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Whether the owning provider is still mounted.
    pub fn is_mounted(&self) -> bool {
        self.lock().mounted
    }

    /// Resolves once the owning provider unmounts.
    pub async fn unmounted(&self) {
        self.unmounted.cancelled().await
    }

    /// Timings this state was built with.
    pub fn timings(&self) -> &Timings {
        &self.timings
    }
}

impl std::fmt::Debug for ProgressState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressState")
            .field("snapshot", &self.snapshot())
            .field("live_animations", &self.live_animations())
            .finish()
    }
}

/// Settles one optimistic cycle when dropped.
#[must_use = "dropping the guard settles the progress cycle immediately"]
#[derive(Debug)]
pub struct ProgressGuard {
    state: Weak<ProgressState>,
    transition: TransitionId,
}

impl ProgressGuard {
    /// Scope this guard belongs to.
    pub fn transition(&self) -> TransitionId {
        self.transition
    }

    /// Settle now instead of at end of scope.
    pub fn settle(self) {
        drop(self);
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.settle(self.transition);
        }
    }
}
