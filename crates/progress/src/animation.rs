//! Time-based interpolation with cancellation.
//!
//! An [`Interpolation`] describes a value travelling from `from` to `to` over
//! a fixed duration. [`AnimationHandle::spawn`] drives it on the Tokio
//! runtime, calling back on every tick until the duration elapses, the
//! callback asks to stop, or the handle is cancelled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;
use waypoint_core::AnimationId;

/// Shortest tick an interpolation will run at.
pub const MIN_FRAME: Duration = Duration::from_millis(1);

/// Easing curve applied to normalized time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Constant speed
    #[default]
    Linear,
    /// Cubic ease-out: fast start, slow finish
    EaseOut,
}

impl Easing {
    /// Map normalized time `t` in `[0, 1]` to normalized progress.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseOut => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// A value transition over wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolation {
    /// Start value
    pub from: f64,
    /// Target value
    pub to: f64,
    /// Total span
    pub duration: Duration,
    /// Tick interval
    pub frame: Duration,
    /// Curve
    pub easing: Easing,
}

impl Interpolation {
    /// Value at `elapsed` into the transition. Saturates at `to`.
    pub fn sample(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.to;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.from + (self.to - self.from) * self.easing.apply(t)
    }
}

/// Owner's reference to a running interpolation.
#[derive(Debug)]
pub struct AnimationHandle {
    id: AnimationId,
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl AnimationHandle {
    /// Spawn `interpolation` on the current runtime.
    ///
    /// A zero `frame` is raised to [`MIN_FRAME`]. `on_frame` receives every
    /// sampled value and returns `false` to stop early. `live` is incremented while the task body runs, so owners can
    /// observe how many interpolations are actually alive.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<F>(interpolation: Interpolation, live: Arc<AtomicUsize>, mut on_frame: F) -> Self
    where
        F: FnMut(AnimationId, f64) -> bool + Send + 'static,
    {
        let id = AnimationId::new();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let frame = interpolation.frame.max(MIN_FRAME);

        let live = LiveGuard::enter(live);
        let join = tokio::spawn(async move {
            let _live = live;
            let started = Instant::now();
            let mut ticker = tokio::time::interval(frame);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => {
                        trace!("Animation {} cancelled", id);
                        break;
                    }
                    _ = ticker.tick() => {
                        let elapsed = started.elapsed();
                        if !on_frame(id, interpolation.sample(elapsed)) {
                            break;
                        }
                        if elapsed >= interpolation.duration {
                            trace!("Animation {} finished", id);
                            break;
                        }
                    }
                }
            }
        });

        Self { id, token, join }
    }

    /// Identifier of this interpolation.
    pub fn id(&self) -> AnimationId {
        self.id
    }

    /// Request the task to stop. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn enter(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn linear(from: f64, to: f64, ms: u64) -> Interpolation {
        Interpolation {
            from,
            to,
            duration: Duration::from_millis(ms),
            frame: Duration::from_millis(16),
            easing: Easing::Linear,
        }
    }

    #[test]
    fn test_sample_linear() {
        let i = linear(0.0, 100.0, 2000);
        assert_eq!(i.sample(Duration::ZERO), 0.0);
        assert!((i.sample(Duration::from_millis(500)) - 25.0).abs() < 1e-9);
        assert!((i.sample(Duration::from_millis(1000)) - 50.0).abs() < 1e-9);
        assert_eq!(i.sample(Duration::from_millis(2000)), 100.0);
        assert_eq!(i.sample(Duration::from_secs(10)), 100.0);
    }

    #[test]
    fn test_sample_from_midpoint() {
        let i = linear(40.0, 100.0, 2000);
        assert!((i.sample(Duration::from_millis(1000)) - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_ease_out_is_ahead_of_linear() {
        assert!(Easing::EaseOut.apply(0.5) > Easing::Linear.apply(0.5));
        assert_eq!(Easing::EaseOut.apply(0.0), 0.0);
        assert_eq!(Easing::EaseOut.apply(1.0), 1.0);
        assert_eq!(Easing::EaseOut.apply(7.0), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_animation_reaches_target() {
        let live = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let handle = AnimationHandle::spawn(linear(0.0, 100.0, 200), live.clone(), move |_, v| {
            sink.lock().unwrap().push(v);
            true
        });
        assert_eq!(live.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(handle.is_finished());
        assert_eq!(live.load(Ordering::SeqCst), 0);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.first().copied(), Some(0.0));
        assert_eq!(seen.last().copied(), Some(100.0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_frames() {
        let live = Arc::new(AtomicUsize::new(0));
        let frames = Arc::new(AtomicUsize::new(0));
        let counter = frames.clone();

        let handle = AnimationHandle::spawn(linear(0.0, 100.0, 2000), live.clone(), move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
        assert!(handle.is_cancelled());
        tokio::time::sleep(Duration::from_millis(1)).await;
        let at_cancel = frames.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(frames.load(Ordering::SeqCst), at_cancel);
        assert!(handle.is_finished());
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_frame_still_runs_to_target() {
        let live = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));
        let sink = last.clone();
        let interpolation = Interpolation {
            frame: Duration::ZERO,
            ..linear(0.0, 100.0, 50)
        };

        let handle = AnimationHandle::spawn(interpolation, live.clone(), move |_, v| {
            *sink.lock().unwrap() = Some(v);
            true
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.is_finished());
        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert_eq!(*last.lock().unwrap(), Some(100.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_can_stop_early() {
        let live = Arc::new(AtomicUsize::new(0));
        let handle = AnimationHandle::spawn(linear(0.0, 100.0, 2000), live.clone(), |_, _| false);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(handle.is_finished());
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }
}
