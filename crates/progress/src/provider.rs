//! Progress distribution and the trigger API.
//!
//! A [`ProgressProvider`] owns one [`ProgressState`] for its subtree. Instead
//! of ambient lookup, components receive a [`ProgressContext`] when they are
//! built; [`use_progress`] turns that context into a [`ProgressTrigger`] or
//! fails with [`ProgressError::MissingProvider`].

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use waypoint_core::Timings;

use crate::animation::Easing;
use crate::state::{ProgressGuard, ProgressState};

/// Error type for progress operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors raised by the progress API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    /// A consumer was built without a provider above it
    #[error("no progress provider in scope: mount a `ProgressProvider` and pass its context down before using the progress bar")]
    MissingProvider,
}

/// Handle passed down a component tree. Empty outside any provider.
#[derive(Debug, Clone, Default)]
pub struct ProgressContext {
    state: Option<Arc<ProgressState>>,
}

impl ProgressContext {
    /// A context with no provider.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether a provider is reachable.
    pub fn is_provided(&self) -> bool {
        self.state.is_some()
    }

    /// The provided state.
    pub fn state(&self) -> Result<&Arc<ProgressState>> {
        self.state.as_ref().ok_or(ProgressError::MissingProvider)
    }
}

/// Mounts one progress state and exposes it to a subtree.
///
/// Dropping the provider unmounts it: the running interpolation is
/// cancelled and later starts are ignored.
#[derive(Debug)]
pub struct ProgressProvider {
    state: Arc<ProgressState>,
}

impl ProgressProvider {
    /// Mount with linear interpolation.
    pub fn new(timings: Timings) -> Self {
        Self::with_easing(timings, Easing::default())
    }

    /// Mount with a custom easing curve.
    ///
    /// Out-of-range timings are accepted; a zero frame interval runs at
    /// [`MIN_FRAME`](crate::MIN_FRAME) and a zero duration jumps
    /// straight to 100.
    pub fn with_easing(timings: Timings, easing: Easing) -> Self {
        if let Err(e) = timings.validate() {
            warn!("Progress provider mounted with {}", e);
        }
        debug!("Mounting progress provider");
        Self {
            state: ProgressState::new(timings, easing),
        }
    }

    /// Context to hand to descendants.
    pub fn context(&self) -> ProgressContext {
        ProgressContext {
            state: Some(self.state.clone()),
        }
    }

    /// The owned state.
    pub fn state(&self) -> &Arc<ProgressState> {
        &self.state
    }
}

impl Drop for ProgressProvider {
    fn drop(&mut self) {
        self.state.teardown();
    }
}

/// Look up the provider in `ctx` and return its trigger.
pub fn use_progress(ctx: &ProgressContext) -> Result<ProgressTrigger> {
    let state = ctx.state()?.clone();
    Ok(ProgressTrigger { state })
}

/// Cheap, cloneable handle that starts progress cycles.
#[derive(Debug, Clone)]
pub struct ProgressTrigger {
    state: Arc<ProgressState>,
}

impl ProgressTrigger {
    /// Start a cycle. Hold the guard for as long as the triggering work runs.
    pub fn start(&self) -> ProgressGuard {
        self.state.start()
    }

    /// Await `fut` inside a cycle; settles when `fut` completes.
    pub async fn track<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        let _guard = self.start();
        fut.await
    }

    /// Start a cycle now and run `fut` as a detached transition.
    ///
    /// `loading` is raised before this returns. The cycle settles when the
    /// spawned task ends, whether `fut` completes, panics or the task is
    /// aborted.
    pub fn transition<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let guard = self.start();
        tokio::spawn(async move {
            let _guard = guard;
            fut.await
        })
    }

    /// State behind this trigger.
    pub fn state(&self) -> &Arc<ProgressState> {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_use_progress_without_provider_fails() {
        let err = use_progress(&ProgressContext::empty()).unwrap_err();
        assert_eq!(err, ProgressError::MissingProvider);
        assert!(err.to_string().contains("ProgressProvider"));
    }

    #[test]
    fn test_context_reaches_single_state() {
        let provider = ProgressProvider::new(Timings::default());
        let a = provider.context();
        let b = a.clone();
        assert!(a.is_provided());
        assert!(Arc::ptr_eq(a.state().unwrap(), b.state().unwrap()));
        assert!(Arc::ptr_eq(a.state().unwrap(), provider.state()));
        assert!(!ProgressContext::empty().is_provided());
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_round_trips_loading() {
        let provider = ProgressProvider::new(Timings::default());
        let trigger = use_progress(&provider.context()).unwrap();
        let state = provider.state().clone();

        let observed = trigger
            .track(async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                state.snapshot()
            })
            .await;

        assert!(observed.loading);
        assert!(observed.value > 0);
        assert!(!provider.state().is_loading());
        assert_eq!(provider.state().value(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_raises_loading_before_spawning() {
        let provider = ProgressProvider::new(Timings::default());
        let trigger = use_progress(&provider.context()).unwrap();

        let handle = trigger.transition(async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            7
        });
        assert!(provider.state().is_loading());

        assert_eq!(handle.await.unwrap(), 7);
        assert!(!provider.state().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_transition_still_settles() {
        let provider = ProgressProvider::new(Timings::default());
        let trigger = use_progress(&provider.context()).unwrap();

        let handle = trigger.transition(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();
        let _ = handle.await;

        assert!(!provider.state().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_work_settles_without_stop_call() {
        let provider = ProgressProvider::new(Timings::default());
        let trigger = use_progress(&provider.context()).unwrap();

        let result: std::result::Result<(), &str> = trigger
            .track(async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Err("destination refused")
            })
            .await;

        assert!(result.is_err());
        assert!(!provider.state().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_frame_interval_still_animates_and_settles() {
        let timings = Timings {
            frame_interval_ms: 0,
            ..Timings::default()
        };
        let provider = ProgressProvider::new(timings);
        let trigger = use_progress(&provider.context()).unwrap();

        let guard = trigger.start();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(provider.state().value() > 0);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(provider.state().is_loading());
        assert_eq!(provider.state().value(), 100);
        assert_eq!(provider.state().live_animations(), 0);

        drop(guard);
        assert!(!provider.state().is_loading());
        assert_eq!(provider.state().value(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_provider_cancels_animation() {
        let provider = ProgressProvider::new(Timings::default());
        let trigger = use_progress(&provider.context()).unwrap();
        let state = provider.state().clone();
        let _guard = trigger.start();

        drop(provider);
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(!state.is_mounted());
        assert!(!state.is_loading());
        assert_eq!(state.live_animations(), 0);
    }
}
