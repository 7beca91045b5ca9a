//! Progress bar view.
//!
//! Rendering is a pure function of the current [`ProgressSnapshot`]: nothing
//! while idle, a full-screen percentage overlay while loading.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::provider::{ProgressContext, Result};
use crate::state::{ProgressSnapshot, ProgressState};

/// Cubic-bezier control points of the slide animation.
pub const SLIDE_EASE: [f32; 4] = [0.22, 1.0, 0.36, 1.0];

/// Vertical slide, as a percentage of the overlay's own height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideTransition {
    /// Offset the slide starts from
    pub from_percent: i16,
    /// Offset the slide ends at
    pub to_percent: i16,
    /// Slide length
    pub duration: Duration,
    /// Cubic-bezier control points
    pub ease: [f32; 4],
}

impl SlideTransition {
    /// Slide down from above the viewport.
    pub fn enter(duration: Duration) -> Self {
        Self {
            from_percent: -100,
            to_percent: 0,
            duration,
            ease: SLIDE_EASE,
        }
    }

    /// Slide back up out of the viewport.
    pub fn exit(duration: Duration) -> Self {
        Self {
            from_percent: 0,
            to_percent: -100,
            duration,
            ease: SLIDE_EASE,
        }
    }
}

/// One rendered frame of the progress overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Caller-supplied style class
    pub class: String,
    /// Rounded percentage
    pub value: u8,
    /// Text shown, e.g. `42%`
    pub label: String,
    /// Entrance animation
    pub enter: SlideTransition,
    /// Exit animation
    pub exit: SlideTransition,
}

/// Something frames can be drawn on.
pub trait Surface {
    /// Draw `frame`, or clear when `None`.
    fn draw(&mut self, frame: Option<&Overlay>);
}

/// Subscribes to the shared progress state and renders it.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    state: Arc<ProgressState>,
    class: String,
}

impl ProgressBar {
    /// Build a bar inside a provider subtree.
    pub fn new(ctx: &ProgressContext, class: impl Into<String>) -> Result<Self> {
        Ok(Self {
            state: ctx.state()?.clone(),
            class: class.into(),
        })
    }

    /// Style class passed at construction.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Render the current state.
    pub fn render(&self) -> Option<Overlay> {
        render_snapshot(
            &self.class,
            self.state.timings().slide_duration(),
            self.state.snapshot(),
        )
    }

    /// Draw a frame on every state change until `cancel` fires or the
    /// provider unmounts.
    pub async fn run<S>(&self, surface: &mut S, cancel: CancellationToken)
    where
        S: Surface + ?Sized,
    {
        let mut rx = self.state.subscribe();
        let slide = self.state.timings().slide_duration();
        let initial = *rx.borrow_and_update();
        surface.draw(render_snapshot(&self.class, slide, initial).as_ref());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.state.unmounted() => {
                    surface.draw(None);
                    break;
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = *rx.borrow_and_update();
                    surface.draw(render_snapshot(&self.class, slide, snapshot).as_ref());
                }
            }
        }
        debug!("Progress bar stopped rendering");
    }
}

/// Pure render: `None` unless loading.
pub fn render_snapshot(class: &str, slide: Duration, snapshot: ProgressSnapshot) -> Option<Overlay> {
    if !snapshot.loading {
        return None;
    }
    Some(Overlay {
        class: class.to_string(),
        value: snapshot.value,
        label: format!("{}%", snapshot.value),
        enter: SlideTransition::enter(slide),
        exit: SlideTransition::exit(slide),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{use_progress, ProgressError, ProgressProvider};
    use waypoint_core::Timings;

    #[derive(Default)]
    struct Recording {
        frames: Vec<Option<Overlay>>,
    }

    impl Surface for Recording {
        fn draw(&mut self, frame: Option<&Overlay>) {
            self.frames.push(frame.cloned());
        }
    }

    #[test]
    fn test_render_idle_is_nothing() {
        let snapshot = ProgressSnapshot { loading: false, value: 0 };
        assert!(render_snapshot("bar", Duration::from_millis(500), snapshot).is_none());
    }

    #[test]
    fn test_render_loading_shows_percentage() {
        let snapshot = ProgressSnapshot { loading: true, value: 42 };
        let overlay = render_snapshot("bar", Duration::from_millis(500), snapshot).unwrap();
        assert_eq!(overlay.label, "42%");
        assert_eq!(overlay.value, 42);
        assert_eq!(overlay.class, "bar");
        assert_eq!(overlay.enter.from_percent, -100);
        assert_eq!(overlay.enter.to_percent, 0);
        assert_eq!(overlay.exit.to_percent, -100);
        assert_eq!(overlay.enter.duration, Duration::from_millis(500));
        assert_eq!(overlay.enter.ease, SLIDE_EASE);
    }

    #[test]
    fn test_bar_requires_provider() {
        let err = ProgressBar::new(&ProgressContext::empty(), "bar").unwrap_err();
        assert_eq!(err, ProgressError::MissingProvider);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bar_follows_state() {
        let provider = ProgressProvider::new(Timings::default());
        let bar = ProgressBar::new(&provider.context(), "overlay").unwrap();
        assert_eq!(bar.class(), "overlay");
        assert!(bar.render().is_none());

        let trigger = use_progress(&provider.context()).unwrap();
        let guard = trigger.start();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let overlay = bar.render().unwrap();
        assert!(overlay.value > 0 && overlay.value < 100);

        drop(guard);
        assert!(bar.render().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_draws_until_cancelled() {
        let provider = ProgressProvider::new(Timings::default());
        let bar = ProgressBar::new(&provider.context(), "overlay").unwrap();
        let trigger = use_progress(&provider.context()).unwrap();
        let cancel = CancellationToken::new();

        let runner = {
            let bar = bar.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut surface = Recording::default();
                bar.run(&mut surface, cancel).await;
                surface
            })
        };

        tokio::time::sleep(Duration::from_millis(1)).await;
        trigger
            .track(tokio::time::sleep(Duration::from_millis(2500)))
            .await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        cancel.cancel();

        let surface = runner.await.unwrap();
        let frames = surface.frames;
        assert!(frames.first().unwrap().is_none());
        assert!(frames.last().unwrap().is_none());
        let values: Vec<u8> = frames.iter().flatten().map(|o| o.value).collect();
        assert!(values.len() > 10);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(values.last().copied(), Some(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_provider_unmounts() {
        let provider = ProgressProvider::new(Timings::default());
        let bar = ProgressBar::new(&provider.context(), "overlay").unwrap();

        let runner = tokio::spawn(async move {
            let mut surface = Recording::default();
            bar.run(&mut surface, CancellationToken::new()).await;
            surface
        });

        tokio::time::sleep(Duration::from_millis(1)).await;
        drop(provider);

        let surface = runner.await.unwrap();
        assert_eq!(surface.frames.last(), Some(&None));
    }
}
