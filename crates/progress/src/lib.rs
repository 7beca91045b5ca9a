//! Navigation progress indication.
//!
//! One [`ProgressState`] per [`ProgressProvider`], a trigger API for any
//! component that starts slow work, and a [`ProgressBar`] view that renders
//! the simulated percentage while a cycle is active.
//!
//! The percentage is time-based. It reaches 100 after a fixed span no
//! matter how long the real work takes.

#![warn(missing_docs)]

pub mod animation;
pub mod state;
pub mod provider;
pub mod view;

pub use animation::{AnimationHandle, Easing, Interpolation, MIN_FRAME};
pub use state::{ProgressGuard, ProgressSnapshot, ProgressState, PROGRESS_MAX};
pub use provider::{use_progress, ProgressContext, ProgressError, ProgressProvider, ProgressTrigger, Result};
pub use view::{render_snapshot, Overlay, ProgressBar, SlideTransition, Surface, SLIDE_EASE};
