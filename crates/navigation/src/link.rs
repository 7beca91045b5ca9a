//! Transition link.
//!
//! A link that, when activated, suppresses the default navigation, starts a
//! progress cycle, waits an artificial delay and only then navigates. The
//! delay stands in for real page latency so that the progress indicator has
//! something to show; a production build would drop it and let the router's
//! own latency drive the cycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use waypoint_core::{Href, Location, Timings};
use waypoint_progress::{use_progress, ProgressContext, ProgressTrigger};

use crate::router::{NavigationError, NavigationMode, Router};

/// Activation event delivered to a link.
#[derive(Debug, Clone, Default)]
pub struct ClickEvent {
    default_prevented: bool,
}

impl ClickEvent {
    /// A fresh click.
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress the control's built-in navigation.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Whether built-in navigation was suppressed.
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// How a link transition ended.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    /// A new history entry was added
    Pushed(Location),
    /// The current history entry was overwritten
    Replaced(Location),
    /// The router refused; nothing changed
    Failed(NavigationError),
}

impl NavigationOutcome {
    /// Whether the router navigated.
    pub fn is_navigated(&self) -> bool {
        !matches!(self, NavigationOutcome::Failed(_))
    }
}

/// Link that drives the progress indicator before navigating.
#[derive(Clone)]
pub struct TransitionLink {
    href: Href,
    mode: NavigationMode,
    label: String,
    attributes: BTreeMap<String, String>,
    trigger: ProgressTrigger,
    router: Arc<dyn Router>,
    delay: Duration,
}

impl TransitionLink {
    /// Build a link. Fails if `ctx` has no progress provider.
    pub fn new(
        ctx: &ProgressContext,
        router: Arc<dyn Router>,
        href: impl Into<Href>,
        timings: &Timings,
    ) -> waypoint_progress::Result<Self> {
        let trigger = use_progress(ctx)?;
        let href = href.into();
        Ok(Self {
            label: href.to_string(),
            href,
            mode: NavigationMode::Push,
            attributes: BTreeMap::new(),
            trigger,
            router,
            delay: timings.link_delay(),
        })
    }

    /// Overwrite the current history entry instead of adding one.
    pub fn replace(mut self, replace: bool) -> Self {
        self.mode = if replace {
            NavigationMode::Replace
        } else {
            NavigationMode::Push
        };
        self
    }

    /// Visible text.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Pass-through attribute for the underlying control.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Destination.
    pub fn href(&self) -> &Href {
        &self.href
    }

    /// Push or replace.
    pub fn mode(&self) -> NavigationMode {
        self.mode
    }

    /// Visible text.
    pub fn text(&self) -> &str {
        &self.label
    }

    /// Pass-through attributes.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Handle activation.
    ///
    /// Progress starts before this returns; navigation is issued only after
    /// the delay. The spawned transition is not cancelled if the caller goes
    /// away, and failures are reported through the outcome only.
    pub fn activate(&self, event: &mut ClickEvent) -> JoinHandle<NavigationOutcome> {
        event.prevent_default();

        let router = self.router.clone();
        let href = self.href.clone();
        let mode = self.mode;
        let delay = self.delay;
        debug!("Link to {} activated ({:?}, delay {:?})", href, mode, delay);

        self.trigger.transition(async move {
            tokio::time::sleep(delay).await;
            match router.navigate(&href, mode).await {
                Ok(location) => match mode {
                    NavigationMode::Push => NavigationOutcome::Pushed(location),
                    NavigationMode::Replace => NavigationOutcome::Replaced(location),
                },
                Err(e) => {
                    warn!("Navigation to {} failed: {}", href, e);
                    NavigationOutcome::Failed(e)
                }
            }
        })
    }
}

impl std::fmt::Debug for TransitionLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionLink")
            .field("href", &self.href)
            .field("mode", &self.mode)
            .field("label", &self.label)
            .field("attributes", &self.attributes)
            .field("delay", &self.delay)
            .finish()
    }
}
