//! Window event target.
//!
//! A minimal stand-in for the browser `window`: listeners register per
//! [`EventKind`] and are called synchronously on dispatch.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;
use waypoint_core::{BrowserEvent, EventKind, ListenerId};

/// Listener callback.
pub type Listener = Arc<dyn Fn(&BrowserEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    listeners: Vec<(ListenerId, EventKind, Listener)>,
    hidden: bool,
}

/// Shared event target. Clones refer to the same window.
#[derive(Clone, Default)]
pub struct Window {
    registry: Arc<Mutex<Registry>>,
}

impl Window {
    /// Create a window with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `listener` for `kind`.
    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&BrowserEvent) + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        self.lock().listeners.push((id, kind, Arc::new(listener)));
        trace!("Added {} listener {}", kind, id);
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut registry = self.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(lid, _, _)| *lid != id);
        registry.listeners.len() != before
    }

    /// Listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.lock()
            .listeners
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }

    /// Listeners registered for any kind.
    pub fn total_listeners(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Fire `kind` at every listener registered for it.
    ///
    /// Listeners are called after the registry lock is released, so they may
    /// add or remove listeners themselves.
    pub fn dispatch(&self, kind: EventKind) {
        let event = BrowserEvent::new(kind);
        let targets: Vec<Listener> = self
            .lock()
            .listeners
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, l)| l.clone())
            .collect();
        trace!("Dispatching {} to {} listeners", kind, targets.len());
        for listener in targets {
            listener(&event);
        }
    }

    /// Change page visibility; fires `visibilitychange` when it flips.
    pub fn set_hidden(&self, hidden: bool) {
        let changed = {
            let mut registry = self.lock();
            let changed = registry.hidden != hidden;
            registry.hidden = hidden;
            changed
        };
        if changed {
            self.dispatch(EventKind::VisibilityChange);
        }
    }

    /// Whether the page is hidden.
    pub fn is_hidden(&self) -> bool {
        self.lock().hidden
    }

    /// Fire `beforeunload`.
    pub fn before_unload(&self) {
        self.dispatch(EventKind::BeforeUnload);
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("listeners", &self.total_listeners())
            .field("hidden", &self.is_hidden())
            .finish()
    }
}
