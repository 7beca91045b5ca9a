//! Heuristic navigation loader.
//!
//! Shows a full-screen spinner based only on raw window events:
//!
//! | Event | Treated as | Effect |
//! |---|---|---|
//! | `visibilitychange`, `hashchange` | started | show now |
//! | `popstate` | completed | hide after the grace period |
//! | `beforeunload` | errored | hide now, drop any pending hide |
//!
//! These events only approximate the router's real start/complete/error
//! lifecycle; the loader never talks to the router beyond watching its
//! location to know when to re-subscribe. It is independent of the progress
//! state.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use waypoint_core::{EventKind, ListenerId, Timings};

use crate::router::Router;
use crate::window::Window;

/// Rendered spinner overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Spinner {
    /// Backdrop opacity over the page
    pub backdrop_opacity: f32,
    /// Spinner diameter in pixels
    pub diameter_px: u16,
    /// Ring width in pixels
    pub border_px: u16,
}

impl Default for Spinner {
    fn default() -> Self {
        Self {
            backdrop_opacity: 0.5,
            diameter_px: 64,
            border_px: 4,
        }
    }
}

struct PendingHide {
    generation: u64,
    token: CancellationToken,
}

struct LoaderState {
    is_loading: bool,
    pending: Option<PendingHide>,
    generation: u64,
    listeners: Vec<ListenerId>,
    route_key: String,
    mounted: bool,
}

struct Shared {
    window: Window,
    state: Mutex<LoaderState>,
    tx: watch::Sender<bool>,
    grace: Duration,
    runtime: Handle,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_loading(&self, state: &mut LoaderState, loading: bool) {
        if state.is_loading != loading {
            info!("Navigation loader {}", if loading { "shown" } else { "hidden" });
        }
        state.is_loading = loading;
        self.tx.send_if_modified(|current| {
            let changed = *current != loading;
            *current = loading;
            changed
        });
    }

    fn on_started(&self) {
        let mut state = self.lock();
        if state.mounted {
            self.set_loading(&mut state, true);
        }
    }

    fn on_completed(self: &Arc<Self>) {
        let mut state = self.lock();
        if !state.mounted {
            return;
        }
        if let Some(previous) = state.pending.take() {
            previous.token.cancel();
        }

        state.generation += 1;
        let generation = state.generation;
        let token = CancellationToken::new();
        state.pending = Some(PendingHide {
            generation,
            token: token.clone(),
        });
        debug!("Hiding loader in {:?}", self.grace);

        let weak = Arc::downgrade(self);
        let grace = self.grace;
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(grace) => {
                    if let Some(shared) = weak.upgrade() {
                        shared.finish_grace(generation);
                    }
                }
            }
        });
    }

    fn finish_grace(&self, generation: u64) {
        let mut state = self.lock();
        let current = state.pending.as_ref().map(|p| p.generation);
        if !state.mounted || current != Some(generation) {
            return;
        }
        state.pending = None;
        self.set_loading(&mut state, false);
    }

    fn on_errored(&self) {
        let mut state = self.lock();
        if !state.mounted {
            return;
        }
        if let Some(pending) = state.pending.take() {
            pending.token.cancel();
        }
        self.set_loading(&mut state, false);
    }

    fn attach(self: &Arc<Self>) -> Vec<ListenerId> {
        EventKind::ALL
            .iter()
            .map(|&kind| {
                let weak: Weak<Shared> = Arc::downgrade(self);
                self.window.add_listener(kind, move |event| {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    match event.kind {
                        EventKind::VisibilityChange | EventKind::HashChange => shared.on_started(),
                        EventKind::PopState => shared.on_completed(),
                        EventKind::BeforeUnload => shared.on_errored(),
                    }
                })
            })
            .collect()
    }

    fn detach(&self, listeners: &[ListenerId]) {
        for id in listeners {
            self.window.remove_listener(*id);
        }
    }

    fn resubscribe(self: &Arc<Self>, route_key: String) {
        if let Some(stale) = self.swap_listeners(route_key) {
            self.detach(&stale);
        }
    }

    /// Attach a fresh listener set for `route_key` and return the one it
    /// replaces. Both sets stay registered until the caller detaches the old
    /// one, so no event falls between them.
    fn swap_listeners(self: &Arc<Self>, route_key: String) -> Option<Vec<ListenerId>> {
        {
            let state = self.lock();
            if !state.mounted || state.route_key == route_key {
                return None;
            }
        }
        let fresh = self.attach();

        let mut state = self.lock();
        if !state.mounted {
            drop(state);
            self.detach(&fresh);
            return None;
        }
        state.route_key = route_key;
        debug!("Loader re-subscribed for {}", state.route_key);
        Some(std::mem::replace(&mut state.listeners, fresh))
    }

    fn teardown(&self) {
        let (listeners, pending) = {
            let mut state = self.lock();
            if !state.mounted {
                return;
            }
            state.mounted = false;
            (std::mem::take(&mut state.listeners), state.pending.take())
        };
        if let Some(pending) = pending {
            pending.token.cancel();
        }
        self.detach(&listeners);
        debug!("Navigation loader unmounted");
    }
}

/// A mounted navigation loader.
///
/// Dropping it (or calling [`NavigationLoader::unmount`]) removes all four
/// listeners, cancels any pending hide and stops watching the router.
pub struct NavigationLoader {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    watcher: JoinHandle<()>,
}

impl NavigationLoader {
    /// Mount on `window`, re-subscribing whenever the router's path or query
    /// changes.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn mount(window: Window, router: Arc<dyn Router>, timings: &Timings) -> Self {
        let mut locations = router.subscribe();
        let route_key = locations.borrow_and_update().route_key();
        let (tx, _rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            window,
            state: Mutex::new(LoaderState {
                is_loading: false,
                pending: None,
                generation: 0,
                listeners: Vec::new(),
                route_key,
                mounted: true,
            }),
            tx,
            grace: timings.loader_grace(),
            runtime: Handle::current(),
        });
        let listeners = shared.attach();
        shared.lock().listeners = listeners;

        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let weak = Arc::downgrade(&shared);
        let watcher = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    changed = locations.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let key = locations.borrow_and_update().route_key();
                        match weak.upgrade() {
                            Some(shared) => shared.resubscribe(key),
                            None => break,
                        }
                    }
                }
            }
        });

        debug!("Navigation loader mounted");
        Self {
            shared,
            cancel,
            watcher,
        }
    }

    /// Whether the spinner is showing.
    pub fn is_loading(&self) -> bool {
        self.shared.lock().is_loading
    }

    /// Whether a delayed hide is scheduled.
    pub fn has_pending_hide(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    /// Observe `is_loading` changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.tx.subscribe()
    }

    /// Listener ids currently registered on the window.
    pub fn listeners(&self) -> Vec<ListenerId> {
        self.shared.lock().listeners.clone()
    }

    /// Spinner while loading, nothing otherwise.
    pub fn render(&self) -> Option<Spinner> {
        self.is_loading().then(Spinner::default)
    }

    /// Unmount explicitly.
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for NavigationLoader {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.watcher.abort();
        self.shared.teardown();
    }
}

impl std::fmt::Debug for NavigationLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationLoader")
            .field("is_loading", &self.is_loading())
            .field("pending_hide", &self.has_pending_hide())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::MemoryRouter;
    use waypoint_core::{Href, Location};

    fn setup() -> (Window, Arc<MemoryRouter>, NavigationLoader) {
        let window = Window::new();
        let router = Arc::new(MemoryRouter::new(Location::root(), window.clone()));
        let loader = NavigationLoader::mount(window.clone(), router.clone(), &Timings::default());
        (window, router, loader)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_registers_four_listeners() {
        let (window, _router, loader) = setup();
        for kind in EventKind::ALL {
            assert_eq!(window.listener_count(kind), 1);
        }
        assert_eq!(loader.listeners().len(), 4);
        assert!(!loader.is_loading());
        assert!(loader.render().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_events_show_immediately() {
        let (window, _router, loader) = setup();
        window.dispatch(EventKind::HashChange);
        assert!(loader.is_loading());
        assert_eq!(loader.render(), Some(Spinner::default()));

        let (window, _router, loader) = setup();
        window.set_hidden(true);
        assert!(loader.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_hides_after_full_grace_period() {
        let (window, _router, loader) = setup();
        window.dispatch(EventKind::HashChange);
        advance(500).await;
        window.dispatch(EventKind::PopState);
        assert!(loader.has_pending_hide());

        advance(1999).await;
        assert!(loader.is_loading());

        advance(2).await;
        assert!(!loader.is_loading());
        assert!(!loader.has_pending_hide());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_pop_restarts_grace() {
        let (window, _router, loader) = setup();
        window.dispatch(EventKind::HashChange);
        window.dispatch(EventKind::PopState);
        advance(1500).await;
        window.dispatch(EventKind::PopState);

        advance(1000).await;
        assert!(loader.is_loading());
        advance(1001).await;
        assert!(!loader.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unload_hides_now_and_cancels_grace() {
        let (window, _router, loader) = setup();
        window.dispatch(EventKind::HashChange);
        window.dispatch(EventKind::PopState);
        advance(300).await;

        window.before_unload();
        assert!(!loader.is_loading());
        assert!(!loader.has_pending_hide());

        window.dispatch(EventKind::HashChange);
        advance(5000).await;
        assert!(loader.is_loading(), "cancelled grace timer must not hide a later cycle");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_mid_grace_leaves_nothing_behind() {
        let (window, _router, loader) = setup();
        let mut rx = loader.subscribe();
        window.dispatch(EventKind::HashChange);
        window.dispatch(EventKind::PopState);
        assert!(*rx.borrow_and_update());
        advance(500).await;

        loader.unmount();
        assert_eq!(window.total_listeners(), 0);

        window.dispatch(EventKind::BeforeUnload);
        advance(5000).await;
        assert!(!rx.has_changed().unwrap_or(false));
        assert!(*rx.borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_change_resubscribes_and_keeps_grace() {
        let (window, router, loader) = setup();
        let before = loader.listeners();

        window.dispatch(EventKind::HashChange);
        window.dispatch(EventKind::PopState);
        router.push(&Href::from("/about?tab=2")).await.unwrap();
        advance(1).await;

        let after = loader.listeners();
        assert_eq!(after.len(), 4);
        assert!(before.iter().all(|id| !after.contains(id)));
        assert_eq!(window.total_listeners(), 4);

        advance(2000).await;
        assert!(!loader.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_overlaps_old_and_new_listeners() {
        let (window, _router, loader) = setup();
        let before = loader.listeners();

        let stale = loader.shared.swap_listeners("/about?".to_string()).unwrap();
        assert_eq!(stale, before);
        assert_eq!(window.total_listeners(), 8);

        window.dispatch(EventKind::HashChange);
        assert!(loader.is_loading());
        window.dispatch(EventKind::BeforeUnload);
        assert!(!loader.is_loading());

        loader.shared.detach(&stale);
        assert_eq!(window.total_listeners(), 4);
        assert!(loader.shared.swap_listeners("/about?".to_string()).is_none());

        window.dispatch(EventKind::VisibilityChange);
        assert!(loader.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hash_only_change_keeps_subscription() {
        let (_window, router, loader) = setup();
        let before = loader.listeners();

        router.push(&Href::from("/#section")).await.unwrap();
        advance(1).await;

        assert_eq!(loader.listeners(), before);
        assert!(loader.is_loading(), "hashchange fired by the router shows the spinner");
    }

    #[tokio::test(start_paused = true)]
    async fn test_router_back_is_treated_as_completion() {
        let (_window, router, loader) = setup();
        router.push(&Href::from("/about")).await.unwrap();
        router.push(&Href::from("/about#team")).await.unwrap();
        assert!(loader.is_loading());

        router.back();
        advance(2001).await;
        assert!(!loader.is_loading());
    }
}
