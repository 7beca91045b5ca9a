//! Router abstraction and an in-memory history implementation.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};
use waypoint_core::{EventKind, Href, Location, LocationError, Time};

use crate::window::Window;

/// Error type for navigation operations.
pub type Result<T> = std::result::Result<T, NavigationError>;

/// Errors that can occur while navigating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// The destination could not be parsed
    #[error("invalid destination `{href}`: {source}")]
    InvalidDestination {
        /// Raw destination
        href: String,
        /// Why it was refused
        #[source]
        source: LocationError,
    },

    /// The router refused the destination
    #[error("navigation to `{0}` was rejected")]
    Rejected(String),
}

/// How a navigation affects the history stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// Append a new entry
    Push,
    /// Overwrite the current entry
    Replace,
}

/// Router collaborator.
///
/// This trait allows different navigation backends to be plugged in.
#[async_trait]
pub trait Router: Send + Sync {
    /// Current location.
    fn location(&self) -> Location;

    /// Observe location changes.
    fn subscribe(&self) -> watch::Receiver<Location>;

    /// Navigate by appending a history entry.
    async fn push(&self, href: &Href) -> Result<Location>;

    /// Navigate by overwriting the current history entry.
    async fn replace(&self, href: &Href) -> Result<Location>;

    /// Navigate with the given mode.
    async fn navigate(&self, href: &Href, mode: NavigationMode) -> Result<Location> {
        match mode {
            NavigationMode::Push => self.push(href).await,
            NavigationMode::Replace => self.replace(href).await,
        }
    }
}

/// One history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Where
    pub location: Location,
    /// When the entry was written
    pub visited_at: Time,
}

impl HistoryEntry {
    fn new(location: Location) -> Self {
        Self {
            location,
            visited_at: chrono::Utc::now(),
        }
    }
}

struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    rejected: HashSet<String>,
}

/// Session history kept in memory.
///
/// Mirrors browser semantics: `push`/`replace` never fire `popstate`,
/// `back`/`forward` do, and a navigation that only changes the fragment fires
/// `hashchange`.
pub struct MemoryRouter {
    history: Mutex<History>,
    tx: watch::Sender<Location>,
    window: Window,
}

impl MemoryRouter {
    /// Start at `initial`, dispatching events on `window`.
    pub fn new(initial: Location, window: Window) -> Self {
        let (tx, _rx) = watch::channel(initial.clone());
        Self {
            history: Mutex::new(History {
                entries: vec![HistoryEntry::new(initial)],
                cursor: 0,
                rejected: HashSet::new(),
            }),
            tx,
            window,
        }
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Refuse every future navigation to `pathname`.
    pub fn reject(&self, pathname: impl Into<String>) {
        self.lock().rejected.insert(pathname.into());
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().entries.clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Always false: history starts with one entry.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Index of the current entry.
    pub fn cursor(&self) -> usize {
        self.lock().cursor
    }

    /// The window this router dispatches on.
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Go back one entry. Fires `popstate`.
    pub fn back(&self) -> Option<Location> {
        self.traverse(-1)
    }

    /// Go forward one entry. Fires `popstate`.
    pub fn forward(&self) -> Option<Location> {
        self.traverse(1)
    }

    fn traverse(&self, delta: isize) -> Option<Location> {
        let location = {
            let mut history = self.lock();
            let target = history.cursor.checked_add_signed(delta)?;
            if target >= history.entries.len() {
                return None;
            }
            history.cursor = target;
            history.entries[target].location.clone()
        };
        debug!("History traversal to {}", location);
        self.tx.send_replace(location.clone());
        self.window.dispatch(EventKind::PopState);
        Some(location)
    }

    fn resolve(&self, href: &Href) -> Result<Location> {
        let location = href
            .to_location()
            .map_err(|source| NavigationError::InvalidDestination {
                href: href.to_string(),
                source,
            })?;
        if self.lock().rejected.contains(&location.pathname) {
            return Err(NavigationError::Rejected(href.to_string()));
        }
        Ok(location)
    }

    fn commit(&self, location: Location, mode: NavigationMode) -> Location {
        let hash_only = {
            let mut history = self.lock();
            let current = history.entries[history.cursor].location.clone();
            let entry = HistoryEntry::new(location.clone());
            match mode {
                NavigationMode::Push => {
                    let keep = history.cursor + 1;
                    history.entries.truncate(keep);
                    history.entries.push(entry);
                    history.cursor = keep;
                }
                NavigationMode::Replace => {
                    let cursor = history.cursor;
                    history.entries[cursor] = entry;
                }
            }
            current.differs_only_by_hash(&location)
        };

        info!("Navigated ({:?}) to {}", mode, location);
        self.tx.send_replace(location.clone());
        if hash_only {
            self.window.dispatch(EventKind::HashChange);
        }
        location
    }
}

#[async_trait]
impl Router for MemoryRouter {
    fn location(&self) -> Location {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Location> {
        self.tx.subscribe()
    }

    async fn push(&self, href: &Href) -> Result<Location> {
        let location = self.resolve(href)?;
        Ok(self.commit(location, NavigationMode::Push))
    }

    async fn replace(&self, href: &Href) -> Result<Location> {
        let location = self.resolve(href)?;
        Ok(self.commit(location, NavigationMode::Replace))
    }
}

impl std::fmt::Debug for MemoryRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRouter")
            .field("location", &self.location())
            .field("entries", &self.len())
            .field("cursor", &self.cursor())
            .finish()
    }
}
