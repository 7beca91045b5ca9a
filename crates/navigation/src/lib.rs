//! Navigation side of Waypoint.
//!
//! The [`Router`] collaborator and an in-memory history, a [`Window`] event
//! target, the [`TransitionLink`] that drives the progress indicator before
//! navigating, and the independent, event-driven [`NavigationLoader`].

#![warn(missing_docs)]

pub mod window;
pub mod router;
pub mod link;
pub mod loader;
pub mod menu;

pub use window::{Listener, Window};
pub use router::{HistoryEntry, MemoryRouter, NavigationError, NavigationMode, Result, Router};
pub use link::{ClickEvent, NavigationOutcome, TransitionLink};
pub use loader::{NavigationLoader, Spinner};
pub use menu::{NavMenu, MENU_ITEMS};
