//! Waypoint core vocabulary.
//!
//! Identifiers, locations, browser lifecycle events and timing
//! configuration shared by the progress and navigation crates.

#![warn(missing_docs)]

// Core identities
mod id;

// Navigation vocabulary
mod location;
mod event;

// Configuration
mod config;

// Re-exports
pub use id::*;
pub use location::{Href, Location, LocationError};
pub use event::{BrowserEvent, EventKind};
pub use config::{ConfigError, Timings};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
