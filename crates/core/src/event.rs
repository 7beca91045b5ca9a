//! Browser lifecycle events - the raw signals the navigation loader listens to.

use crate::Time;
use serde::{Deserialize, Serialize};

/// The four window-level events the loader heuristic subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Page visibility toggled
    VisibilityChange,
    /// Fragment of the URL changed
    HashChange,
    /// History entry was popped (back/forward)
    PopState,
    /// Document is about to unload
    BeforeUnload,
}

impl EventKind {
    /// All kinds, in registration order.
    pub const ALL: [EventKind; 4] = [
        EventKind::VisibilityChange,
        EventKind::HashChange,
        EventKind::PopState,
        EventKind::BeforeUnload,
    ];

    /// DOM event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::VisibilityChange => "visibilitychange",
            EventKind::HashChange => "hashchange",
            EventKind::PopState => "popstate",
            EventKind::BeforeUnload => "beforeunload",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "visibilitychange" | "visibility" => Ok(EventKind::VisibilityChange),
            "hashchange" | "hash" => Ok(EventKind::HashChange),
            "popstate" | "pop" => Ok(EventKind::PopState),
            "beforeunload" | "unload" => Ok(EventKind::BeforeUnload),
            other => Err(format!("unknown event kind: {}", other)),
        }
    }
}

/// A dispatched event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEvent {
    /// What fired
    pub kind: EventKind,

    /// When it fired
    pub timestamp: Time,
}

impl BrowserEvent {
    /// Create an event stamped with the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: chrono::Utc::now(),
        }
    }
}
