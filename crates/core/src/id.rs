//! Unique identifiers for Waypoint runtime objects.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifies one in-flight progress interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimationId(Ulid);

impl AnimationId {
    /// Generate a new AnimationId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AnimationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AnimationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies a listener registered on a window event target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(Ulid);

impl ListenerId {
    /// Generate a new ListenerId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies one optimistic transition scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionId(Ulid);

impl TransitionId {
    /// Generate a new TransitionId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TransitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for TransitionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
