//! Location model - where the document currently is, and where a link points.

use serde::{Deserialize, Serialize};

/// Errors raised while parsing a destination.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// Destination was empty
    #[error("destination is empty")]
    Empty,

    /// Destination is not an absolute path
    #[error("destination `{0}` is not an absolute path")]
    NotAbsolute(String),

    /// Destination contains whitespace
    #[error("destination `{0}` contains whitespace")]
    Whitespace(String),
}

/// A raw link destination, as written by the caller.
///
/// An `Href` is not validated on construction; routers parse it into a
/// [`Location`] when the navigation is actually issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Href(String);

impl Href {
    /// Create a new href.
    pub fn new(href: impl Into<String>) -> Self {
        Self(href.into())
    }

    /// Borrow the raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into a location.
    pub fn to_location(&self) -> Result<Location, LocationError> {
        Location::parse(&self.0)
    }
}

impl std::fmt::Display for Href {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Href {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Href {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A parsed document location: `pathname`, `?search` and `#hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Path, always starting with `/`
    pub pathname: String,

    /// Query string without the leading `?`
    pub search: String,

    /// Fragment without the leading `#`
    pub hash: Option<String>,
}

impl Location {
    /// The document root, `/`.
    pub fn root() -> Self {
        Self {
            pathname: "/".to_string(),
            search: String::new(),
            hash: None,
        }
    }

    /// Parse an absolute path with optional query and fragment.
    pub fn parse(href: &str) -> Result<Self, LocationError> {
        if href.is_empty() {
            return Err(LocationError::Empty);
        }
        if href.chars().any(char::is_whitespace) {
            return Err(LocationError::Whitespace(href.to_string()));
        }
        if !href.starts_with('/') || href.starts_with("//") {
            return Err(LocationError::NotAbsolute(href.to_string()));
        }

        let (rest, hash) = match href.split_once('#') {
            Some((rest, hash)) => (rest, Some(hash.to_string())),
            None => (href, None),
        };
        let (pathname, search) = match rest.split_once('?') {
            Some((path, query)) => (path, query.to_string()),
            None => (rest, String::new()),
        };

        Ok(Self {
            pathname: pathname.to_string(),
            search,
            hash,
        })
    }

    /// Key made of path and query. Changes to this key are what observers
    /// treat as a route change; fragment-only changes are not.
    pub fn route_key(&self) -> String {
        format!("{}?{}", self.pathname, self.search)
    }

    /// Whether `other` is the same document and differs only by fragment.
    pub fn differs_only_by_hash(&self, other: &Location) -> bool {
        self.pathname == other.pathname && self.search == other.search && self.hash != other.hash
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::root()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pathname)?;
        if !self.search.is_empty() {
            write!(f, "?{}", self.search)?;
        }
        if let Some(hash) = &self.hash {
            write!(f, "#{}", hash)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Location {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
