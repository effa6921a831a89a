//! Servant identity.
//!
//! An [`Identity`] is the opaque key a request addresses: a category plus a
//! name. Identities are immutable once constructed and compared by value.
//! The empty identity is a valid *value* (it decodes and re-encodes) but is
//! never dispatchable.

use std::fmt;

use uuid::Uuid;

use crate::buffer::{IncomingCursor, OutgoingBuffer};
use crate::error::Result;

/// Key under which a servant is registered and addressed.
///
/// # Example
///
/// ```
/// use objwire::Identity;
///
/// let id = Identity::new("printers", "front-desk");
/// assert_eq!(id.category(), "printers");
/// assert_eq!(id.name(), "front-desk");
/// assert_eq!(id.to_string(), "printers/front-desk");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    category: String,
    name: String,
}

impl Identity {
    /// Create an identity from a category and a name.
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }

    /// Create an identity with an empty category.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    /// Create an identity with a random (UUID v4) name and empty category.
    pub fn random() -> Self {
        Self::named(Uuid::new_v4().to_string())
    }

    /// The category, possibly empty.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// The name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether both parts are empty. The empty identity cannot be
    /// registered or dispatched.
    pub fn is_empty(&self) -> bool {
        self.category.is_empty() && self.name.is_empty()
    }

    /// Wire layout: category string, then name string.
    pub(crate) fn marshal(&self, out: &mut OutgoingBuffer) {
        out.write_string(&self.category);
        out.write_string(&self.name);
    }

    pub(crate) fn unmarshal(cursor: &mut IncomingCursor<'_>) -> Result<Self> {
        let category = cursor.read_string()?;
        let name = cursor.read_string()?;
        Ok(Self { category, name })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.category.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.category, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Identity::new("cat", "obj").to_string(), "cat/obj");
        assert_eq!(Identity::named("obj").to_string(), "obj");
    }

    #[test]
    fn test_empty_identity() {
        assert!(Identity::new("", "").is_empty());
        assert!(!Identity::named("x").is_empty());
        assert!(!Identity::new("x", "").is_empty());
    }

    #[test]
    fn test_random_identities_are_distinct() {
        let a = Identity::random();
        let b = Identity::random();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn test_marshal_roundtrip() {
        let id = Identity::new("widgets", "w-17");

        let mut out = OutgoingBuffer::new();
        id.marshal(&mut out);
        let bytes = out.into_bytes();

        let mut cursor = IncomingCursor::new(&bytes);
        let decoded = Identity::unmarshal(&mut cursor).unwrap();
        assert_eq!(decoded, id);
        assert_eq!(cursor.remaining(), 0);
    }
}
