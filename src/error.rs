//! Error types for objwire.

use std::fmt;

use thiserror::Error;

use crate::identity::Identity;
use crate::protocol::OperationId;

/// Target of a request that could not be dispatched.
///
/// Carried by the `not_found` family of errors and marshaled into the
/// corresponding reply statuses so the caller can tell exactly which
/// identity, facet, and operation failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    /// Identity the request addressed.
    pub identity: Identity,
    /// Facet the request addressed, if any.
    pub facet: Option<String>,
    /// Operation the request tried to invoke.
    pub operation: OperationId,
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "identity `{}`", self.identity)?;
        if let Some(facet) = &self.facet {
            write!(f, ", facet `{facet}`")?;
        }
        write!(f, ", operation `{}`", self.operation)
    }
}

/// Main error type for all objwire operations.
#[derive(Debug, Error)]
pub enum ObjwireError {
    /// Malformed or truncated input at any codec layer.
    ///
    /// Recoverable at the message boundary: the current message is
    /// rejected, the connection may continue.
    #[error("unmarshal error: {0}")]
    Unmarshal(String),

    /// Header magic bytes did not match. Fatal to the connection:
    /// no further bytes from this peer can be trusted.
    #[error("invalid magic number: {0:02x?}")]
    InvalidMagicNumber([u8; 4]),

    /// Header declared a protocol version this core does not speak.
    #[error("unsupported protocol version {0}.{1}")]
    UnsupportedProtocol(u8, u8),

    /// Header or encapsulation declared an unknown encoding version.
    #[error("unsupported encoding version {0}.{1}")]
    UnsupportedEncoding(u8, u8),

    /// Header declared a body larger than the configured maximum.
    #[error("message size {size} exceeds maximum {max}")]
    MessageTooLarge {
        /// Declared body size.
        size: u32,
        /// Configured maximum.
        max: u32,
    },

    /// Protocol violation outside the codec layers (bad registration,
    /// a reply handed to the dispatch engine, etc.).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No servant is registered under the requested identity.
    #[error("no object: {0}")]
    NoObject(RequestFailure),

    /// The identity exists but the requested facet does not.
    #[error("no facet: {0}")]
    NoFacet(RequestFailure),

    /// Identity and facet resolved but the operation is not implemented
    /// anywhere in the servant's interface hierarchy.
    #[error("no operation: {0}")]
    NoOperation(RequestFailure),

    /// The peer reported a dispatch failure outside the declared contract
    /// (the `unknown_exception` reply status, seen caller-side).
    #[error("unknown exception: {0}")]
    UnknownException(String),
}

impl ObjwireError {
    /// Shorthand for an [`ObjwireError::Unmarshal`] with a formatted reason.
    pub(crate) fn unmarshal(reason: impl Into<String>) -> Self {
        ObjwireError::Unmarshal(reason.into())
    }
}

/// Result type alias using ObjwireError.
pub type Result<T> = std::result::Result<T, ObjwireError>;
