//! Protocol messages and their bodies.
//!
//! A [`Message`] is a validated header plus an opaque body. Request and
//! reply bodies are parsed on demand into [`Request`] and [`Reply`], which
//! encode back through the same buffer model. Argument and result payloads
//! stay inside self-delimiting encapsulations so a recipient can skip what
//! it does not understand.

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::buffer::{IncomingCursor, OutgoingBuffer};
use crate::error::{ObjwireError, RequestFailure, Result};
use crate::identity::Identity;
use crate::value::name_hash;

use super::header::{MessageHeader, MessageKind, HEADER_SIZE};

/// A complete protocol message: header plus body bytes.
#[derive(Debug, Clone)]
pub struct Message {
    /// Decoded, validated header.
    pub header: MessageHeader,
    /// Body bytes (zero-copy via `bytes::Bytes`).
    pub body: Bytes,
}

impl Message {
    /// Create a message of the given kind around a body.
    pub fn new(kind: MessageKind, body: Bytes) -> Self {
        Self {
            header: MessageHeader::new(kind, body.len() as u32),
            body,
        }
    }

    /// Connection-validation message (empty body), sent by a server when a
    /// connection is established.
    pub fn validate_connection() -> Self {
        Self::new(MessageKind::Validate, Bytes::new())
    }

    /// Graceful connection-close message (empty body).
    pub fn close_connection() -> Self {
        Self::new(MessageKind::Close, Bytes::new())
    }

    /// Message kind.
    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.header.kind
    }

    /// Encode header and body into one contiguous byte sequence.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.body.len());
        buf.extend_from_slice(&self.header.encode());
        buf.extend_from_slice(&self.body);
        buf.freeze()
    }
}

/// Invocation mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperationMode {
    /// Default: at-most-once semantics.
    Normal = 0,
    /// Safe to retry; the transport may re-send without bookkeeping.
    Idempotent = 1,
}

impl TryFrom<u8> for OperationMode {
    type Error = ObjwireError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(OperationMode::Normal),
            1 => Ok(OperationMode::Idempotent),
            other => Err(ObjwireError::unmarshal(format!(
                "unknown operation mode {other}"
            ))),
        }
    }
}

const OP_ID_NAME: u8 = 0;
const OP_ID_HASH: u8 = 1;

/// Operation identifier: a name, or the 64-bit hash of one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationId {
    /// Operation by name.
    Name(String),
    /// Operation by hashed name ([`name_hash`]).
    Hash(u64),
}

impl OperationId {
    /// The hashed form, computing it for named operations.
    pub fn hash(&self) -> u64 {
        match self {
            OperationId::Name(name) => name_hash(name),
            OperationId::Hash(hash) => *hash,
        }
    }

    fn marshal(&self, out: &mut OutgoingBuffer) {
        match self {
            OperationId::Name(name) => {
                out.write_u8(OP_ID_NAME);
                out.write_string(name);
            }
            OperationId::Hash(hash) => {
                out.write_u8(OP_ID_HASH);
                out.write_u64(*hash);
            }
        }
    }

    fn unmarshal(cursor: &mut IncomingCursor<'_>) -> Result<Self> {
        match cursor.read_u8()? {
            OP_ID_NAME => Ok(OperationId::Name(cursor.read_string()?)),
            OP_ID_HASH => Ok(OperationId::Hash(cursor.read_u64()?)),
            other => Err(ObjwireError::unmarshal(format!(
                "unknown operation id tag {other}"
            ))),
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationId::Name(name) => f.write_str(name),
            OperationId::Hash(hash) => write!(f, "{hash:#018x}"),
        }
    }
}

fn marshal_facet(out: &mut OutgoingBuffer, facet: Option<&str>) {
    match facet {
        Some(facet) => {
            out.write_bool(true);
            out.write_string(facet);
        }
        None => out.write_bool(false),
    }
}

/// Read a complete encapsulation (size field included) as raw bytes.
fn read_encapsulation_bytes(cursor: &mut IncomingCursor<'_>, body: &[u8]) -> Result<Bytes> {
    let start = cursor.position();
    let size = cursor.read_u32()? as usize;
    if size < 2 || size > cursor.remaining() {
        return Err(ObjwireError::unmarshal(format!(
            "encapsulation of declared size {size} does not fit the body"
        )));
    }
    cursor.skip(size)?;
    Ok(Bytes::copy_from_slice(&body[start..start + 4 + size]))
}

/// An empty argument/result encapsulation.
pub fn empty_encapsulation() -> Bytes {
    let mut out = OutgoingBuffer::with_capacity(6);
    out.begin_encapsulation().end();
    out.into_bytes()
}

/// A decoded invocation request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Correlation key; 0 marks a one-way request that never gets a reply.
    pub request_id: u32,
    /// Target servant identity.
    pub identity: Identity,
    /// Target facet, if the caller addressed one.
    pub facet: Option<String>,
    /// Operation to invoke.
    pub operation: OperationId,
    /// Invocation mode.
    pub mode: OperationMode,
    /// Argument encapsulation, exactly as received (size field included).
    pub args: Bytes,
}

impl Request {
    /// Whether this request expects no reply.
    #[inline]
    pub fn is_oneway(&self) -> bool {
        self.request_id == 0
    }

    /// Encode the request body.
    pub fn encode_body(&self) -> Bytes {
        let mut out = OutgoingBuffer::with_capacity(32 + self.args.len());
        out.write_u32(self.request_id);
        self.identity.marshal(&mut out);
        marshal_facet(&mut out, self.facet.as_deref());
        self.operation.marshal(&mut out);
        out.write_u8(self.mode as u8);
        out.write_raw(&self.args);
        out.into_bytes()
    }

    /// Wrap the encoded body in a framed request message.
    pub fn to_message(&self) -> Message {
        Message::new(MessageKind::Request, self.encode_body())
    }

    /// Decode a request body.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let mut cursor = IncomingCursor::new(body);
        let request_id = cursor.read_u32()?;
        let identity = Identity::unmarshal(&mut cursor)?;
        let facet = cursor.read_optional(|c| c.read_string())?;
        let operation = OperationId::unmarshal(&mut cursor)?;
        let mode = OperationMode::try_from(cursor.read_u8()?)?;
        let args = read_encapsulation_bytes(&mut cursor, body)?;
        Ok(Self {
            request_id,
            identity,
            facet,
            operation,
            mode,
            args,
        })
    }
}

/// Outcome carried by a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyStatus {
    /// Operation completed; body is the result encapsulation.
    Ok = 0,
    /// Servant raised a declared exception; body is its encapsulation.
    UserException = 1,
    /// No servant under the requested identity.
    NoObject = 2,
    /// Identity exists, facet does not.
    NoFacet = 3,
    /// Identity and facet exist, operation does not.
    NoOperation = 4,
    /// Dispatch failed for an undeclared reason; body is a reason string.
    UnknownException = 5,
    /// The request could not be decoded; body is a reason string.
    UnmarshalError = 6,
}

impl TryFrom<u8> for ReplyStatus {
    type Error = ObjwireError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ReplyStatus::Ok),
            1 => Ok(ReplyStatus::UserException),
            2 => Ok(ReplyStatus::NoObject),
            3 => Ok(ReplyStatus::NoFacet),
            4 => Ok(ReplyStatus::NoOperation),
            5 => Ok(ReplyStatus::UnknownException),
            6 => Ok(ReplyStatus::UnmarshalError),
            other => Err(ObjwireError::unmarshal(format!(
                "unknown reply status {other}"
            ))),
        }
    }
}

/// Status-dependent payload of a reply.
#[derive(Debug, Clone)]
pub enum ReplyBody {
    /// Result (or user exception) encapsulation, size field included.
    Results(Bytes),
    /// Which target failed to resolve, for the `not_found` statuses.
    Failure(RequestFailure),
    /// Reason string for unknown-exception and unmarshal-error statuses.
    Reason(String),
}

/// A decoded reply.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Correlation key matching the request.
    pub request_id: u32,
    /// Outcome.
    pub status: ReplyStatus,
    /// Status-dependent payload.
    pub body: ReplyBody,
}

impl Reply {
    /// Successful reply carrying a result encapsulation.
    pub fn ok(request_id: u32, results: Bytes) -> Self {
        Self {
            request_id,
            status: ReplyStatus::Ok,
            body: ReplyBody::Results(results),
        }
    }

    /// Reply carrying a marshaled user exception.
    pub fn user_exception(request_id: u32, exception: Bytes) -> Self {
        Self {
            request_id,
            status: ReplyStatus::UserException,
            body: ReplyBody::Results(exception),
        }
    }

    /// `not_found`-family reply.
    pub fn not_found(request_id: u32, status: ReplyStatus, failure: RequestFailure) -> Self {
        debug_assert!(matches!(
            status,
            ReplyStatus::NoObject | ReplyStatus::NoFacet | ReplyStatus::NoOperation
        ));
        Self {
            request_id,
            status,
            body: ReplyBody::Failure(failure),
        }
    }

    /// Reply for a dispatch that failed outside the declared contract.
    pub fn unknown_exception(request_id: u32, reason: impl Into<String>) -> Self {
        Self {
            request_id,
            status: ReplyStatus::UnknownException,
            body: ReplyBody::Reason(reason.into()),
        }
    }

    /// Reply for a request whose payload could not be decoded.
    pub fn unmarshal_failure(request_id: u32, reason: impl Into<String>) -> Self {
        Self {
            request_id,
            status: ReplyStatus::UnmarshalError,
            body: ReplyBody::Reason(reason.into()),
        }
    }

    /// Result encapsulation, when the status carries one.
    pub fn result_encapsulation(&self) -> Option<&Bytes> {
        match &self.body {
            ReplyBody::Results(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Map a failure status back to the typed error a caller propagates.
    ///
    /// `Ok` and `UserException` return `None`: a user exception is data the
    /// caller decodes from the result encapsulation, not a transport fault.
    pub fn to_error(&self) -> Option<ObjwireError> {
        match (self.status, &self.body) {
            (ReplyStatus::NoObject, ReplyBody::Failure(f)) => {
                Some(ObjwireError::NoObject(f.clone()))
            }
            (ReplyStatus::NoFacet, ReplyBody::Failure(f)) => Some(ObjwireError::NoFacet(f.clone())),
            (ReplyStatus::NoOperation, ReplyBody::Failure(f)) => {
                Some(ObjwireError::NoOperation(f.clone()))
            }
            (ReplyStatus::UnknownException, ReplyBody::Reason(reason)) => {
                Some(ObjwireError::UnknownException(reason.clone()))
            }
            (ReplyStatus::UnmarshalError, ReplyBody::Reason(reason)) => {
                Some(ObjwireError::Unmarshal(reason.clone()))
            }
            _ => None,
        }
    }

    /// Encode the reply body.
    pub fn encode_body(&self) -> Bytes {
        let mut out = OutgoingBuffer::with_capacity(16);
        out.write_u32(self.request_id);
        out.write_u8(self.status as u8);
        match &self.body {
            ReplyBody::Results(encaps) => out.write_raw(encaps),
            ReplyBody::Failure(failure) => {
                failure.identity.marshal(&mut out);
                marshal_facet(&mut out, failure.facet.as_deref());
                failure.operation.marshal(&mut out);
            }
            ReplyBody::Reason(reason) => out.write_string(reason),
        }
        out.into_bytes()
    }

    /// Wrap the encoded body in a framed reply message.
    pub fn to_message(&self) -> Message {
        Message::new(MessageKind::Reply, self.encode_body())
    }

    /// Decode a reply body.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let mut cursor = IncomingCursor::new(body);
        let request_id = cursor.read_u32()?;
        let status = ReplyStatus::try_from(cursor.read_u8()?)?;
        let reply_body = match status {
            ReplyStatus::Ok | ReplyStatus::UserException => {
                ReplyBody::Results(read_encapsulation_bytes(&mut cursor, body)?)
            }
            ReplyStatus::NoObject | ReplyStatus::NoFacet | ReplyStatus::NoOperation => {
                let identity = Identity::unmarshal(&mut cursor)?;
                let facet = cursor.read_optional(|c| c.read_string())?;
                let operation = OperationId::unmarshal(&mut cursor)?;
                ReplyBody::Failure(RequestFailure {
                    identity,
                    facet,
                    operation,
                })
            }
            ReplyStatus::UnknownException | ReplyStatus::UnmarshalError => {
                ReplyBody::Reason(cursor.read_string()?)
            }
        };
        Ok(Self {
            request_id,
            status,
            body: reply_body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_args() -> Bytes {
        let mut out = OutgoingBuffer::new();
        let mut encaps = out.begin_encapsulation();
        encaps.write_varint_signed(-42);
        encaps.end();
        out.into_bytes()
    }

    fn sample_request() -> Request {
        Request {
            request_id: 7,
            identity: Identity::new("printers", "p1"),
            facet: Some("admin".to_string()),
            operation: OperationId::Name("flush".to_string()),
            mode: OperationMode::Idempotent,
            args: sample_args(),
        }
    }

    #[test]
    fn test_request_roundtrip() {
        let request = sample_request();
        let body = request.encode_body();
        let decoded = Request::decode(&body).unwrap();

        assert_eq!(decoded.request_id, 7);
        assert_eq!(decoded.identity, request.identity);
        assert_eq!(decoded.facet.as_deref(), Some("admin"));
        assert_eq!(decoded.operation, request.operation);
        assert_eq!(decoded.mode, OperationMode::Idempotent);
        assert_eq!(decoded.args, request.args);
    }

    #[test]
    fn test_request_roundtrip_hashed_operation_no_facet() {
        let request = Request {
            request_id: 0,
            identity: Identity::named("clock"),
            facet: None,
            operation: OperationId::Hash(name_hash("now")),
            mode: OperationMode::Normal,
            args: empty_encapsulation(),
        };
        assert!(request.is_oneway());

        let decoded = Request::decode(&request.encode_body()).unwrap();
        assert!(decoded.is_oneway());
        assert_eq!(decoded.facet, None);
        assert_eq!(decoded.operation.hash(), name_hash("now"));
    }

    #[test]
    fn test_request_truncated_fails() {
        let body = sample_request().encode_body();
        let err = Request::decode(&body[..body.len() - 2]).unwrap_err();
        assert!(matches!(err, ObjwireError::Unmarshal(_)));
    }

    #[test]
    fn test_request_message_framing() {
        let message = sample_request().to_message();
        assert_eq!(message.kind(), MessageKind::Request);
        assert_eq!(message.header.size as usize, message.body.len());

        let encoded = message.encode();
        assert_eq!(&encoded[0..4], b"OBJW");
        assert_eq!(encoded.len(), HEADER_SIZE + message.body.len());
    }

    #[test]
    fn test_reply_ok_roundtrip() {
        let reply = Reply::ok(7, sample_args());
        let decoded = Reply::decode(&reply.encode_body()).unwrap();
        assert_eq!(decoded.request_id, 7);
        assert_eq!(decoded.status, ReplyStatus::Ok);
        assert_eq!(
            decoded.result_encapsulation().unwrap(),
            reply.result_encapsulation().unwrap()
        );
        assert!(decoded.to_error().is_none());
    }

    #[test]
    fn test_reply_not_found_roundtrip() {
        for status in [
            ReplyStatus::NoObject,
            ReplyStatus::NoFacet,
            ReplyStatus::NoOperation,
        ] {
            let failure = RequestFailure {
                identity: Identity::new("a", "b"),
                facet: None,
                operation: OperationId::Name("op".to_string()),
            };
            let reply = Reply::not_found(9, status, failure.clone());
            let decoded = Reply::decode(&reply.encode_body()).unwrap();
            assert_eq!(decoded.status, status);
            match decoded.body {
                ReplyBody::Failure(ref decoded_failure) => {
                    assert_eq!(*decoded_failure, failure);
                }
                ref other => panic!("unexpected body {other:?}"),
            }
            assert!(decoded.to_error().is_some());
        }
    }

    #[test]
    fn test_reply_reason_roundtrip() {
        let reply = Reply::unknown_exception(3, "servant panicked");
        let decoded = Reply::decode(&reply.encode_body()).unwrap();
        assert_eq!(decoded.status, ReplyStatus::UnknownException);
        assert!(matches!(
            decoded.to_error(),
            Some(ObjwireError::UnknownException(_))
        ));

        let reply = Reply::unmarshal_failure(4, "bad args");
        let decoded = Reply::decode(&reply.encode_body()).unwrap();
        assert!(matches!(decoded.to_error(), Some(ObjwireError::Unmarshal(_))));
    }

    #[test]
    fn test_reply_unknown_status_fails() {
        let mut body = Reply::ok(1, empty_encapsulation()).encode_body().to_vec();
        body[4] = 200;
        assert!(Reply::decode(&body).is_err());
    }

    #[test]
    fn test_empty_encapsulation_shape() {
        let encaps = empty_encapsulation();
        assert_eq!(encaps.len(), 6);
        assert_eq!(&encaps[0..4], &[0, 0, 0, 2]);
    }

    #[test]
    fn test_control_messages_have_empty_bodies() {
        let validate = Message::validate_connection();
        assert_eq!(validate.kind(), MessageKind::Validate);
        assert_eq!(validate.header.size, 0);
        assert_eq!(validate.encode().len(), HEADER_SIZE);

        let close = Message::close_connection();
        assert_eq!(close.kind(), MessageKind::Close);
        assert!(close.body.is_empty());
    }

    #[test]
    fn test_operation_id_display_and_hash() {
        let by_name = OperationId::Name("ping".to_string());
        let by_hash = OperationId::Hash(name_hash("ping"));
        assert_eq!(by_name.hash(), by_hash.hash());
        assert_eq!(by_name.to_string(), "ping");
        assert!(by_hash.to_string().starts_with("0x"));
    }
}
