//! Message framing - headers, request/reply bodies, incremental reading.
//!
//! This module implements the connection-facing layer of the wire format:
//! - 13-byte header encoding/decoding with eager validation
//! - request and reply bodies, parsed through the buffer model
//! - [`MessageReader`] for accumulating partial reads into messages

mod header;
mod message;
mod reader;

pub use header::{
    MessageHeader, MessageKind, DEFAULT_MAX_MESSAGE_SIZE, ENCODING_MAJOR, ENCODING_MINOR,
    HEADER_SIZE, MAGIC, PROTOCOL_MAJOR, PROTOCOL_MINOR,
};
pub use message::{
    empty_encapsulation, Message, OperationId, OperationMode, Reply, ReplyBody, ReplyStatus,
    Request,
};
pub use reader::MessageReader;
