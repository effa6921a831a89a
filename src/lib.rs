//! # objwire
//!
//! Binary wire-protocol core for object RPC: serializes scalars, strings,
//! containers, and polymorphic object graphs into byte buffers, frames them
//! into protocol messages, and dispatches received requests to servants by
//! identity and operation.
//!
//! ## Architecture
//!
//! - **Codecs** ([`codec`]): fixed-width and varint scalars, composite
//!   shapes (strings, sequences, optionals, dictionaries, arrays)
//! - **Buffers** ([`buffer`]): [`OutgoingBuffer`] append-only sink and
//!   [`IncomingCursor`] bounds-checked reader, both encapsulation-aware
//! - **Values** ([`value`]): type-tagged polymorphic structs with an
//!   indirection table for shared and cyclic graphs
//! - **Framing** ([`protocol`]): 13-byte validated header, request/reply
//!   bodies, [`MessageReader`] over partial reads
//! - **Dispatch** ([`dispatch`]): identity + facet + operation resolution
//!   into handler invocations, failures mapped to typed reply statuses
//!
//! The transport (sockets, TLS), adapter lifecycle, and IDL-generated
//! marshaling glue are external collaborators: this crate consumes complete
//! byte ranges and per-type marshal functions, and produces framed
//! messages. Nothing here blocks, suspends, or retries.
//!
//! ## Example
//!
//! ```
//! use objwire::{
//!     dispatch_message, DispatchTable, Identity, MessageReader, OperationOutcome,
//!     Reply, ReplyStatus, Request, OperationId, OperationMode, ServantRegistry,
//!     OutgoingBuffer, ValueFactoryRegistry,
//! };
//!
//! // Server side: one servant, one operation.
//! let mut registry = ServantRegistry::new();
//! let table = DispatchTable::new("::demo::Echo").operation("shout", |ctx| {
//!     let text = ctx.args.read_string()?;
//!     ctx.results.write_string(&text.to_uppercase());
//!     Ok(OperationOutcome::Ok)
//! });
//! registry.add(Identity::named("echo"), table).unwrap();
//!
//! // Caller side: encode a request and frame it.
//! let mut args = OutgoingBuffer::new();
//! let mut encaps = args.begin_encapsulation();
//! encaps.write_string("hello");
//! encaps.end();
//! let request = Request {
//!     request_id: 1,
//!     identity: Identity::named("echo"),
//!     facet: None,
//!     operation: OperationId::Name("shout".to_string()),
//!     mode: OperationMode::Normal,
//!     args: args.into_bytes(),
//! };
//!
//! // Wire in, wire out.
//! let mut reader = MessageReader::new();
//! let messages = reader.push(&request.to_message().encode()).unwrap();
//! let factories = ValueFactoryRegistry::new();
//! let reply_wire = dispatch_message(&registry, &factories, &messages[0])
//!     .unwrap()
//!     .unwrap();
//!
//! let reply_messages = MessageReader::new().push(&reply_wire).unwrap();
//! let reply = Reply::decode(&reply_messages[0].body).unwrap();
//! assert_eq!(reply.status, ReplyStatus::Ok);
//! ```

pub mod buffer;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod value;

pub use buffer::{IncomingCursor, IncomingEncapsulation, OutgoingBuffer, OutgoingEncapsulation};
pub use dispatch::{
    dispatch_message, dispatch_request, DispatchContext, DispatchTable, OperationOutcome,
    ServantRegistry,
};
pub use error::{ObjwireError, RequestFailure, Result};
pub use identity::Identity;
pub use protocol::{
    Message, MessageHeader, MessageKind, MessageReader, OperationId, OperationMode, Reply,
    ReplyStatus, Request,
};
pub use value::{name_hash, TypeIdFormat, Value, ValueFactoryRegistry, ValueRef};
