//! Codec layers - typed encode/decode over the buffer model.
//!
//! Two layers, leaves first:
//!
//! - [`scalar`] - fixed-width integers/floats (big-endian) and
//!   variable-length integers (varint with zigzag for signed values)
//! - [`composite`] - strings, sequences, optionals, dictionaries, and
//!   fixed arrays built atop the scalar codec
//!
//! Both layers are implemented as inherent methods on
//! [`OutgoingBuffer`](crate::OutgoingBuffer) and
//! [`IncomingCursor`](crate::IncomingCursor), so user marshaling code reads
//! as a linear sequence of typed writes/reads. The polymorphic object codec
//! lives in [`crate::value`].

pub mod composite;
pub mod scalar;

pub use scalar::{significant_bits, varint_len, zigzag_decode, zigzag_encode, MAX_VARINT_LEN};
