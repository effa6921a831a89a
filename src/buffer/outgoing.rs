//! Append-only encode sink.
//!
//! An [`OutgoingBuffer`] accumulates the bytes of exactly one message
//! body. Encapsulations are opened with [`OutgoingBuffer::begin_encapsulation`],
//! which reserves a placeholder size field and returns a guard; closing the
//! guard (explicitly or by drop) patches the placeholder with the byte count
//! written since. This two-pass reserve-then-patch approach avoids a
//! separate size-computation traversal over the data.
//!
//! # Example
//!
//! ```
//! use objwire::OutgoingBuffer;
//!
//! let mut out = OutgoingBuffer::new();
//! let mut encaps = out.begin_encapsulation();
//! encaps.write_string("payload");
//! encaps.end();
//!
//! let bytes = out.into_bytes();
//! // u32 size + encoding version + varint length + 7 bytes
//! assert_eq!(bytes.len(), 4 + 2 + 1 + 7);
//! ```

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::{ENCODING_MAJOR, ENCODING_MINOR};
use crate::value::{TypeIdFormat, ValueRef};

/// One open encapsulation (or the implicit root frame).
struct Frame {
    /// Offset of the reserved u32 size field; `None` for the root frame.
    size_pos: Option<usize>,
    /// First-sight index per value, keyed by `Rc` pointer address.
    value_indices: HashMap<usize, u32>,
    /// Strong refs keeping the written values (and their addresses) alive
    /// for the duration of the pass.
    value_refs: Vec<ValueRef>,
}

impl Frame {
    fn new(size_pos: Option<usize>) -> Self {
        Self {
            size_pos,
            value_indices: HashMap::new(),
            value_refs: Vec::new(),
        }
    }
}

/// Append-only byte sink for one encode pass.
pub struct OutgoingBuffer {
    buf: BytesMut,
    /// Stack of open encapsulations; `frames[0]` is the root frame.
    frames: Vec<Frame>,
    type_id_format: TypeIdFormat,
}

impl OutgoingBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create an empty buffer with a pre-sized backing allocation.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            frames: vec![Frame::new(None)],
            type_id_format: TypeIdFormat::Hash,
        }
    }

    /// How polymorphic values identify their concrete type on the wire.
    /// Defaults to [`TypeIdFormat::Hash`].
    pub fn type_id_format(&self) -> TypeIdFormat {
        self.type_id_format
    }

    /// Select string or hashed type identifiers for subsequently written
    /// values.
    pub fn set_type_id_format(&mut self, format: TypeIdFormat) {
        self.type_id_format = format;
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append raw bytes to the innermost open encapsulation.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a single byte.
    #[inline]
    pub(crate) fn put_u8(&mut self, byte: u8) {
        self.buf.put_u8(byte);
    }

    /// Overwrite a previously reserved u32 (big-endian) at `pos`.
    pub(crate) fn patch_u32(&mut self, pos: usize, value: u32) {
        debug_assert!(pos + 4 <= self.buf.len());
        self.buf[pos..pos + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Open a nested encapsulation: reserve the size field, write the
    /// encoding version, and push a frame with a fresh value table.
    ///
    /// Writes through the returned guard land inside the encapsulation;
    /// its [`end`](OutgoingEncapsulation::end) (or drop) patches the size.
    pub fn begin_encapsulation(&mut self) -> OutgoingEncapsulation<'_> {
        let size_pos = self.buf.len();
        self.buf.put_u32(0);
        self.buf.put_u8(ENCODING_MAJOR);
        self.buf.put_u8(ENCODING_MINOR);
        self.frames.push(Frame::new(Some(size_pos)));
        OutgoingEncapsulation {
            buf: self,
            size_pos,
            finished: false,
        }
    }

    /// Look up the first-sight index of a value already written in the
    /// innermost encapsulation.
    pub(crate) fn value_slot(&self, key: usize) -> Option<u32> {
        self.innermost().value_indices.get(&key).copied()
    }

    /// Record a value at the next first-sight index and return that index.
    pub(crate) fn register_value(&mut self, key: usize, value: ValueRef) -> u32 {
        let frame = self.frames.last_mut().expect("root frame always present");
        let index = frame.value_refs.len() as u32;
        frame.value_indices.insert(key, index);
        frame.value_refs.push(value);
        index
    }

    fn innermost(&self) -> &Frame {
        self.frames.last().expect("root frame always present")
    }

    /// Consume the buffer, yielding the encoded bytes.
    ///
    /// All encapsulations must be closed first.
    pub fn into_bytes(self) -> Bytes {
        debug_assert_eq!(self.frames.len(), 1, "open encapsulation at end of pass");
        self.buf.freeze()
    }

    /// View the bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for OutgoingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for one open encapsulation.
///
/// Dereferences to the underlying [`OutgoingBuffer`], so all write methods
/// are available on the guard itself. Dropping the guard (or calling
/// [`end`](Self::end)) patches the reserved size field and pops the frame.
pub struct OutgoingEncapsulation<'a> {
    buf: &'a mut OutgoingBuffer,
    size_pos: usize,
    finished: bool,
}

impl OutgoingEncapsulation<'_> {
    /// Close the encapsulation, patching its size field.
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        // Size counts everything after the size field itself, including
        // the two encoding-version bytes.
        let written = self.buf.len() - self.size_pos - 4;
        self.buf.patch_u32(self.size_pos, written as u32);
        self.buf.frames.pop();
    }
}

impl Drop for OutgoingEncapsulation<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl Deref for OutgoingEncapsulation<'_> {
    type Target = OutgoingBuffer;

    fn deref(&self) -> &OutgoingBuffer {
        self.buf
    }
}

impl DerefMut for OutgoingEncapsulation<'_> {
    fn deref_mut(&mut self) -> &mut OutgoingBuffer {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer() {
        let out = OutgoingBuffer::new();
        assert!(out.is_empty());
        assert_eq!(out.len(), 0);
    }

    #[test]
    fn test_write_raw() {
        let mut out = OutgoingBuffer::new();
        out.write_raw(b"abc");
        out.write_raw(b"def");
        assert_eq!(out.into_bytes().as_ref(), b"abcdef");
    }

    #[test]
    fn test_encapsulation_layout() {
        let mut out = OutgoingBuffer::new();
        let mut encaps = out.begin_encapsulation();
        encaps.write_u8(0x07);
        encaps.end();

        let bytes = out.into_bytes();
        // size = version (2) + payload (1)
        assert_eq!(
            bytes.as_ref(),
            &[0, 0, 0, 3, ENCODING_MAJOR, ENCODING_MINOR, 0x07]
        );
    }

    #[test]
    fn test_encapsulation_patched_on_drop() {
        let mut out = OutgoingBuffer::new();
        {
            let mut encaps = out.begin_encapsulation();
            encaps.write_u16(0xBEEF);
            // no explicit end()
        }
        let bytes = out.into_bytes();
        assert_eq!(&bytes[..4], &[0, 0, 0, 4]);
    }

    #[test]
    fn test_nested_encapsulations() {
        let mut out = OutgoingBuffer::new();
        let mut outer = out.begin_encapsulation();
        outer.write_u8(1);
        {
            let mut inner = outer.begin_encapsulation();
            inner.write_u8(2);
            inner.end();
        }
        outer.write_u8(3);
        outer.end();

        let bytes = out.into_bytes();
        // outer: version(2) + 1 + inner(4 + 2 + 1) + 1
        assert_eq!(&bytes[..4], &[0, 0, 0, 11]);
        // inner size field sits after outer version + one payload byte
        assert_eq!(&bytes[7..11], &[0, 0, 0, 3]);
        assert_eq!(bytes[bytes.len() - 1], 3);
    }

    #[test]
    fn test_empty_encapsulation() {
        let mut out = OutgoingBuffer::new();
        out.begin_encapsulation().end();
        let bytes = out.into_bytes();
        assert_eq!(bytes.as_ref(), &[0, 0, 0, 2, ENCODING_MAJOR, ENCODING_MINOR]);
    }
}
