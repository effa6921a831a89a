//! Bounds-checked decode cursor.
//!
//! An [`IncomingCursor`] walks a received byte range exactly once. Every
//! read is checked against the current limit; exhaustion is an
//! [`Unmarshal`](crate::ObjwireError::Unmarshal) error, never a panic;
//! the input is untrusted.
//!
//! [`IncomingCursor::begin_encapsulation`] validates a declared segment
//! size, clamps the cursor's limit to the segment boundary, and returns a
//! guard. Releasing the guard forces the cursor forward to the boundary
//! regardless of how much was consumed, which is what lets a decoder skip
//! trailing fields it does not understand (forward compatibility).

use std::ops::{Deref, DerefMut};

use crate::error::{ObjwireError, Result};
use crate::protocol::{ENCODING_MAJOR, ENCODING_MINOR};
use crate::value::ValueRef;

/// Read-only cursor over one received message body.
pub struct IncomingCursor<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
    /// Indirection tables, innermost last; `values[0]` belongs to the
    /// implicit root frame.
    values: Vec<Vec<ValueRef>>,
}

impl<'a> IncomingCursor<'a> {
    /// Create a cursor over `data`, positioned at its start.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
            values: vec![Vec::new()],
        }
    }

    /// Bytes left before the current limit.
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Absolute offset from the start of the underlying data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read `count` raw bytes.
    pub fn read_raw(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(ObjwireError::unmarshal(format!(
                "requested {count} bytes but only {} remain",
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// Advance the cursor without reading.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_raw(count).map(|_| ())
    }

    /// Open an encapsulation: read and validate its size and encoding
    /// version, clamp the limit to the segment boundary, and push a fresh
    /// value table.
    ///
    /// The guard's [`end`](IncomingEncapsulation::end) (or drop) forces the
    /// cursor to the boundary and restores the outer limit, so unknown
    /// trailing fields inside the segment are skipped, never misparsed.
    pub fn begin_encapsulation(&mut self) -> Result<IncomingEncapsulation<'a, '_>> {
        let size = self.read_u32()? as usize;
        if size < 2 {
            return Err(ObjwireError::unmarshal(format!(
                "encapsulation size {size} is smaller than its version field"
            )));
        }
        if size > self.remaining() {
            return Err(ObjwireError::unmarshal(format!(
                "encapsulation size {size} exceeds {} remaining bytes",
                self.remaining()
            )));
        }
        let boundary = self.pos + size;
        let major = self.read_u8()?;
        let minor = self.read_u8()?;
        if (major, minor) != (ENCODING_MAJOR, ENCODING_MINOR) {
            return Err(ObjwireError::UnsupportedEncoding(major, minor));
        }
        let outer_end = self.end;
        self.end = boundary;
        self.values.push(Vec::new());
        Ok(IncomingEncapsulation {
            boundary,
            outer_end,
            encoding: (major, minor),
            finished: false,
            cursor: self,
        })
    }

    /// Jump over an entire encapsulation without parsing its contents.
    pub fn skip_encapsulation(&mut self) -> Result<()> {
        let size = self.read_u32()? as usize;
        if size < 2 || size > self.remaining() {
            return Err(ObjwireError::unmarshal(format!(
                "cannot skip encapsulation of declared size {size}"
            )));
        }
        self.pos += size;
        Ok(())
    }

    /// Resolve a back-reference in the innermost value table.
    pub(crate) fn lookup_value(&self, index: usize) -> Option<ValueRef> {
        self.values
            .last()
            .expect("root value table always present")
            .get(index)
            .cloned()
    }

    /// Append a decoded value at the next first-sight index.
    pub(crate) fn append_value(&mut self, value: ValueRef) {
        self.values
            .last_mut()
            .expect("root value table always present")
            .push(value);
    }

    /// Temporarily clamp the limit to `boundary`, returning the previous
    /// limit. Used for value segments, which bound their fields the same
    /// way encapsulations do.
    pub(crate) fn limit_to(&mut self, boundary: usize) -> usize {
        debug_assert!(boundary <= self.end);
        std::mem::replace(&mut self.end, boundary)
    }

    /// Restore a limit previously returned by [`Self::limit_to`].
    pub(crate) fn restore_limit(&mut self, limit: usize) {
        self.end = limit;
    }

    /// Force the cursor to an absolute position at or past the current one.
    pub(crate) fn force_position(&mut self, pos: usize) {
        debug_assert!(pos >= self.pos && pos <= self.data.len());
        self.pos = pos;
    }
}

/// Guard for one open incoming encapsulation.
///
/// Dereferences to the underlying [`IncomingCursor`]. While the guard is
/// alive, reads cannot cross the segment boundary; releasing it positions
/// the cursor exactly at that boundary.
pub struct IncomingEncapsulation<'a, 'c> {
    cursor: &'c mut IncomingCursor<'a>,
    boundary: usize,
    outer_end: usize,
    encoding: (u8, u8),
    finished: bool,
}

impl IncomingEncapsulation<'_, '_> {
    /// Encoding version declared by this encapsulation.
    pub fn encoding(&self) -> (u8, u8) {
        self.encoding
    }

    /// Close the encapsulation, skipping any unread trailing bytes.
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.cursor.pos = self.boundary;
        self.cursor.end = self.outer_end;
        self.cursor.values.pop();
    }
}

impl Drop for IncomingEncapsulation<'_, '_> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl<'a> Deref for IncomingEncapsulation<'a, '_> {
    type Target = IncomingCursor<'a>;

    fn deref(&self) -> &IncomingCursor<'a> {
        self.cursor
    }
}

impl<'a> DerefMut for IncomingEncapsulation<'a, '_> {
    fn deref_mut(&mut self) -> &mut IncomingCursor<'a> {
        self.cursor
    }
}
