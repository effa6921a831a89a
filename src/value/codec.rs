//! Wire codec for polymorphic values.
//!
//! A value slot starts with an unsigned varint marker:
//!
//! - `0` - nil
//! - `1` - an inline instance follows: flags byte, type identifier
//!   (string or u64 hash, per the flags), u32 field-body size, fields
//! - `n >= 2` - back-reference to indirection-table index `n - 2`
//!
//! Back-references only point at instances already decoded in the same
//! encapsulation (first-sight order); a forward reference is malformed
//! input. The decoder appends a new instance to the table *before*
//! decoding its fields, which is what lets true cycles resolve.

use std::rc::Rc;

use super::{flags, TypeIdFormat, ValueFactoryRegistry, ValueRef};
use crate::buffer::{IncomingCursor, OutgoingBuffer};
use crate::error::{ObjwireError, Result};

const MARKER_NIL: u64 = 0;
const MARKER_INSTANCE: u64 = 1;
const MARKER_BASE: u64 = 2;

impl OutgoingBuffer {
    /// Write a value slot.
    ///
    /// The first sight of an object (by `Rc` identity, not value equality)
    /// writes its full segment and enters it into the indirection table of
    /// the innermost open encapsulation; every later sight writes a
    /// back-reference index instead, so shared and cyclic graphs never
    /// duplicate and never recurse forever.
    pub fn write_value(&mut self, value: Option<&ValueRef>) -> Result<()> {
        let Some(instance) = value else {
            self.write_varint(MARKER_NIL);
            return Ok(());
        };

        let key = Rc::as_ptr(instance) as *const () as usize;
        if let Some(index) = self.value_slot(key) {
            self.write_varint(u64::from(index) + MARKER_BASE);
            return Ok(());
        }
        self.register_value(key, instance.clone());
        self.write_varint(MARKER_INSTANCE);

        let value = instance.borrow();
        let mut segment_flags = flags::LAST_SEGMENT;
        if self.type_id_format() == TypeIdFormat::Name {
            segment_flags |= flags::STRING_TYPE_ID;
        }
        self.write_u8(segment_flags);
        match self.type_id_format() {
            TypeIdFormat::Name => self.write_string(value.type_name()),
            TypeIdFormat::Hash => self.write_u64(value.type_hash()),
        }

        // Reserve the field-body size, then patch once the fields are out.
        let size_pos = self.len();
        self.write_u32(0);
        value.marshal_fields(self)?;
        let body_len = self.len() - size_pos - 4;
        self.patch_u32(size_pos, body_len as u32);
        Ok(())
    }
}

impl IncomingCursor<'_> {
    /// Read a value slot, resolving concrete types through `factories`.
    ///
    /// Unknown type identifiers, unresolved back-references, and segments
    /// overrunning the buffer are unmarshal errors. Trailing bytes inside
    /// a known instance's segment (fields added by a newer peer) are
    /// skipped to the segment boundary.
    pub fn read_value(&mut self, factories: &ValueFactoryRegistry) -> Result<Option<ValueRef>> {
        let marker = self.read_varint()?;
        match marker {
            MARKER_NIL => Ok(None),
            MARKER_INSTANCE => self.read_instance(factories).map(Some),
            reference => {
                let index = (reference - MARKER_BASE) as usize;
                self.lookup_value(index).map(Some).ok_or_else(|| {
                    ObjwireError::unmarshal(format!(
                        "back-reference to unwritten value index {index}"
                    ))
                })
            }
        }
    }

    fn read_instance(&mut self, factories: &ValueFactoryRegistry) -> Result<ValueRef> {
        let segment_flags = self.read_u8()?;
        if segment_flags & flags::RESERVED_MASK != 0 {
            return Err(ObjwireError::unmarshal(format!(
                "reserved segment flag bits set: {segment_flags:#04x}"
            )));
        }

        let instance = if flags::has_flag(segment_flags, flags::STRING_TYPE_ID) {
            let type_name = self.read_string()?;
            factories.create_by_name(&type_name).ok_or_else(|| {
                ObjwireError::unmarshal(format!("no factory registered for type `{type_name}`"))
            })?
        } else {
            let type_hash = self.read_u64()?;
            factories.create_by_hash(type_hash).ok_or_else(|| {
                ObjwireError::unmarshal(format!(
                    "no factory registered for type hash {type_hash:#018x}"
                ))
            })?
        };

        let size = self.read_u32()? as usize;
        if size > self.remaining() {
            return Err(ObjwireError::unmarshal(format!(
                "segment size {size} exceeds {} remaining bytes",
                self.remaining()
            )));
        }
        let boundary = self.position() + size;

        // Table entry must exist before descendant decoding so a cycle
        // back to this instance resolves.
        self.append_value(instance.clone());

        let outer_limit = self.limit_to(boundary);
        let fields = instance.borrow_mut().unmarshal_fields(self, factories);
        self.restore_limit(outer_limit);
        fields?;
        self.force_position(boundary);
        Ok(instance)
    }
}
