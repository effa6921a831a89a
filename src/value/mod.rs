//! Polymorphic object codec.
//!
//! Values are type-tagged structs that travel by concrete type: each
//! instance is written as a segment carrying its type identifier (a string
//! name or a 64-bit hash of it) followed by its fields. Shared and cyclic
//! references round-trip through a per-encapsulation indirection table:
//! the first sight of an object writes its body and claims the next table
//! index, every later sight writes only a back-reference to that index.
//!
//! The type system is open but explicit: decoding resolves concrete types
//! through a [`ValueFactoryRegistry`] passed into the call. There is no
//! process-wide registry; an unregistered type identifier in the input is
//! an unmarshal error, not a crash.

mod codec;
mod registry;

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::buffer::{IncomingCursor, OutgoingBuffer};
use crate::error::Result;

pub use registry::{ValueFactory, ValueFactoryRegistry};

/// Segment header flag constants.
pub mod flags {
    /// Type identifier is a length-prefixed string; when clear, it is a
    /// 64-bit hash.
    pub const STRING_TYPE_ID: u8 = 0b0000_0001;
    /// This segment ends the instance's inheritance chain.
    pub const LAST_SEGMENT: u8 = 0b0000_0010;

    /// Reserved bits (2-7) must be zero.
    pub const RESERVED_MASK: u8 = 0b1111_1100;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }
}

/// How an encoder identifies concrete types on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeIdFormat {
    /// 64-bit FNV-1a hash of the type name. Compact; the default.
    Hash,
    /// Full type name as a string. Self-describing, larger.
    Name,
}

/// FNV-1a 64 over the UTF-8 bytes of a name.
///
/// This hash is part of the wire contract: hashed type and operation
/// identifiers are exactly this function applied to the corresponding
/// name, so it is fixed here rather than delegated to a hasher whose
/// output could change between versions.
pub const fn name_hash(name: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let bytes = name.as_bytes();
    let mut hash = OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(PRIME);
        i += 1;
    }
    hash
}

/// A polymorphic, reference-counted object that can cross the wire.
///
/// Implementations are normally produced by generated marshaling glue;
/// hand-written impls follow the same shape: marshal fields in declaration
/// order through the composite codec, unmarshal them back in the same
/// order. Nested values go through
/// [`OutgoingBuffer::write_value`]/[`IncomingCursor::read_value`] so the
/// indirection table sees them.
pub trait Value: Any {
    /// Globally unique type name, e.g. `::inventory::Item`.
    fn type_name(&self) -> &'static str;

    /// Hashed form of the type name.
    fn type_hash(&self) -> u64 {
        name_hash(self.type_name())
    }

    /// Write this instance's fields (segment header excluded).
    fn marshal_fields(&self, out: &mut OutgoingBuffer) -> Result<()>;

    /// Read this instance's fields (segment header excluded).
    fn unmarshal_fields(
        &mut self,
        cursor: &mut IncomingCursor<'_>,
        factories: &ValueFactoryRegistry,
    ) -> Result<()>;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a decoded or to-be-encoded value.
///
/// `Rc` identity (not value equality) is what the indirection table keys
/// on, so two handles to one object stay one object across the wire.
pub type ValueRef = Rc<RefCell<dyn Value>>;

/// Coerce a concrete value handle into a [`ValueRef`].
pub fn value_ref<T: Value>(value: Rc<RefCell<T>>) -> ValueRef {
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_hash_is_stable() {
        // FNV-1a 64 reference vectors
        assert_eq!(name_hash(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(name_hash("a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(name_hash("foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn test_name_hash_distinguishes_names() {
        assert_ne!(name_hash("::demo::A"), name_hash("::demo::B"));
    }

    #[test]
    fn test_flags() {
        assert!(flags::has_flag(
            flags::STRING_TYPE_ID | flags::LAST_SEGMENT,
            flags::LAST_SEGMENT
        ));
        assert!(!flags::has_flag(flags::LAST_SEGMENT, flags::STRING_TYPE_ID));
        assert_eq!(flags::RESERVED_MASK & (flags::STRING_TYPE_ID | flags::LAST_SEGMENT), 0);
    }
}
