//! Composite codec - strings, sequences, optionals, dictionaries, arrays.
//!
//! Each shape is a thin layer over the scalar codec: a varint length or
//! count prefix, then the element codec applied in order. Element codecs
//! are passed as closures, so nested composites compose without trait
//! machinery.
//!
//! # Example
//!
//! ```
//! use objwire::{IncomingCursor, OutgoingBuffer};
//!
//! let mut out = OutgoingBuffer::new();
//! out.write_sequence(&[3u32, 1, 2], |out, v| {
//!     out.write_varint(*v as u64);
//!     Ok(())
//! }).unwrap();
//! let bytes = out.into_bytes();
//!
//! let mut cursor = IncomingCursor::new(&bytes);
//! let decoded = cursor
//!     .read_sequence(|c| Ok(c.read_varint()? as u32))
//!     .unwrap();
//! assert_eq!(decoded, vec![3, 1, 2]);
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use crate::buffer::{IncomingCursor, OutgoingBuffer};
use crate::error::{ObjwireError, Result};

impl OutgoingBuffer {
    /// Append a string: varint byte length, then the raw UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) {
        self.write_varint(value.len() as u64);
        self.write_raw(value.as_bytes());
    }

    /// Append a sequence: varint element count, then each element in order.
    pub fn write_sequence<T>(
        &mut self,
        items: &[T],
        mut write: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        self.write_varint(items.len() as u64);
        for item in items {
            write(self, item)?;
        }
        Ok(())
    }

    /// Append an optional: one flag byte, then the payload only if present.
    pub fn write_optional<T>(
        &mut self,
        value: Option<&T>,
        write: impl FnOnce(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        match value {
            Some(inner) => {
                self.write_bool(true);
                write(self, inner)
            }
            None => {
                self.write_bool(false);
                Ok(())
            }
        }
    }

    /// Append an associative container: varint pair count, then key/value
    /// pairs in the iterator's order.
    pub fn write_dict<'m, K: 'm, V: 'm>(
        &mut self,
        entries: impl ExactSizeIterator<Item = (&'m K, &'m V)>,
        mut write: impl FnMut(&mut Self, &K, &V) -> Result<()>,
    ) -> Result<()> {
        self.write_varint(entries.len() as u64);
        for (key, value) in entries {
            write(self, key, value)?;
        }
        Ok(())
    }

    /// Append a fixed-arity array: elements only, no count prefix.
    pub fn write_array<T>(
        &mut self,
        items: &[T],
        mut write: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        for item in items {
            write(self, item)?;
        }
        Ok(())
    }
}

impl<'a> IncomingCursor<'a> {
    /// Read a string. Fails if fewer bytes remain than the declared
    /// length, or if the bytes are not valid UTF-8.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_varint()? as usize;
        let raw = self.read_raw(len).map_err(|_| {
            ObjwireError::unmarshal(format!("string length {len} exceeds remaining bytes"))
        })?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| ObjwireError::unmarshal(format!("invalid UTF-8 in string: {e}")))
    }

    /// Check a declared element count against the bytes actually left.
    ///
    /// Every element occupies at least one byte on the wire, so a count
    /// beyond `remaining()` cannot be honest; rejecting it here keeps a
    /// hostile length prefix from driving a huge allocation.
    fn check_count(&self, count: u64) -> Result<usize> {
        if count > self.remaining() as u64 {
            return Err(ObjwireError::unmarshal(format!(
                "declared count {count} exceeds {} remaining bytes",
                self.remaining()
            )));
        }
        Ok(count as usize)
    }

    /// Read a sequence, applying `read` once per declared element.
    pub fn read_sequence<T>(
        &mut self,
        mut read: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let declared = self.read_varint()?;
        let count = self.check_count(declared)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }

    /// Read an optional.
    pub fn read_optional<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<Option<T>> {
        if self.read_bool()? {
            Ok(Some(read(self)?))
        } else {
            Ok(None)
        }
    }

    /// Read an associative container into a fresh map. Duplicate keys are
    /// the container's concern: later pairs overwrite earlier ones.
    pub fn read_dict<K: Eq + Hash, V>(
        &mut self,
        mut read_pair: impl FnMut(&mut Self) -> Result<(K, V)>,
    ) -> Result<HashMap<K, V>> {
        let declared = self.read_varint()?;
        let count = self.check_count(declared)?;
        let mut map = HashMap::with_capacity(count);
        for _ in 0..count {
            let (key, value) = read_pair(self)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Read a fixed-arity array.
    pub fn read_array<T, const N: usize>(
        &mut self,
        mut read: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<[T; N]> {
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(read(self)?);
        }
        items
            .try_into()
            .map_err(|_| ObjwireError::unmarshal("array arity mismatch"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_roundtrip() {
        for text in ["", "hello", "żółw 🐢", &"x".repeat(1000)] {
            let mut out = OutgoingBuffer::new();
            out.write_string(text);
            let bytes = out.into_bytes();

            let mut cursor = IncomingCursor::new(&bytes);
            assert_eq!(cursor.read_string().unwrap(), text);
            assert_eq!(cursor.remaining(), 0);
        }
    }

    #[test]
    fn test_string_length_is_byte_count() {
        let mut out = OutgoingBuffer::new();
        out.write_string("🐢"); // 1 char, 4 bytes
        let bytes = out.into_bytes();
        assert_eq!(bytes[0], 4);
    }

    #[test]
    fn test_string_truncated_fails() {
        let mut out = OutgoingBuffer::new();
        out.write_string("hello");
        let bytes = out.into_bytes();

        let mut cursor = IncomingCursor::new(&bytes[..bytes.len() - 2]);
        let err = cursor.read_string().unwrap_err();
        assert!(err.to_string().contains("exceeds remaining"));
    }

    #[test]
    fn test_string_invalid_utf8_fails() {
        let data = [2u8, 0xFF, 0xFE];
        let mut cursor = IncomingCursor::new(&data);
        assert!(cursor.read_string().is_err());
    }

    #[test]
    fn test_sequence_preserves_order() {
        let items = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let mut out = OutgoingBuffer::new();
        out.write_sequence(&items, |out, s| {
            out.write_string(s);
            Ok(())
        })
        .unwrap();
        let bytes = out.into_bytes();

        let mut cursor = IncomingCursor::new(&bytes);
        let decoded = cursor.read_sequence(|c| c.read_string()).unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn test_empty_sequence() {
        let mut out = OutgoingBuffer::new();
        out.write_sequence::<u8>(&[], |out, v| {
            out.write_u8(*v);
            Ok(())
        })
        .unwrap();
        let bytes = out.into_bytes();
        assert_eq!(bytes.as_ref(), &[0]);

        let mut cursor = IncomingCursor::new(&bytes);
        let decoded: Vec<u8> = cursor.read_sequence(|c| c.read_u8()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_hostile_sequence_count_rejected() {
        // declares 2^40 elements with 2 bytes of payload
        let mut out = OutgoingBuffer::new();
        out.write_varint(1 << 40);
        out.write_u16(0);
        let bytes = out.into_bytes();

        let mut cursor = IncomingCursor::new(&bytes);
        let err = cursor.read_sequence(|c| c.read_u8()).unwrap_err();
        assert!(err.to_string().contains("declared count"));
    }

    #[test]
    fn test_optional_roundtrip() {
        let mut out = OutgoingBuffer::new();
        out.write_optional(Some(&42u32), |out, v| {
            out.write_u32(*v);
            Ok(())
        })
        .unwrap();
        out.write_optional::<u32>(None, |out, v| {
            out.write_u32(*v);
            Ok(())
        })
        .unwrap();
        let bytes = out.into_bytes();
        // present: flag + 4 bytes; absent: flag only
        assert_eq!(bytes.len(), 6);

        let mut cursor = IncomingCursor::new(&bytes);
        assert_eq!(cursor.read_optional(|c| c.read_u32()).unwrap(), Some(42));
        assert_eq!(cursor.read_optional(|c| c.read_u32()).unwrap(), None);
    }

    #[test]
    fn test_dict_roundtrip() {
        let mut map = HashMap::new();
        map.insert("one".to_string(), 1u32);
        map.insert("two".to_string(), 2);
        map.insert("three".to_string(), 3);

        let mut out = OutgoingBuffer::new();
        out.write_dict(map.iter(), |out, k, v| {
            out.write_string(k);
            out.write_u32(*v);
            Ok(())
        })
        .unwrap();
        let bytes = out.into_bytes();

        let mut cursor = IncomingCursor::new(&bytes);
        let decoded = cursor
            .read_dict(|c| {
                let key = c.read_string()?;
                let value = c.read_u32()?;
                Ok((key, value))
            })
            .unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn test_array_roundtrip() {
        let mut out = OutgoingBuffer::new();
        out.write_array(&[10u16, 20, 30], |out, v| {
            out.write_u16(*v);
            Ok(())
        })
        .unwrap();
        let bytes = out.into_bytes();
        // no count prefix
        assert_eq!(bytes.len(), 6);

        let mut cursor = IncomingCursor::new(&bytes);
        let decoded: [u16; 3] = cursor.read_array(|c| c.read_u16()).unwrap();
        assert_eq!(decoded, [10, 20, 30]);
    }
}
