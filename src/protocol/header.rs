//! Message header encoding and decoding.
//!
//! Implements the 13-byte header format:
//! ```text
//! ┌───────┬────────────┬────────────┬───────┬──────────┐
//! │ Magic │ Protocol   │ Encoding   │ Kind  │ Size     │
//! │ 4 B   │ maj+min 2B │ maj+min 2B │ 1 B   │ u32 BE   │
//! └───────┴────────────┴────────────┴───────┴──────────┘
//! ```
//!
//! Headers are validated eagerly, in order: magic, protocol version,
//! encoding version, kind, then size against the configured maximum. A
//! magic mismatch is fatal to the connection; every later check rejects
//! only the message.

use crate::error::{ObjwireError, Result};

/// Magic bytes opening every message.
pub const MAGIC: [u8; 4] = *b"OBJW";

/// Header size in bytes (fixed, exactly 13).
pub const HEADER_SIZE: usize = 13;

/// Protocol version spoken by this core.
pub const PROTOCOL_MAJOR: u8 = 1;
/// Protocol minor version.
pub const PROTOCOL_MINOR: u8 = 0;

/// Encoding version produced and accepted by the codecs.
pub const ENCODING_MAJOR: u8 = 1;
/// Encoding minor version.
pub const ENCODING_MINOR: u8 = 0;

/// Default maximum message body size (16 MiB). Protects against
/// unbounded allocation from a corrupt or hostile size field.
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Kind of a protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// Invocation request; body is a request body.
    Request = 0,
    /// Reply to a request; body is a reply body.
    Reply = 1,
    /// Connection validation, sent by the server on connect. Empty body.
    Validate = 2,
    /// Graceful connection close. Empty body.
    Close = 3,
}

impl TryFrom<u8> for MessageKind {
    type Error = ObjwireError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(MessageKind::Request),
            1 => Ok(MessageKind::Reply),
            2 => Ok(MessageKind::Validate),
            3 => Ok(MessageKind::Close),
            other => Err(ObjwireError::unmarshal(format!(
                "unknown message kind {other}"
            ))),
        }
    }
}

/// Decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Protocol major version.
    pub protocol_major: u8,
    /// Protocol minor version.
    pub protocol_minor: u8,
    /// Encoding major version.
    pub encoding_major: u8,
    /// Encoding minor version.
    pub encoding_minor: u8,
    /// Message kind.
    pub kind: MessageKind,
    /// Body length in bytes (header excluded).
    pub size: u32,
}

impl MessageHeader {
    /// Create a header for the current protocol and encoding versions.
    pub fn new(kind: MessageKind, size: u32) -> Self {
        Self {
            protocol_major: PROTOCOL_MAJOR,
            protocol_minor: PROTOCOL_MINOR,
            encoding_major: ENCODING_MAJOR,
            encoding_minor: ENCODING_MINOR,
            kind,
            size,
        }
    }

    /// Encode the header to its wire form.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4] = self.protocol_major;
        buf[5] = self.protocol_minor;
        buf[6] = self.encoding_major;
        buf[7] = self.encoding_minor;
        buf[8] = self.kind as u8;
        buf[9..13].copy_from_slice(&self.size.to_be_bytes());
        buf
    }

    /// Decode and eagerly validate a header.
    ///
    /// # Errors
    ///
    /// [`InvalidMagicNumber`](ObjwireError::InvalidMagicNumber) on a magic
    /// mismatch (fatal to the connection),
    /// [`UnsupportedProtocol`](ObjwireError::UnsupportedProtocol) /
    /// [`UnsupportedEncoding`](ObjwireError::UnsupportedEncoding) on a
    /// version this core does not speak, and
    /// [`Unmarshal`](ObjwireError::Unmarshal) for a short buffer or an
    /// unknown kind byte.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(ObjwireError::unmarshal("message header truncated"));
        }
        if buf[0..4] != MAGIC {
            return Err(ObjwireError::InvalidMagicNumber([
                buf[0], buf[1], buf[2], buf[3],
            ]));
        }
        let (protocol_major, protocol_minor) = (buf[4], buf[5]);
        if (protocol_major, protocol_minor) != (PROTOCOL_MAJOR, PROTOCOL_MINOR) {
            return Err(ObjwireError::UnsupportedProtocol(
                protocol_major,
                protocol_minor,
            ));
        }
        let (encoding_major, encoding_minor) = (buf[6], buf[7]);
        if (encoding_major, encoding_minor) != (ENCODING_MAJOR, ENCODING_MINOR) {
            return Err(ObjwireError::UnsupportedEncoding(
                encoding_major,
                encoding_minor,
            ));
        }
        let kind = MessageKind::try_from(buf[8])?;
        let size = u32::from_be_bytes([buf[9], buf[10], buf[11], buf[12]]);
        Ok(Self {
            protocol_major,
            protocol_minor,
            encoding_major,
            encoding_minor,
            kind,
            size,
        })
    }

    /// Check the declared body size against a configured maximum.
    pub fn validate(&self, max_message_size: u32) -> Result<()> {
        if self.size > max_message_size {
            return Err(ObjwireError::MessageTooLarge {
                size: self.size,
                max: max_message_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = MessageHeader::new(MessageKind::Request, 1234);
        let decoded = MessageHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_layout() {
        let header = MessageHeader::new(MessageKind::Reply, 0x0102_0304);
        let bytes = header.encode();
        assert_eq!(&bytes[0..4], b"OBJW");
        assert_eq!(bytes[4], PROTOCOL_MAJOR);
        assert_eq!(bytes[5], PROTOCOL_MINOR);
        assert_eq!(bytes[6], ENCODING_MAJOR);
        assert_eq!(bytes[7], ENCODING_MINOR);
        assert_eq!(bytes[8], 1);
        assert_eq!(&bytes[9..13], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_corrupted_magic_is_invalid_magic_number() {
        for i in 0..4 {
            let mut bytes = MessageHeader::new(MessageKind::Request, 0).encode();
            bytes[i] ^= 0xFF;
            let err = MessageHeader::decode(&bytes).unwrap_err();
            assert!(
                matches!(err, ObjwireError::InvalidMagicNumber(_)),
                "byte {i} corruption gave {err}"
            );
        }
    }

    #[test]
    fn test_truncated_header() {
        let bytes = MessageHeader::new(MessageKind::Request, 0).encode();
        let err = MessageHeader::decode(&bytes[..HEADER_SIZE - 1]).unwrap_err();
        assert!(matches!(err, ObjwireError::Unmarshal(_)));
    }

    #[test]
    fn test_unsupported_versions() {
        let mut bytes = MessageHeader::new(MessageKind::Request, 0).encode();
        bytes[4] = 2;
        assert!(matches!(
            MessageHeader::decode(&bytes).unwrap_err(),
            ObjwireError::UnsupportedProtocol(2, 0)
        ));

        let mut bytes = MessageHeader::new(MessageKind::Request, 0).encode();
        bytes[7] = 3;
        assert!(matches!(
            MessageHeader::decode(&bytes).unwrap_err(),
            ObjwireError::UnsupportedEncoding(1, 3)
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let mut bytes = MessageHeader::new(MessageKind::Close, 0).encode();
        bytes[8] = 9;
        assert!(matches!(
            MessageHeader::decode(&bytes).unwrap_err(),
            ObjwireError::Unmarshal(_)
        ));
    }

    #[test]
    fn test_size_validation() {
        let header = MessageHeader::new(MessageKind::Request, 1000);
        assert!(header.validate(1000).is_ok());
        let err = header.validate(999).unwrap_err();
        assert!(matches!(
            err,
            ObjwireError::MessageTooLarge { size: 1000, max: 999 }
        ));
    }

    #[test]
    fn test_kind_conversions() {
        for kind in [
            MessageKind::Request,
            MessageKind::Reply,
            MessageKind::Validate,
            MessageKind::Close,
        ] {
            assert_eq!(MessageKind::try_from(kind as u8).unwrap(), kind);
        }
        assert!(MessageKind::try_from(4).is_err());
    }
}
