//! Incremental message framing over partial reads.
//!
//! The transport hands over whatever the socket produced; the reader
//! accumulates bytes and yields complete [`Message`]s. Header validation
//! is eager: a bad magic number surfaces before any body bytes are
//! awaited, and a hostile size field is rejected before allocation.
//!
//! State machine per message:
//! - `WaitingForHeader`: need 13 bytes
//! - `WaitingForBody`: header validated, need `size` more bytes

use bytes::BytesMut;

use crate::error::Result;

use super::header::{MessageHeader, DEFAULT_MAX_MESSAGE_SIZE, HEADER_SIZE};
use super::message::Message;

#[derive(Debug, Clone)]
enum State {
    WaitingForHeader,
    WaitingForBody { header: MessageHeader },
}

/// Accumulates incoming bytes and extracts complete messages.
///
/// One reader per connection. After an
/// [`InvalidMagicNumber`](crate::ObjwireError::InvalidMagicNumber) error the
/// byte stream cannot be re-synchronized; the transport must tear the
/// connection down and discard the reader.
///
/// # Example
///
/// ```
/// use objwire::{Message, MessageReader};
///
/// let wire = Message::validate_connection().encode();
/// let mut reader = MessageReader::new();
///
/// let messages = reader.push(&wire).unwrap();
/// assert_eq!(messages.len(), 1);
/// ```
pub struct MessageReader {
    buffer: BytesMut,
    state: State,
    max_message_size: u32,
}

impl MessageReader {
    /// Create a reader with the default 16 MiB message size cap.
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create a reader with a custom message size cap.
    pub fn with_max_message_size(max_message_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            state: State::WaitingForHeader,
            max_message_size,
        }
    }

    /// Push received bytes and extract all complete messages.
    ///
    /// Partial data is buffered for the next push; delivering the stream
    /// one byte at a time produces the same messages as one big push.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Message>> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();
        while let Some(message) = self.try_extract_one()? {
            messages.push(message);
        }
        Ok(messages)
    }

    fn try_extract_one(&mut self) -> Result<Option<Message>> {
        match &self.state {
            State::WaitingForHeader => {
                if self.buffer.len() < HEADER_SIZE {
                    return Ok(None);
                }
                let header = MessageHeader::decode(&self.buffer[..HEADER_SIZE])?;
                header.validate(self.max_message_size)?;
                let _ = self.buffer.split_to(HEADER_SIZE);

                if header.size == 0 {
                    return Ok(Some(Message {
                        header,
                        body: bytes::Bytes::new(),
                    }));
                }
                self.state = State::WaitingForBody { header };
                self.try_extract_one()
            }

            State::WaitingForBody { header } => {
                let needed = header.size as usize;
                if self.buffer.len() < needed {
                    return Ok(None);
                }
                let header = *header;
                let body = self.buffer.split_to(needed).freeze();
                self.state = State::WaitingForHeader;
                Ok(Some(Message { header, body }))
            }
        }
    }

    /// Number of buffered, not-yet-consumed bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the reader holds no buffered bytes.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop buffered bytes and reset the state machine.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }
}

impl Default for MessageReader {
    fn default() -> Self {
        Self::new()
    }
}
