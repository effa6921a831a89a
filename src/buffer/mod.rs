//! Buffer model - the encode sink and the decode cursor.
//!
//! Two halves, each exclusively owned by one encode or decode pass:
//!
//! - [`OutgoingBuffer`] - append-only byte sink with nested
//!   length-prefixed encapsulations (reserve-then-patch size fields)
//! - [`IncomingCursor`] - bounds-checked cursor over received bytes,
//!   encapsulation-aware for forward-compatible skipping
//!
//! Neither type is internally synchronized; concurrent passes use
//! distinct instances. The per-encapsulation value indirection tables
//! live inside the buffers and die with the pass.

mod incoming;
mod outgoing;

pub use incoming::{IncomingCursor, IncomingEncapsulation};
pub use outgoing::{OutgoingBuffer, OutgoingEncapsulation};
