//! Context passed to operation handlers.

use crate::buffer::{IncomingCursor, OutgoingBuffer};
use crate::error::Result;
use crate::identity::Identity;
use crate::protocol::{OperationId, OperationMode};
use crate::value::{ValueFactoryRegistry, ValueRef};

/// Everything a handler needs for one invocation.
///
/// `args` is positioned inside the request's argument encapsulation;
/// `results` writes into the reply's result encapsulation. Both belong to
/// this dispatch pass only.
pub struct DispatchContext<'a, 'b> {
    /// Identity the request addressed.
    pub identity: &'a Identity,
    /// Facet the request addressed, if any.
    pub facet: Option<&'a str>,
    /// Operation being invoked.
    pub operation: &'a OperationId,
    /// Invocation mode the caller requested.
    pub mode: OperationMode,
    /// Factories for decoding polymorphic arguments.
    pub factories: &'a ValueFactoryRegistry,
    /// Cursor over the argument encapsulation.
    pub args: &'b mut IncomingCursor<'a>,
    /// Sink for the result encapsulation.
    pub results: &'b mut OutgoingBuffer,
}

impl DispatchContext<'_, '_> {
    /// Read a polymorphic argument, resolving types through this
    /// context's factory registry.
    pub fn read_value(&mut self) -> Result<Option<ValueRef>> {
        self.args.read_value(self.factories)
    }

    /// Write a polymorphic result.
    pub fn write_value(&mut self, value: Option<&ValueRef>) -> Result<()> {
        self.results.write_value(value)
    }
}
