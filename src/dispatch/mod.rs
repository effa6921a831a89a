//! Dispatch engine - from decoded request to encoded reply.
//!
//! Provides:
//! - [`DispatchTable`] - ordered operation entries per servant type, with
//!   base tables for the interface hierarchy
//! - [`ServantRegistry`] - maps identity + facet to a servant's table
//! - [`DispatchContext`] - what a handler sees: target metadata, argument
//!   cursor, result buffer
//! - [`dispatch_message`] / [`dispatch_request`] - the entry points
//!
//! # Example
//!
//! ```ignore
//! let mut registry = ServantRegistry::new();
//! registry.add(
//!     Identity::named("counter"),
//!     DispatchTable::new("::demo::Counter").operation("add", move |ctx| {
//!         let amount = ctx.args.read_varint_signed()?;
//!         ctx.results.write_varint_signed(amount + 1);
//!         Ok(OperationOutcome::Ok)
//!     }),
//! )?;
//!
//! let reply = dispatch_message(&registry, &factories, &message)?;
//! ```

mod context;
mod engine;
mod registry;
mod table;

pub use context::DispatchContext;
pub use engine::{dispatch_message, dispatch_request};
pub use registry::ServantRegistry;
pub use table::{DispatchTable, OperationEntry, OperationHandler, OperationOutcome};
