//! Dispatch entry points.
//!
//! [`dispatch_message`] routes a framed message; [`dispatch_request`]
//! resolves a decoded request to a servant operation, invokes it, and
//! encodes the reply message. Lookup failures and codec errors become
//! reply statuses when a reply is owed; a one-way request never produces
//! one, so its failures are logged and swallowed.

use bytes::Bytes;

use crate::buffer::{IncomingCursor, OutgoingBuffer};
use crate::error::{ObjwireError, RequestFailure, Result};
use crate::protocol::{Message, MessageKind, Reply, ReplyBody, ReplyStatus, Request};
use crate::value::ValueFactoryRegistry;

use super::context::DispatchContext;
use super::registry::ServantRegistry;
use super::table::OperationOutcome;

/// Dispatch one framed message, returning the encoded reply message when
/// one is owed.
///
/// Validate and close messages carry nothing to dispatch and yield `None`.
/// A reply message is the caller side's to decode; handing one to the
/// server-side engine is a protocol error.
///
/// # Errors
///
/// Propagates a request-body decode failure only when no reply can carry
/// it (the request id is unreadable or marks the request one-way); the
/// transport then applies its connection policy.
pub fn dispatch_message(
    registry: &ServantRegistry,
    factories: &ValueFactoryRegistry,
    message: &Message,
) -> Result<Option<Bytes>> {
    match message.kind() {
        MessageKind::Request => match Request::decode(&message.body) {
            Ok(request) => dispatch_request(registry, factories, &request),
            Err(error) => reply_to_undecodable_request(&message.body, error),
        },
        MessageKind::Reply => Err(ObjwireError::Protocol(
            "reply message cannot be dispatched".to_string(),
        )),
        MessageKind::Validate | MessageKind::Close => {
            tracing::debug!(kind = ?message.kind(), "control message, nothing to dispatch");
            Ok(None)
        }
    }
}

/// Dispatch one decoded request.
///
/// Resolution order: identity ([`NoObject`](ObjwireError::NoObject)),
/// facet ([`NoFacet`](ObjwireError::NoFacet)), operation across the
/// servant's hierarchy ([`NoOperation`](ObjwireError::NoOperation)). A
/// matched handler runs with its arguments cursor inside the request
/// encapsulation and its results inside a fresh reply encapsulation.
///
/// Returns the encoded reply message, or `None` for a one-way request.
pub fn dispatch_request(
    registry: &ServantRegistry,
    factories: &ValueFactoryRegistry,
    request: &Request,
) -> Result<Option<Bytes>> {
    match invoke(registry, factories, request) {
        Ok((status, results)) => {
            if request.is_oneway() {
                return Ok(None);
            }
            let reply = Reply {
                request_id: request.request_id,
                status,
                body: ReplyBody::Results(results),
            };
            Ok(Some(reply.to_message().encode()))
        }
        Err(error) => {
            if request.is_oneway() {
                tracing::warn!(
                    identity = %request.identity,
                    operation = %request.operation,
                    error = %error,
                    "one-way dispatch failed, no reply owed"
                );
                return Ok(None);
            }
            let reply = reply_for_error(request.request_id, error);
            Ok(Some(reply.to_message().encode()))
        }
    }
}

fn invoke(
    registry: &ServantRegistry,
    factories: &ValueFactoryRegistry,
    request: &Request,
) -> Result<(ReplyStatus, Bytes)> {
    let failure = || RequestFailure {
        identity: request.identity.clone(),
        facet: request.facet.clone(),
        operation: request.operation.clone(),
    };

    if request.identity.is_empty() || !registry.contains_identity(&request.identity) {
        return Err(ObjwireError::NoObject(failure()));
    }
    let Some(table) = registry.find(&request.identity, request.facet.as_deref()) else {
        return Err(ObjwireError::NoFacet(failure()));
    };
    let Some(handler) = table.lookup(&request.operation) else {
        return Err(ObjwireError::NoOperation(failure()));
    };

    let mut cursor = IncomingCursor::new(&request.args);
    let mut results = OutgoingBuffer::new();
    let outcome;
    {
        let mut args = cursor.begin_encapsulation()?;
        let mut result_encaps = results.begin_encapsulation();
        let mut ctx = DispatchContext {
            identity: &request.identity,
            facet: request.facet.as_deref(),
            operation: &request.operation,
            mode: request.mode,
            factories,
            args: &mut *args,
            results: &mut *result_encaps,
        };
        outcome = handler(&mut ctx)?;
        args.end();
        result_encaps.end();
    }

    let status = match outcome {
        OperationOutcome::Ok => ReplyStatus::Ok,
        OperationOutcome::UserException => ReplyStatus::UserException,
    };
    Ok((status, results.into_bytes()))
}

/// Best effort for a request body that would not decode: a reply is still
/// owed if the request id is readable and non-zero.
fn reply_to_undecodable_request(body: &[u8], error: ObjwireError) -> Result<Option<Bytes>> {
    if body.len() < 4 {
        return Err(error);
    }
    let request_id = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
    if request_id == 0 {
        tracing::warn!(error = %error, "undecodable one-way request dropped");
        return Ok(None);
    }
    let reply = reply_for_error(request_id, error);
    Ok(Some(reply.to_message().encode()))
}

fn reply_for_error(request_id: u32, error: ObjwireError) -> Reply {
    match error {
        ObjwireError::NoObject(failure) => {
            Reply::not_found(request_id, ReplyStatus::NoObject, failure)
        }
        ObjwireError::NoFacet(failure) => {
            Reply::not_found(request_id, ReplyStatus::NoFacet, failure)
        }
        ObjwireError::NoOperation(failure) => {
            Reply::not_found(request_id, ReplyStatus::NoOperation, failure)
        }
        ObjwireError::Unmarshal(reason) => Reply::unmarshal_failure(request_id, reason),
        other => Reply::unknown_exception(request_id, other.to_string()),
    }
}
