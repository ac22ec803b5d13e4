//! Exactly-one reply per command.
//!
//! [`Responder::respond`] takes `self`, so a responder can answer once and
//! only once. The facade hands every dispatched command's result to exactly
//! one responder.

use crossbeam_channel::Sender;
use ember_core::{BridgeError, BridgeResult, Value};

/// Result of one host command.
pub type Reply = BridgeResult<Value>;

/// Receives the single reply of a command.
pub trait Responder: Send {
    /// Delivers the reply.
    fn respond(self, reply: Reply);
}

/// Responder backed by a closure.
pub struct FnResponder<F>(pub F);

impl<F> Responder for FnResponder<F>
where
    F: FnOnce(Reply) + Send,
{
    fn respond(self, reply: Reply) {
        (self.0)(reply);
    }
}

/// Responder that forwards the reply into a channel.
pub struct ChannelResponder(pub Sender<Reply>);

impl Responder for ChannelResponder {
    fn respond(self, reply: Reply) {
        if self.0.send(reply).is_err() {
            tracing::debug!("reply receiver dropped");
        }
    }
}

/// Error in the shape host codecs expect: a stable code, a message and
/// optional details.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorReply {
    /// Stable code such as `"INVALID_STATE"`.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Native status for `NATIVE_CALL_FAILED`, otherwise null.
    pub details: Value,
}

impl From<&BridgeError> for ErrorReply {
    fn from(error: &BridgeError) -> Self {
        let details = match error {
            BridgeError::NativeCallFailed { status, .. } => status.clone(),
            _ => Value::Null,
        };
        Self {
            code: error.code(),
            message: error.to_string(),
            details,
        }
    }
}
