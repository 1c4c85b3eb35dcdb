//! Actor System Errors
//!
//! Every failure inside the runtime is funneled into one replaceable error
//! handler. Errors are observability signals: nothing is retried, restarted or
//! redelivered because of them.

use crate::reference::ActorRef;
use network::TransportError;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors reported by the actor runtime
#[derive(Error, Debug)]
pub enum ActorError {
    /// Message could not be encoded by the sender
    #[error("Encode error: {message}")]
    Encode {
        message: String,
        #[source]
        source: bincode::Error,
    },

    /// Payload could not be decoded by the receiver
    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: bincode::Error,
    },

    /// Target does not exist in its runtime
    #[error("Tell called for invalid local ActorRef, or ChannelRef used twice ({target})")]
    InvalidRef { target: ActorRef },

    /// Response channel was claimed by an earlier message
    #[error("ChannelRef used twice ({target})")]
    ChannelReused { target: ActorRef },

    /// Dialing or writing to a remote runtime failed
    #[error("Transport error for {address}: {source}")]
    Transport {
        address: String,
        #[source]
        source: TransportError,
    },

    /// Actor received a message its handler cannot interpret
    #[error("Unexpected message for actor {actor}: {message}")]
    UnexpectedMessage { actor: ActorRef, message: String },

    /// Handler returned an error
    #[error("Actor {actor} failed: {message}")]
    Handler { actor: ActorRef, message: String },

    /// Runtime could not start
    #[error("Startup error: {message}")]
    Startup {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for actor operations
pub type Result<T> = std::result::Result<T, ActorError>;

impl ActorError {
    pub fn encode(source: bincode::Error) -> Self {
        Self::Encode {
            message: source.to_string(),
            source,
        }
    }

    pub fn decode(source: bincode::Error) -> Self {
        Self::Decode {
            message: source.to_string(),
            source,
        }
    }

    pub fn transport(address: impl Into<String>, source: TransportError) -> Self {
        Self::Transport {
            address: address.into(),
            source,
        }
    }

    pub fn unexpected_message(actor: &ActorRef, message: impl Into<String>) -> Self {
        Self::UnexpectedMessage {
            actor: actor.clone(),
            message: message.into(),
        }
    }

    pub fn handler(actor: &ActorRef, message: impl Into<String>) -> Self {
        Self::Handler {
            actor: actor.clone(),
            message: message.into(),
        }
    }

    /// Error taxonomy bucket for logging
    pub fn category(&self) -> &'static str {
        match self {
            ActorError::Encode { .. } | ActorError::Decode { .. } => "codec",
            ActorError::InvalidRef { .. } | ActorError::ChannelReused { .. } => "addressing",
            ActorError::Transport { .. } | ActorError::Startup { .. } => "transport",
            ActorError::UnexpectedMessage { .. } | ActorError::Handler { .. } => "application",
        }
    }
}

/// Callback receiving runtime errors
pub type ErrorHandler = Arc<dyn Fn(&ActorError) + Send + Sync>;

/// Shared slot for the current error handler
#[derive(Clone, Default)]
pub(crate) struct ErrorSink {
    handler: Arc<Mutex<Option<ErrorHandler>>>,
}

impl ErrorSink {
    /// Replace the current handler
    pub(crate) fn set(&self, handler: ErrorHandler) {
        *self.handler.lock() = Some(handler);
    }

    /// Report on a best-effort basis; logs when no handler is installed
    pub(crate) fn report(&self, error: ActorError) {
        // Clone out so the handler may itself call on_error
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => handler(&error),
            None => warn!(
                error = %error,
                category = error.category(),
                "Actor system error"
            ),
        }
    }
}
