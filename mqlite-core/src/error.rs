use crate::handle::Handle;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error kinds produced by the runtime itself. Object implementations are
/// free to use their own kinds.
pub mod kinds {
    pub const OBJECT_NOT_FOUND: &str = "ObjectNotFound";
    pub const METHOD_NOT_FOUND: &str = "MethodNotFound";
    pub const ILLEGAL_ARGUMENT: &str = "IllegalArgument";
    pub const READ_ERROR: &str = "ReadError";
    pub const WRITE_ERROR: &str = "WriteError";
    pub const INTERNAL: &str = "Internal";
}

/// A named error as it travels on the wire: a type name plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: String,
    pub message: String,
}

impl Fault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Fault {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn object_not_found(handle: &Handle) -> Self {
        Self::new(
            kinds::OBJECT_NOT_FOUND,
            format!("Could not find local object: {}", handle),
        )
    }

    pub fn method_not_found(method: &str, type_name: &str) -> Self {
        Self::new(
            kinds::METHOD_NOT_FOUND,
            format!(
                "Could not find method: {} on object of type {}",
                method, type_name
            ),
        )
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(kinds::ILLEGAL_ARGUMENT, message)
    }

    pub fn read_error(message: impl Into<String>) -> Self {
        Self::new(kinds::READ_ERROR, message)
    }

    pub fn write_error(message: impl Into<String>) -> Self {
        Self::new(kinds::WRITE_ERROR, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(kinds::INTERNAL, message)
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Fault {}

/// Format and construction failures of the wire codec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("Unknown type while reading message: {0}")]
    UnknownTag(u8),

    #[error("Truncated message: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("Invalid UTF-8 in string: {0}")]
    InvalidUtf8(String),

    #[error("String of {0} bytes exceeds the 65535 byte limit")]
    StringTooLong(usize),

    #[error("Invalid length {0}")]
    InvalidLength(i64),

    #[error("Values nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("Expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
    },

    #[error("Cannot construct {0}: no default constructor registered")]
    Construction(String),

    #[error("Object of type {0} cannot be sent by value")]
    NotMarshalable(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Property {property} of {type_name}: {reason}")]
    Property {
        type_name: String,
        property: String,
        reason: String,
    },
}

impl CodecError {
    pub fn unexpected(expected: &'static str, found: impl fmt::Debug) -> Self {
        CodecError::Unexpected {
            expected,
            found: format!("{:?}", found),
        }
    }
}

/// Configuration and resolution errors raised by the handle table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("Only objects that implement registered interfaces can be published: {0}")]
    NotAnInterface(String),

    #[error("Object of type {type_name} does not implement {interface}")]
    NotImplemented { type_name: String, interface: String },

    #[error("Could not find local object: {0}")]
    HandleNotFound(Handle),

    #[error("No proxy can be built for unregistered interface {0}")]
    UnknownInterface(String),
}

impl From<TableError> for Fault {
    fn from(err: TableError) -> Self {
        match &err {
            TableError::HandleNotFound(handle) => Fault::object_not_found(handle),
            _ => Fault::illegal_argument(err.to_string()),
        }
    }
}

impl From<CodecError> for Fault {
    fn from(err: CodecError) -> Self {
        Fault::read_error(err.to_string())
    }
}

/// Errors surfaced to callers of the RPC client and endpoint.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    /// The remote side reported a named error.
    #[error("RemoteError: {kind}: {message}")]
    Remote { kind: String, message: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{method} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("Method {method} is not declared on {interface}")]
    MethodNotFound { interface: String, method: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Client closed before a response arrived")]
    Closed,
}

impl RpcError {
    pub fn remote_kind(&self) -> Option<&str> {
        match self {
            RpcError::Remote { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

impl From<Fault> for RpcError {
    fn from(fault: Fault) -> Self {
        RpcError::Remote {
            kind: fault.kind,
            message: fault.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::HandleId;

    fn handle() -> Handle {
        Handle::new(
            HandleId::new(3),
            "demo.Greeter",
            "memory://localhost",
            "server-request",
        )
    }

    #[test]
    fn test_fault_display() {
        let fault = Fault::new("IllegalAccess", "We do not expect this");
        assert_eq!(fault.to_string(), "IllegalAccess: We do not expect this");
        assert!(fault.is_kind("IllegalAccess"));
    }

    #[test]
    fn test_table_error_maps_to_object_not_found() {
        let fault: Fault = TableError::HandleNotFound(handle()).into();
        assert_eq!(fault.kind, kinds::OBJECT_NOT_FOUND);
        assert!(fault.message.contains("demo.Greeter"));
    }

    #[test]
    fn test_remote_error_carries_kind_and_message() {
        let err: RpcError = Fault::new("IllegalAccess", "nope").into();
        assert_eq!(err.remote_kind(), Some("IllegalAccess"));
        assert_eq!(err.to_string(), "RemoteError: IllegalAccess: nope");
    }

    #[test]
    fn test_codec_error_becomes_read_error() {
        let fault: Fault = CodecError::UnknownTag(99).into();
        assert_eq!(fault.kind, kinds::READ_ERROR);
        assert!(fault.message.contains("99"));
    }

    #[test]
    fn test_fault_serialization() {
        let fault = Fault::method_not_found("frobnicate", "demo.Impl");
        let json = serde_json::to_string(&fault).unwrap();
        let back: Fault = serde_json::from_str(&json).unwrap();
        assert_eq!(fault, back);
    }
}
