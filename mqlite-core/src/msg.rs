use crate::codec::WireReader;
use crate::codec::WireWriter;
use crate::error::{CodecError, Fault};
use crate::handle::Handle;
use crate::marshal::TypeRegistry;
use crate::value::Value;
use bytes::Bytes;

/// Leading tag of every request and response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Lookup = 1,
    Call = 2,
    Remove = 3,
}

impl MessageType {
    pub fn as_byte(self) -> i8 {
        self as i8
    }
}

impl TryFrom<i8> for MessageType {
    type Error = CodecError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageType::Lookup),
            2 => Ok(MessageType::Call),
            3 => Ok(MessageType::Remove),
            other => Err(CodecError::unexpected("message type 1..=3", other)),
        }
    }
}

const CALL_SUCCESS: i8 = 0;
const CALL_ERROR: i8 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Lookup {
        interface: String,
    },
    Call {
        target: Handle,
        method: String,
        args: Vec<Value>,
    },
    Remove {
        handle: Handle,
    },
}

impl Request {
    pub fn message_type(&self) -> MessageType {
        match self {
            Request::Lookup { .. } => MessageType::Lookup,
            Request::Call { .. } => MessageType::Call,
            Request::Remove { .. } => MessageType::Remove,
        }
    }

    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let mut w = WireWriter::new();
        w.write(&Value::Byte(self.message_type().as_byte()))?;
        match self {
            Request::Lookup { interface } => w.write(&Value::from(interface.as_str()))?,
            Request::Call {
                target,
                method,
                args,
            } => {
                w.write(&Value::Handle(target.clone()))?;
                w.write(&Value::from(method.as_str()))?;
                w.write(&Value::Array(args.clone()))?;
            }
            Request::Remove { handle } => w.write(&Value::Handle(handle.clone()))?,
        }
        Ok(w.finish())
    }

    pub fn decode(payload: Bytes, types: &TypeRegistry) -> Result<Self, CodecError> {
        let mut r = WireReader::new(payload, types);
        match MessageType::try_from(r.read_byte()?)? {
            MessageType::Lookup => Ok(Request::Lookup {
                interface: r.read_string()?,
            }),
            MessageType::Call => Ok(Request::Call {
                target: r.read_handle()?,
                method: r.read_string()?,
                args: r.read_array()?,
            }),
            MessageType::Remove => Ok(Request::Remove {
                handle: r.read_handle()?,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Lookup(Option<Handle>),
    Call(Result<Value, Fault>),
    Remove(bool),
}

impl Response {
    pub fn message_type(&self) -> MessageType {
        match self {
            Response::Lookup(_) => MessageType::Lookup,
            Response::Call(_) => MessageType::Call,
            Response::Remove(_) => MessageType::Remove,
        }
    }

    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let mut w = WireWriter::new();
        w.write(&Value::Byte(self.message_type().as_byte()))?;
        match self {
            Response::Lookup(handle) => w.write(&Value::from(handle.clone()))?,
            Response::Call(Ok(value)) => {
                w.write(&Value::Byte(CALL_SUCCESS))?;
                w.write(value)?;
            }
            Response::Call(Err(fault)) => {
                w.write(&Value::Byte(CALL_ERROR))?;
                w.write(&Value::from(fault.kind.as_str()))?;
                w.write(&Value::from(fault.message.as_str()))?;
            }
            Response::Remove(removed) => w.write(&Value::Bool(*removed))?,
        }
        Ok(w.finish())
    }

    pub fn decode(payload: Bytes, types: &TypeRegistry) -> Result<Self, CodecError> {
        let mut r = WireReader::new(payload, types);
        match MessageType::try_from(r.read_byte()?)? {
            MessageType::Lookup => Ok(Response::Lookup(r.read_optional_handle()?)),
            MessageType::Call => match r.read_byte()? {
                CALL_SUCCESS => Ok(Response::Call(Ok(r.read()?))),
                CALL_ERROR => {
                    let kind = r.read_string()?;
                    let message = r.read_optional_string()?.unwrap_or_default();
                    Ok(Response::Call(Err(Fault::new(kind, message))))
                }
                other => Err(CodecError::unexpected("call status 0 or 1", other)),
            },
            MessageType::Remove => Ok(Response::Remove(r.read_bool()?)),
        }
    }
}

/// Message type of a payload without decoding the rest of it.
pub fn peek_message_type(payload: &[u8]) -> Result<MessageType, CodecError> {
    match payload {
        [crate::codec::tag::BYTE, b, ..] => MessageType::try_from(*b as i8),
        [] | [_] => Err(CodecError::Truncated {
            needed: 2,
            remaining: payload.len(),
        }),
        [t, ..] => Err(CodecError::unexpected("byte tag", *t)),
    }
}
