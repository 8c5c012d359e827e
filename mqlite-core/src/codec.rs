//! Binary value stream.
//!
//! Values are written and read sequentially in the order the protocol
//! agrees on. Every value is prefixed with a one byte tag, so a stream can
//! be decoded without a schema. Multi-byte numbers are big-endian; strings
//! carry a `u16` length prefix.

use crate::error::CodecError;
use crate::handle::Handle;
use crate::ids::HandleId;
use crate::marshal::{Marshal, TypeRegistry};
use crate::value::Value;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::sync::Arc;

pub mod tag {
    pub const INTEGER: u8 = 1;
    pub const BOOLEAN: u8 = 2;
    pub const DOUBLE: u8 = 3;
    pub const STRING: u8 = 4;
    pub const ARRAY: u8 = 5;
    pub const FLOAT: u8 = 6;
    pub const LONG: u8 = 7;
    pub const SHORT: u8 = 8;
    pub const BYTE: u8 = 9;
    pub const OBJECT: u8 = 10;
    pub const NULL: u8 = 11;
    pub const HANDLE: u8 = 12;
}

/// Encodes a single value.
pub fn encode_value(value: &Value) -> Result<Bytes, CodecError> {
    let mut writer = WireWriter::new();
    writer.write(value)?;
    Ok(writer.finish())
}

/// Decodes the first value in `data`.
pub fn decode_value(data: &[u8], types: &TypeRegistry) -> Result<Value, CodecError> {
    WireReader::new(Bytes::copy_from_slice(data), types).read()
}

#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        WireWriter {
            buf: BytesMut::with_capacity(256),
        }
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write(&mut self, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null => self.buf.put_u8(tag::NULL),
            Value::Int(v) => {
                self.buf.put_u8(tag::INTEGER);
                self.buf.put_i32(*v);
            }
            Value::Byte(v) => {
                self.buf.put_u8(tag::BYTE);
                self.buf.put_i8(*v);
            }
            Value::Long(v) => {
                self.buf.put_u8(tag::LONG);
                self.buf.put_i64(*v);
            }
            Value::Short(v) => {
                self.buf.put_u8(tag::SHORT);
                self.buf.put_i16(*v);
            }
            Value::Bool(v) => {
                self.buf.put_u8(tag::BOOLEAN);
                self.buf.put_u8(u8::from(*v));
            }
            Value::Double(v) => {
                self.buf.put_u8(tag::DOUBLE);
                self.buf.put_f64(*v);
            }
            Value::Float(v) => {
                self.buf.put_u8(tag::FLOAT);
                self.buf.put_f32(*v);
            }
            Value::String(s) => {
                self.buf.put_u8(tag::STRING);
                self.put_utf(s)?;
            }
            Value::Handle(handle) => self.write_handle(handle)?,
            Value::Ref(object) => {
                if let Some(handle) = object.remote_handle() {
                    self.write_handle(handle)?;
                } else if let Some(by_value) = object.by_value() {
                    self.write_object(by_value.as_ref())?;
                } else {
                    return Err(CodecError::NotMarshalable(object.type_name().to_string()));
                }
            }
            Value::Array(items) => {
                self.buf.put_u8(tag::ARRAY);
                self.put_len(items.len())?;
                for item in items {
                    self.write(item)?;
                }
            }
            Value::Object(object) => self.write_object(object.as_ref())?,
        }
        Ok(())
    }

    fn write_handle(&mut self, handle: &Handle) -> Result<(), CodecError> {
        let id = i32::try_from(handle.id().as_u32())
            .map_err(|_| CodecError::InvalidHandle(handle.to_string()))?;
        self.buf.put_u8(tag::HANDLE);
        self.write(&Value::Int(id))?;
        self.write(&Value::from(handle.owner()))?;
        self.write(&Value::from(handle.queue()))?;
        self.write(&Value::from(handle.interface()))
    }

    fn write_object(&mut self, object: &dyn Marshal) -> Result<(), CodecError> {
        let properties = object.properties();
        self.buf.put_u8(tag::OBJECT);
        self.put_utf(object.type_name())?;
        self.put_len(properties.len())?;
        for (name, value) in &properties {
            self.put_utf(name)?;
            self.write(value)?;
        }
        Ok(())
    }

    fn put_utf(&mut self, s: &str) -> Result<(), CodecError> {
        let len = u16::try_from(s.len()).map_err(|_| CodecError::StringTooLong(s.len()))?;
        self.buf.put_u16(len);
        self.buf.put_slice(s.as_bytes());
        Ok(())
    }

    fn put_len(&mut self, len: usize) -> Result<(), CodecError> {
        let len = i32::try_from(len).map_err(|_| CodecError::InvalidLength(len as i64))?;
        self.buf.put_i32(len);
        Ok(())
    }
}

/// Deepest nesting of arrays and objects a reader accepts.
pub const MAX_DEPTH: usize = 128;

/// Sequential reader over one message body.
pub struct WireReader<'a> {
    buf: Bytes,
    types: &'a TypeRegistry,
    depth: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: Bytes, types: &'a TypeRegistry) -> Self {
        WireReader { buf, types, depth: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_exhausted(&self) -> bool {
        !self.buf.has_remaining()
    }

    pub fn read(&mut self) -> Result<Value, CodecError> {
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let value = self.read_tagged();
        self.depth -= 1;
        value
    }

    fn read_tagged(&mut self) -> Result<Value, CodecError> {
        let tag = self.get_u8()?;
        match tag {
            tag::NULL => Ok(Value::Null),
            tag::INTEGER => {
                self.need(4)?;
                Ok(Value::Int(self.buf.get_i32()))
            }
            tag::BYTE => {
                self.need(1)?;
                Ok(Value::Byte(self.buf.get_i8()))
            }
            tag::LONG => {
                self.need(8)?;
                Ok(Value::Long(self.buf.get_i64()))
            }
            tag::SHORT => {
                self.need(2)?;
                Ok(Value::Short(self.buf.get_i16()))
            }
            tag::BOOLEAN => Ok(Value::Bool(self.get_u8()? != 0)),
            tag::DOUBLE => {
                self.need(8)?;
                Ok(Value::Double(self.buf.get_f64()))
            }
            tag::FLOAT => {
                self.need(4)?;
                Ok(Value::Float(self.buf.get_f32()))
            }
            tag::STRING => Ok(Value::String(self.get_utf()?)),
            tag::HANDLE => Ok(Value::Handle(self.read_handle_body()?)),
            tag::OBJECT => self.read_object_body(),
            tag::ARRAY => {
                let len = self.get_len()?;
                let mut items = Vec::with_capacity(len.min(self.remaining()));
                for _ in 0..len {
                    items.push(self.read()?);
                }
                Ok(Value::Array(items))
            }
            other => Err(CodecError::UnknownTag(other)),
        }
    }

    /// Reads a tagged byte value, the shape message and status tags take.
    pub fn read_byte(&mut self) -> Result<i8, CodecError> {
        match self.read()? {
            Value::Byte(b) => Ok(b),
            other => Err(CodecError::unexpected("byte", other.kind_name())),
        }
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.read()? {
            Value::Bool(b) => Ok(b),
            other => Err(CodecError::unexpected("boolean", other.kind_name())),
        }
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        match self.read()? {
            Value::String(s) => Ok(s),
            other => Err(CodecError::unexpected("string", other.kind_name())),
        }
    }

    pub fn read_optional_string(&mut self) -> Result<Option<String>, CodecError> {
        match self.read()? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(CodecError::unexpected("string or null", other.kind_name())),
        }
    }

    pub fn read_handle(&mut self) -> Result<Handle, CodecError> {
        self.read_optional_handle()?
            .ok_or_else(|| CodecError::unexpected("handle", "null"))
    }

    pub fn read_optional_handle(&mut self) -> Result<Option<Handle>, CodecError> {
        match self.read()? {
            Value::Null => Ok(None),
            Value::Handle(h) => Ok(Some(h)),
            other => Err(CodecError::unexpected("handle or null", other.kind_name())),
        }
    }

    /// Reads an argument array; null reads as no arguments.
    pub fn read_array(&mut self) -> Result<Vec<Value>, CodecError> {
        match self.read()? {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items),
            other => Err(CodecError::unexpected("array", other.kind_name())),
        }
    }

    fn read_handle_body(&mut self) -> Result<Handle, CodecError> {
        let id = match self.read()? {
            Value::Int(id) if id > 0 => id as u32,
            other => return Err(CodecError::InvalidHandle(format!("bad id {:?}", other))),
        };
        let owner = self.read_string()?;
        let queue = self.read_string()?;
        let interface = self.read_string()?;
        Ok(Handle::new(HandleId::new(id), interface, owner, queue))
    }

    fn read_object_body(&mut self) -> Result<Value, CodecError> {
        let type_name = self.get_utf()?;
        let mut instance = self.types.instantiate(&type_name)?;
        let count = self.get_len()?;
        for _ in 0..count {
            let name = self.get_utf()?;
            let value = self.read()?;
            if !instance.set_property(&name, value)? {
                tracing::trace!(type_name = %type_name, property = %name, "no mutator, property dropped");
            }
        }
        Ok(Value::Object(Arc::from(instance)))
    }

    fn need(&self, n: usize) -> Result<(), CodecError> {
        if self.buf.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn get_u8(&mut self) -> Result<u8, CodecError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn get_len(&mut self) -> Result<usize, CodecError> {
        self.need(4)?;
        let len = self.buf.get_i32();
        usize::try_from(len).map_err(|_| CodecError::InvalidLength(len as i64))
    }

    fn get_utf(&mut self) -> Result<String, CodecError> {
        self.need(2)?;
        let len = self.buf.get_u16() as usize;
        self.need(len)?;
        let raw = self.buf.split_to(len);
        std::str::from_utf8(&raw)
            .map(str::to_owned)
            .map_err(|e| CodecError::InvalidUtf8(e.to_string()))
    }
}
