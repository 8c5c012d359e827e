use crate::descriptor::Scalar;
use crate::error::CodecError;
use crate::handle::Handle;
use crate::marshal::Marshal;
use crate::object::{same_object, RemoteObject};
use std::sync::Arc;

/// A value as it crosses the boundary.
///
/// `Ref` only exists locally: on encode it becomes a handle (for proxies and
/// exported interfaces) or a by-value object.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Bool(bool),
    Float(f32),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Handle(Handle),
    Object(Arc<dyn Marshal>),
    Ref(Arc<dyn RemoteObject>),
}

impl Value {
    pub fn object<T: Marshal>(value: T) -> Self {
        Value::Object(Arc::new(value))
    }

    pub fn reference<T: RemoteObject>(object: Arc<T>) -> Self {
        Value::Ref(object)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn scalar(&self) -> Option<Scalar> {
        match self {
            Value::Bool(_) => Some(Scalar::Bool),
            Value::Byte(_) => Some(Scalar::Byte),
            Value::Short(_) => Some(Scalar::Short),
            Value::Int(_) => Some(Scalar::Int),
            Value::Long(_) => Some(Scalar::Long),
            Value::Float(_) => Some(Scalar::Float),
            Value::Double(_) => Some(Scalar::Double),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Bool(_) => "boolean",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Handle(_) => "handle",
            Value::Object(_) => "object",
            Value::Ref(_) => "reference",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Value::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn Marshal>> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_ref_object(&self) -> Option<&Arc<dyn RemoteObject>> {
        match self {
            Value::Ref(object) => Some(object),
            _ => None,
        }
    }

    /// Borrows a by-value object as its concrete type.
    pub fn downcast_object<T: Marshal>(&self) -> Option<&T> {
        self.as_object()
            .and_then(|object| object.as_any().downcast_ref::<T>())
    }

    pub fn into_ref_object(self) -> Option<Arc<dyn RemoteObject>> {
        match self {
            Value::Ref(object) => Some(object),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Handle(a), Value::Handle(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.type_name() == b.type_name() && a.properties() == b.properties()
            }
            (Value::Ref(a), Value::Ref(b)) => match (a.remote_handle(), b.remote_handle()) {
                (Some(ha), Some(hb)) => ha == hb,
                _ => same_object(a, b),
            },
            _ => false,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    bool => Bool,
    f32 => Float,
    f64 => Double,
    String => String,
    Handle => Handle,
    Vec<Value> => Array,
    Arc<dyn Marshal> => Object,
    Arc<dyn RemoteObject> => Ref,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

macro_rules! value_try_into {
    ($($ty:ty => $variant:ident, $expected:literal),* $(,)?) => {
        $(
            impl TryFrom<Value> for $ty {
                type Error = CodecError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(CodecError::unexpected($expected, other.kind_name())),
                    }
                }
            }
        )*
    };
}

value_try_into! {
    i8 => Byte, "byte",
    i16 => Short, "short",
    i32 => Int, "int",
    i64 => Long, "long",
    bool => Bool, "boolean",
    f32 => Float, "float",
    f64 => Double, "double",
    String => String, "string",
    Handle => Handle, "handle",
    Vec<Value> => Array, "array",
}

impl TryFrom<Value> for Option<String> {
    type Error = CodecError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(CodecError::unexpected("string or null", other.kind_name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(5i32), Value::Int(5));
        assert_eq!(Value::from("x"), Value::String("x".into()));
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some(2i64)), Value::Long(2));

        let n: i32 = Value::Int(7).try_into().unwrap();
        assert_eq!(n, 7);
        let err = i32::try_from(Value::Long(7)).unwrap_err();
        assert!(matches!(err, CodecError::Unexpected { expected: "int", .. }));

        let s: Option<String> = Value::Null.try_into().unwrap();
        assert_eq!(s, None);
    }

    #[test]
    fn test_scalar_classification() {
        assert_eq!(Value::Short(1).scalar(), Some(Scalar::Short));
        assert_eq!(Value::Null.scalar(), None);
        assert_eq!(Value::from("s").scalar(), None);
    }

    #[test]
    fn test_equality_is_type_strict() {
        assert_ne!(Value::Int(1), Value::Long(1));
        assert_ne!(Value::Float(1.0), Value::Double(1.0));
        assert_eq!(
            Value::Array(vec![Value::Null, Value::Int(2)]),
            Value::Array(vec![Value::Null, Value::Int(2)])
        );
    }
}
