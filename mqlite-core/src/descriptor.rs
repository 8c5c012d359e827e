//! Declared shapes of remotely callable methods.
//!
//! An endpoint knows an interface only through its [`InterfaceDescriptor`]:
//! proxies are built from it, argument counts are validated against it and
//! exported parameters are recognised through it.

use crate::value::Value;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// The fixed-width scalar types of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Scalar {
    pub fn name(&self) -> &'static str {
        match self {
            Scalar::Bool => "boolean",
            Scalar::Byte => "byte",
            Scalar::Short => "short",
            Scalar::Int => "int",
            Scalar::Long => "long",
            Scalar::Float => "float",
            Scalar::Double => "double",
        }
    }
}

/// Declared type of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSpec {
    Void,
    /// Exactly this scalar, never null.
    Primitive(Scalar),
    /// This scalar or null.
    Boxed(Scalar),
    String,
    /// Any object implementing the named interface.
    Interface(String),
    /// A by-value object of the named type.
    Object(String),
    Array,
    Any,
}

impl TypeSpec {
    pub fn interface(name: impl Into<String>) -> Self {
        TypeSpec::Interface(name.into())
    }

    pub fn object(type_name: impl Into<String>) -> Self {
        TypeSpec::Object(type_name.into())
    }

    /// Interface name if this is an interface type.
    pub fn interface_name(&self) -> Option<&str> {
        match self {
            TypeSpec::Interface(name) => Some(name),
            _ => None,
        }
    }

    /// Whether a decoded (and resolved) argument fits this declared type.
    ///
    /// Primitives must match the scalar exactly and reject null; reference
    /// types accept null or any assignable value.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            TypeSpec::Void => value.is_null(),
            TypeSpec::Primitive(scalar) => value.scalar() == Some(*scalar),
            TypeSpec::Boxed(scalar) => value.is_null() || value.scalar() == Some(*scalar),
            TypeSpec::String => matches!(value, Value::Null | Value::String(_)),
            TypeSpec::Interface(name) => match value {
                Value::Null => true,
                Value::Ref(object) => object.implements(name),
                _ => false,
            },
            TypeSpec::Object(type_name) => match value {
                Value::Null => true,
                Value::Object(object) => object.type_name() == type_name,
                Value::Ref(object) => object.type_name() == type_name,
                _ => false,
            },
            TypeSpec::Array => matches!(value, Value::Null | Value::Array(_)),
            TypeSpec::Any => true,
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Void => write!(f, "void"),
            TypeSpec::Primitive(scalar) => write!(f, "{}", scalar.name()),
            TypeSpec::Boxed(scalar) => write!(f, "{}?", scalar.name()),
            TypeSpec::String => write!(f, "string"),
            TypeSpec::Interface(name) | TypeSpec::Object(name) => write!(f, "{}", name),
            TypeSpec::Array => write!(f, "array"),
            TypeSpec::Any => write!(f, "any"),
        }
    }
}

/// Name, parameter types and return type of one declared method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<TypeSpec>,
    pub returns: TypeSpec,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>) -> Self {
        MethodSignature {
            name: name.into(),
            params: Vec::new(),
            returns: TypeSpec::Void,
        }
    }

    pub fn param(mut self, spec: TypeSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn returns(mut self, spec: TypeSpec) -> Self {
        self.returns = spec;
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Name and argument shape both fit.
    pub fn matches(&self, name: &str, args: &[Value]) -> bool {
        self.name == name
            && self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(spec, arg)| spec.accepts(arg))
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        write!(f, "{}({}) -> {}", self.name, params.join(", "), self.returns)
    }
}

/// First declared method whose name and argument shape fit. Declaration
/// order breaks ties between overloads.
pub fn find_method<'a>(
    methods: &'a [MethodSignature],
    name: &str,
    args: &[Value],
) -> Option<&'a MethodSignature> {
    methods.iter().find(|m| m.matches(name, args))
}

/// A remotely callable contract type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    name: String,
    methods: Vec<MethodSignature>,
}

impl InterfaceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        InterfaceDescriptor {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, method: MethodSignature) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    /// Picks the signature a proxy call by name should use: the first
    /// overload with a matching arity, else the first with that name.
    pub fn signature_for(&self, method: &str, arity: usize) -> Option<&MethodSignature> {
        self.methods
            .iter()
            .find(|m| m.name == method && m.arity() == arity)
            .or_else(|| self.methods.iter().find(|m| m.name == method))
    }
}

/// Interfaces known to one endpoint, by name.
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    interfaces: DashMap<String, Arc<InterfaceDescriptor>>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, descriptor: InterfaceDescriptor) -> Arc<InterfaceDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.interfaces
            .insert(descriptor.name().to_string(), Arc::clone(&descriptor));
        descriptor
    }

    pub fn get(&self, name: &str) -> Option<Arc<InterfaceDescriptor>> {
        self.interfaces.get(name).map(|entry| Arc::clone(&*entry))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
