//! By-value marshaling of plain data objects.
//!
//! A marshalable type lists its readable properties and accepts writes for
//! the ones it can set. Decoding default-constructs the named type and
//! applies every property it has a mutator for; the rest are dropped. A
//! property that is readable but not writable therefore comes back with its
//! default value, and a type without a registered constructor cannot be
//! decoded at all.

use crate::error::CodecError;
use crate::value::Value;
use dashmap::DashMap;
use std::any::Any;
use std::fmt;

pub trait Marshal: Send + Sync + fmt::Debug + 'static {
    /// Name the receiving side resolves the constructor by.
    fn type_name(&self) -> &str;

    /// Readable properties, in declaration order.
    fn properties(&self) -> Vec<(String, Value)>;

    /// Applies one decoded property. `Ok(false)` means the type has no
    /// mutator for it and the value was discarded.
    fn set_property(&mut self, name: &str, value: Value) -> Result<bool, CodecError>;

    fn as_any(&self) -> &dyn Any;
}

type Constructor = fn() -> Box<dyn Marshal>;

fn construct<T: Marshal + Default>() -> Box<dyn Marshal> {
    Box::new(T::default())
}

/// Default constructors for by-value types, by type name.
#[derive(Default)]
pub struct TypeRegistry {
    constructors: DashMap<String, Constructor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under the name its default instance reports.
    pub fn register<T: Marshal + Default>(&self) -> String {
        let name = T::default().type_name().to_string();
        self.constructors.insert(name.clone(), construct::<T>);
        name
    }

    pub fn register_with(&self, type_name: impl Into<String>, constructor: Constructor) {
        self.constructors.insert(type_name.into(), constructor);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Fresh default instance of `type_name`.
    pub fn instantiate(&self, type_name: &str) -> Result<Box<dyn Marshal>, CodecError> {
        let constructor = self
            .constructors
            .get(type_name)
            .map(|entry| *entry)
            .ok_or_else(|| CodecError::Construction(type_name.to_string()))?;
        Ok(constructor())
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.constructors.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

/// Converts a decoded property into the mutator's parameter type.
pub fn property<T>(type_name: &str, name: &str, value: Value) -> Result<T, CodecError>
where
    T: TryFrom<Value, Error = CodecError>,
{
    T::try_from(value).map_err(|err| CodecError::Property {
        type_name: type_name.to_string(),
        property: name.to_string(),
        reason: err.to_string(),
    })
}
