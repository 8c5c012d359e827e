//! Core types of the mqlite distributed-object runtime: values, handles,
//! descriptors, the wire codec, protocol messages and the handle table.

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod handle;
pub mod handle_table;
pub mod ids;
pub mod marshal;
pub mod msg;
pub mod object;
pub mod value;

pub use codec::{decode_value, encode_value, WireReader, WireWriter, MAX_DEPTH};
pub use descriptor::{
    find_method, InterfaceDescriptor, InterfaceRegistry, MethodSignature, Scalar, TypeSpec,
};
pub use error::{kinds, CodecError, Fault, RpcError, TableError};
pub use handle::Handle;
pub use handle_table::{HandleTable, ProxyFactory};
pub use ids::{CallId, CallIdAllocator, HandleId, HandleIdAllocator};
pub use marshal::{property, Marshal, TypeRegistry};
pub use msg::{peek_message_type, MessageType, Request, Response};
pub use object::{object_identity, same_object, RemoteObject};
pub use value::Value;
