use crate::client::RpcClient;
use async_trait::async_trait;
use mqlite_core::{find_method, Fault, Handle, InterfaceDescriptor, MethodSignature, RemoteObject, RpcError, Value};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Local stand-in for an object owned by another endpoint.
///
/// Every method call is forwarded to the owner through the client. Dropping
/// the proxy queues exactly one release of its handle, which lets the owner
/// collect the object once no proxy for it remains anywhere.
pub struct RemoteRef {
    client: RpcClient,
    handle: Handle,
    interface: Arc<InterfaceDescriptor>,
}

impl RemoteRef {
    pub fn new(client: RpcClient, handle: Handle, interface: Arc<InterfaceDescriptor>) -> Self {
        RemoteRef {
            client,
            handle,
            interface,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.interface
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Forwards `method` with `args` to the owner.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        let signature = self
            .interface
            .signature_for(method, args.len())
            .ok_or_else(|| RpcError::MethodNotFound {
                interface: self.interface.name().to_string(),
                method: method.to_string(),
            })?;
        trace!(handle = %self.handle, method, "Proxy call");
        self.client.call(&self.handle, signature, args).await
    }
}

#[async_trait]
impl RemoteObject for RemoteRef {
    fn type_name(&self) -> &str {
        self.interface.name()
    }

    fn implements(&self, interface: &str) -> bool {
        interface == self.interface.name()
    }

    fn methods(&self) -> &[MethodSignature] {
        self.interface.methods()
    }

    async fn invoke(&self, method: &MethodSignature, args: Vec<Value>) -> Result<Value, Fault> {
        self.client
            .call(&self.handle, method, args)
            .await
            .map_err(|err| match err {
                RpcError::Remote { kind, message } => Fault::new(kind, message),
                other => Fault::internal(other.to_string()),
            })
    }

    fn remote_handle(&self) -> Option<&Handle> {
        Some(&self.handle)
    }
}

impl Drop for RemoteRef {
    fn drop(&mut self) {
        trace!(handle = %self.handle, "Proxy dropped, queueing release");
        self.client.queue_release(self.handle.clone());
    }
}

impl fmt::Debug for RemoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteRef")
            .field("handle", &self.handle)
            .finish()
    }
}

/// Calls `method` on any reference, local object or proxy alike.
///
/// The overload is chosen by argument shape first, then by arity, so a
/// proxy's descriptor and a local object's runtime methods resolve the same
/// way.
pub async fn invoke_by_name(
    object: &dyn RemoteObject,
    method: &str,
    args: Vec<Value>,
) -> Result<Value, RpcError> {
    let methods = object.methods();
    let signature = find_method(methods, method, &args)
        .or_else(|| methods.iter().find(|m| m.name == method && m.arity() == args.len()))
        .ok_or_else(|| RpcError::MethodNotFound {
            interface: object.type_name().to_string(),
            method: method.to_string(),
        })?;
    Ok(object.invoke(signature, args).await?)
}
