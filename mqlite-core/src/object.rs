use crate::descriptor::MethodSignature;
use crate::error::Fault;
use crate::handle::Handle;
use crate::marshal::Marshal;
use crate::value::Value;
use async_trait::async_trait;
use std::sync::Arc;

/// An object that can be called across the boundary.
///
/// Local implementations describe their runtime type through `type_name`,
/// `implements` and `methods`; the service picks the declared method that
/// fits an inbound call and hands it to `invoke`. Proxies implement the same
/// trait by forwarding, and are recognised by `remote_handle`.
#[async_trait]
pub trait RemoteObject: Send + Sync + std::fmt::Debug + 'static {
    /// Name of the runtime type.
    fn type_name(&self) -> &str;

    /// Whether this object can be exposed as `interface`.
    fn implements(&self, interface: &str) -> bool;

    /// Declared methods of the runtime type.
    fn methods(&self) -> &[MethodSignature];

    /// Call `method` with arguments already matched against its parameters.
    async fn invoke(&self, method: &MethodSignature, args: Vec<Value>) -> Result<Value, Fault>;

    /// By-value form, used when the object crosses the boundary as a type
    /// that is not exported.
    fn by_value(&self) -> Option<Arc<dyn Marshal>> {
        None
    }

    /// The wrapped handle, for proxies only.
    fn remote_handle(&self) -> Option<&Handle> {
        None
    }
}

/// Address of the object behind a trait object, used as its identity.
pub fn object_identity(object: &Arc<dyn RemoteObject>) -> usize {
    Arc::as_ptr(object) as *const () as usize
}

pub fn same_object(a: &Arc<dyn RemoteObject>, b: &Arc<dyn RemoteObject>) -> bool {
    object_identity(a) == object_identity(b)
}
