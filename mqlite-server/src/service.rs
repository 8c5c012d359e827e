use async_trait::async_trait;
use mqlite_client::RpcClient;
use mqlite_core::{
    find_method, peek_message_type, Fault, Handle, HandleTable, RemoteObject,
    Request, Response, TableError, TypeRegistry, Value,
};
use mqlite_transport::{Envelope, MessageListener, Subscription, Transport, TransportError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Serves LOOKUP, CALL and REMOVE requests against one handle table.
///
/// Each inbound request is handled on its own task, so a method that calls
/// back into its caller does not stall delivery of the callback's reply.
#[derive(Clone)]
pub struct RpcService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    transport: Arc<dyn Transport>,
    table: Arc<HandleTable>,
    client: RpcClient,
    types: Arc<TypeRegistry>,
}

impl RpcService {
    pub fn new(
        transport: Arc<dyn Transport>,
        table: Arc<HandleTable>,
        client: RpcClient,
        types: Arc<TypeRegistry>,
    ) -> Self {
        RpcService {
            inner: Arc::new(ServiceInner {
                transport,
                table,
                client,
                types,
            }),
        }
    }

    /// Starts consuming the table's request queue.
    pub async fn listen(&self) -> Result<Subscription, TransportError> {
        let queue = self.inner.table.queue().to_string();
        let subscription = self
            .inner
            .transport
            .subscribe(&queue, Arc::new(self.clone()))
            .await?;
        debug!(queue = %queue, "RPC service listening");
        Ok(subscription)
    }

    pub fn table(&self) -> &Arc<HandleTable> {
        &self.inner.table
    }

    pub fn export_interfaces<I, S>(&self, interfaces: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.table.export_interfaces(interfaces);
    }

    pub fn publish(&self, object: Arc<dyn RemoteObject>, interface: &str) -> Result<Handle, TableError> {
        self.inner.table.publish(object, interface)
    }

    /// Decodes one request and produces its response.
    pub async fn dispatch(&self, payload: bytes::Bytes) -> Response {
        self.inner.dispatch(payload).await
    }
}

impl ServiceInner {
    async fn handle(&self, envelope: Envelope) {
        let Some(reply_to) = envelope.reply_to else {
            error!(
                correlation_id = ?envelope.correlation_id,
                "Request without reply destination dropped"
            );
            return;
        };

        let response = self.dispatch(envelope.payload).await;
        let payload = match response.encode() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "Could not encode response");
                match Response::Call(Err(Fault::write_error(err.to_string()))).encode() {
                    Ok(payload) => payload,
                    Err(err) => {
                        error!(error = %err, "Could not encode error response, reply dropped");
                        return;
                    }
                }
            }
        };

        let mut reply = Envelope::new(payload);
        reply.correlation_id = envelope.correlation_id;
        if let Err(err) = self.transport.send(&reply_to, reply).await {
            error!(destination = %reply_to, error = %err, "Could not send reply");
        }
    }

    async fn dispatch(&self, payload: bytes::Bytes) -> Response {
        let request = match Request::decode(payload.clone(), &self.types) {
            Ok(request) => request,
            Err(err) => {
                warn!(
                    kind = ?peek_message_type(&payload).ok(),
                    error = %err,
                    "Could not decode request"
                );
                return Response::Call(Err(Fault::from(err)));
            }
        };

        match request {
            Request::Lookup { interface } => {
                let handle = self.table.lookup_published(&interface);
                debug!(interface = %interface, found = handle.is_some(), "Lookup");
                Response::Lookup(handle)
            }
            Request::Call {
                target,
                method,
                args,
            } => {
                let result = self.call(&target, &method, args).await;
                if let Err(fault) = &result {
                    debug!(handle = %target, method = %method, fault = %fault, "Call failed");
                }
                Response::Call(result)
            }
            Request::Remove { handle } => {
                let removed = self.table.release(&handle);
                trace!(handle = %handle, removed, "Remove");
                Response::Remove(removed)
            }
        }
    }

    async fn call(&self, target: &Handle, method: &str, args: Vec<Value>) -> Result<Value, Fault> {
        let args = args
            .into_iter()
            .map(|arg| match arg {
                Value::Handle(handle) => self
                    .table
                    .resolve_remote(&handle, &self.client)
                    .map(Value::Ref),
                other => Ok(other),
            })
            .collect::<Result<Vec<_>, TableError>>()?;

        let object = self
            .table
            .resolve_local(target)
            .ok_or_else(|| Fault::object_not_found(target))?;
        let signature = find_method(object.methods(), method, &args)
            .ok_or_else(|| Fault::method_not_found(method, object.type_name()))?
            .clone();

        trace!(handle = %target, method = %signature, "Invoking");
        let result = object.invoke(&signature, args).await?;

        match (signature.returns.interface_name(), result) {
            (Some(interface), Value::Ref(returned)) if self.table.is_exported(interface) => {
                Ok(Value::Handle(self.table.create_or_retain(&returned, interface)))
            }
            (_, result) => Ok(result),
        }
    }
}

#[async_trait]
impl MessageListener for RpcService {
    async fn on_message(&self, envelope: Envelope) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.handle(envelope).await });
    }
}

impl fmt::Debug for RpcService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcService")
            .field("queue", &self.inner.table.queue())
            .field("live_handles", &self.inner.table.len())
            .finish()
    }
}
