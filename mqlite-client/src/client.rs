// RPC client
// Turns the transport's push delivery into awaitable calls:
// - one private reply queue per client
// - a pending slot per correlation id, completed exactly once
// - release requests for dropped proxies, sent from a background pump

use crate::proxy::RemoteRef;
use dashmap::DashMap;
use mqlite_core::{
    CallId, CallIdAllocator, Fault, Handle, HandleTable, InterfaceDescriptor, MethodSignature,
    ProxyFactory, RemoteObject, Request, Response, RpcError, TableError, TypeRegistry, Value,
};
use mqlite_transport::{Destination, Envelope, MessageListener, Subscription, Transport};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace, warn};

type Outcome = Result<Response, Fault>;

/// Name of the queue an endpoint serves requests on.
pub fn request_queue(endpoint_id: &str) -> String {
    format!("{}-request", endpoint_id)
}

/// Correlation id to waiter, shared with the reply listener.
#[derive(Debug)]
struct PendingCalls {
    slots: DashMap<CallId, oneshot::Sender<Outcome>>,
    types: Arc<TypeRegistry>,
}

impl PendingCalls {
    fn complete(&self, id: CallId, outcome: Outcome) {
        match self.slots.remove(&id) {
            Some((_, waiter)) => {
                if waiter.send(outcome).is_err() {
                    debug!(%id, "Caller went away before its response arrived");
                }
            }
            None => error!(%id, "Response for unknown correlation id dropped"),
        }
    }
}

/// A registered pending call. Dropping it removes the slot, so a caller
/// that gives up does not leave one behind.
struct PendingReply<'a> {
    pending: &'a PendingCalls,
    id: CallId,
    rx: oneshot::Receiver<Outcome>,
}

impl PendingReply<'_> {
    async fn outcome(mut self) -> Result<Response, RpcError> {
        let outcome = (&mut self.rx).await.map_err(|_| RpcError::Closed)?;
        Ok(outcome?)
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if self.pending.slots.remove(&self.id).is_some() {
            trace!(id = %self.id, "Pending call abandoned");
        }
    }
}

struct ReplyListener {
    pending: Arc<PendingCalls>,
}

#[async_trait::async_trait]
impl MessageListener for ReplyListener {
    async fn on_message(&self, envelope: Envelope) {
        let id = match envelope.correlation_id.as_deref().map(CallId::from_str) {
            Some(Ok(id)) => id,
            Some(Err(_)) | None => {
                error!(
                    correlation_id = ?envelope.correlation_id,
                    "Response without a usable correlation id dropped"
                );
                return;
            }
        };
        let outcome = Response::decode(envelope.payload, &self.pending.types).map_err(|err| {
            warn!(%id, error = %err, "Could not decode response");
            Fault::from(err)
        });
        trace!(%id, "Response received");
        self.pending.complete(id, outcome);
    }
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    table: Arc<HandleTable>,
    reply_to: Destination,
    ids: CallIdAllocator,
    pending: Arc<PendingCalls>,
    releases: mpsc::UnboundedSender<Handle>,
    subscription: Mutex<Option<Subscription>>,
    closed: AtomicBool,
}

/// Issues LOOKUP, CALL and REMOVE requests and waits for their replies.
///
/// Cheap to clone; every clone shares the reply queue and pending table.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<ClientInner>,
}

impl RpcClient {
    /// Opens a reply queue on `transport` and starts the release pump.
    pub async fn connect(
        transport: Arc<dyn Transport>,
        table: Arc<HandleTable>,
        types: Arc<TypeRegistry>,
    ) -> Result<Self, RpcError> {
        let pending = Arc::new(PendingCalls {
            slots: DashMap::new(),
            types,
        });
        let listener = Arc::new(ReplyListener {
            pending: Arc::clone(&pending),
        });
        let (reply_to, subscription) = transport
            .temporary_queue(listener)
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        let (releases, release_rx) = mpsc::unbounded_channel();

        let client = RpcClient {
            inner: Arc::new(ClientInner {
                transport,
                table,
                reply_to,
                ids: CallIdAllocator::new(),
                pending,
                releases,
                subscription: Mutex::new(Some(subscription)),
                closed: AtomicBool::new(false),
            }),
        };
        spawn_release_pump(Arc::downgrade(&client.inner), release_rx);
        debug!(reply_to = %client.inner.reply_to, "RPC client connected");
        Ok(client)
    }

    pub fn reply_to(&self) -> &Destination {
        &self.inner.reply_to
    }

    pub fn table(&self) -> &Arc<HandleTable> {
        &self.inner.table
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.inner.pending.types
    }

    /// Requests still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.slots.len()
    }

    /// Calls `method` on the object behind `handle`.
    ///
    /// Arguments passed for parameters typed as an exported interface are
    /// sent as handles to local objects; a handle in the result comes back
    /// as a proxy, or as the local object when this endpoint owns it.
    pub async fn call(
        &self,
        handle: &Handle,
        method: &MethodSignature,
        args: Vec<Value>,
    ) -> Result<Value, RpcError> {
        if args.len() != method.arity() {
            return Err(RpcError::ArgumentCount {
                method: method.name.clone(),
                expected: method.arity(),
                actual: args.len(),
            });
        }
        let mut exported = Vec::new();
        let args = method
            .params
            .iter()
            .zip(args)
            .map(|(param, arg)| self.export_argument(param.interface_name(), arg, &mut exported))
            .collect();

        let request = Request::Call {
            target: handle.clone(),
            method: method.name.clone(),
            args,
        };
        trace!(%handle, method = %method.name, "Calling remote method");
        let reply = match self.send(&Destination::queue(handle.queue()), &request).await {
            Ok(reply) => reply,
            Err(err) => {
                // Never sent, so nobody will release these.
                for handle in &exported {
                    self.inner.table.release(handle);
                }
                return Err(err);
            }
        };
        match reply.outcome().await? {
            Response::Call(Ok(value)) => self.resolve_result(value),
            Response::Call(Err(fault)) => Err(fault.into()),
            other => Err(unexpected_response("CALL", &other)),
        }
    }

    /// Calls a method by name, picking the signature from the registered
    /// descriptor of the handle's interface.
    pub async fn call_by_name(
        &self,
        handle: &Handle,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RpcError> {
        let descriptor = self
            .inner
            .table
            .interfaces()
            .get(handle.interface())
            .ok_or_else(|| RpcError::MethodNotFound {
                interface: handle.interface().to_string(),
                method: method.to_string(),
            })?;
        let signature = descriptor
            .signature_for(method, args.len())
            .ok_or_else(|| RpcError::MethodNotFound {
                interface: handle.interface().to_string(),
                method: method.to_string(),
            })?;
        self.call(handle, signature, args).await
    }

    /// Handle of the object `endpoint_id` publishes under `interface`.
    pub async fn lookup_handle(
        &self,
        endpoint_id: &str,
        interface: &str,
    ) -> Result<Option<Handle>, RpcError> {
        let request = Request::Lookup {
            interface: interface.to_string(),
        };
        let destination = Destination::queue(request_queue(endpoint_id));
        match self.request(&destination, &request).await? {
            Response::Lookup(handle) => Ok(handle),
            Response::Call(Err(fault)) => Err(fault.into()),
            other => Err(unexpected_response("LOOKUP", &other)),
        }
    }

    /// Looks up `interface` on `endpoint_id` and resolves the handle.
    pub async fn lookup(
        &self,
        endpoint_id: &str,
        interface: &str,
    ) -> Result<Option<Arc<dyn RemoteObject>>, RpcError> {
        match self.lookup_handle(endpoint_id, interface).await? {
            Some(handle) => Ok(Some(self.resolve_or_release(handle)?)),
            None => Ok(None),
        }
    }

    /// Like [`lookup`](Self::lookup), but always hands back a proxy, even
    /// for an object this endpoint owns itself.
    pub async fn lookup_proxy(
        &self,
        endpoint_id: &str,
        interface: &str,
    ) -> Result<Option<Arc<RemoteRef>>, RpcError> {
        let Some(handle) = self.lookup_handle(endpoint_id, interface).await? else {
            return Ok(None);
        };
        let Some(descriptor) = self.inner.table.interfaces().get(handle.interface()) else {
            let err = TableError::UnknownInterface(handle.interface().to_string());
            self.queue_release(handle);
            return Err(err.into());
        };
        Ok(Some(Arc::new(RemoteRef::new(self.clone(), handle, descriptor))))
    }

    /// Sends one release for `handle` to its owner.
    pub async fn release(&self, handle: &Handle) -> Result<bool, RpcError> {
        let request = Request::Remove {
            handle: handle.clone(),
        };
        match self.request(&Destination::queue(handle.queue()), &request).await? {
            Response::Remove(removed) => {
                if !removed {
                    warn!(%handle, "Owner could not find handle to release");
                }
                Ok(removed)
            }
            Response::Call(Err(fault)) => Err(fault.into()),
            other => Err(unexpected_response("REMOVE", &other)),
        }
    }

    /// Queues a release for the pump. Used by proxies on drop.
    pub(crate) fn queue_release(&self, handle: Handle) {
        if self.inner.releases.send(handle).is_err() {
            debug!("Release pump stopped, release not sent");
        }
    }

    /// Stops consuming replies. Calls still waiting fail with `Closed`.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        let subscription = self
            .inner
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.close();
        }
        self.inner.pending.slots.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    async fn request(&self, destination: &Destination, request: &Request) -> Result<Response, RpcError> {
        self.send(destination, request).await?.outcome().await
    }

    /// Registers a pending call and sends `request`. An error here means
    /// the request never left.
    async fn send(&self, destination: &Destination, request: &Request) -> Result<PendingReply<'_>, RpcError> {
        let payload = request.encode()?;
        if self.is_closed() {
            return Err(RpcError::Closed);
        }
        let id = self.inner.ids.allocate();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.slots.insert(id, tx);
        let reply = PendingReply {
            pending: &self.inner.pending,
            id,
            rx,
        };
        // close() may have cleared the table between the check and the insert.
        if self.is_closed() {
            return Err(RpcError::Closed);
        }

        let envelope = Envelope::new(payload)
            .with_correlation_id(id.to_header())
            .with_reply_to(self.inner.reply_to.clone());
        debug!(%id, %destination, kind = ?request.message_type(), "Sending request");
        self.inner
            .transport
            .send(destination, envelope)
            .await
            .map_err(|err| RpcError::Transport(err.to_string()))?;
        Ok(reply)
    }

    fn export_argument(&self, interface: Option<&str>, arg: Value, exported: &mut Vec<Handle>) -> Value {
        match (interface, arg) {
            (Some(interface), Value::Ref(object)) if self.inner.table.is_exported(interface) => {
                let handle = self.inner.table.create_or_retain(&object, interface);
                exported.push(handle.clone());
                Value::Handle(handle)
            }
            (_, arg) => arg,
        }
    }

    fn resolve_result(&self, value: Value) -> Result<Value, RpcError> {
        match value {
            Value::Handle(handle) => Ok(Value::Ref(self.resolve_or_release(handle)?)),
            other => Ok(other),
        }
    }

    /// Resolves a handle the owner retained for us. If no proxy can be
    /// built, the retain is handed back.
    fn resolve_or_release(&self, handle: Handle) -> Result<Arc<dyn RemoteObject>, RpcError> {
        let table = &self.inner.table;
        match table.resolve_remote(&handle, self) {
            Ok(object) => Ok(object),
            Err(err) => {
                if !handle.is_owned_by(table.owner(), table.queue()) {
                    warn!(%handle, error = %err, "Could not resolve handle, releasing it");
                    self.queue_release(handle);
                }
                Err(err.into())
            }
        }
    }
}

impl ProxyFactory for RpcClient {
    fn make_proxy(&self, handle: Handle, interface: Arc<InterfaceDescriptor>) -> Arc<dyn RemoteObject> {
        Arc::new(RemoteRef::new(self.clone(), handle, interface))
    }
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("reply_to", &self.inner.reply_to)
            .field("pending", &self.pending_count())
            .field("next_call_id", &self.inner.ids.peek_next())
            .finish()
    }
}

fn unexpected_response(expected: &str, got: &Response) -> RpcError {
    RpcError::Protocol(format!(
        "expected {} response, got {:?}",
        expected,
        got.message_type()
    ))
}

/// Drains queued releases until the client is gone.
fn spawn_release_pump(client: Weak<ClientInner>, mut handles: mpsc::UnboundedReceiver<Handle>) {
    tokio::spawn(async move {
        while let Some(handle) = handles.recv().await {
            let Some(inner) = client.upgrade() else {
                break;
            };
            if let Err(err) = (RpcClient { inner }).release(&handle).await {
                warn!(%handle, error = %err, "Release failed");
            }
        }
        trace!("Release pump finished");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqlite_core::{kinds, HandleId, Scalar, TypeSpec};
    use mqlite_transport::InMemoryBroker;
    use std::time::Duration;
    use tokio::time::timeout;

    const SERVER_QUEUE: &str = "server-request";

    /// Replies to every request with whatever `respond` returns.
    struct ScriptedServer<F> {
        transport: Arc<dyn Transport>,
        types: TypeRegistry,
        seen: mpsc::UnboundedSender<Request>,
        respond: F,
    }

    #[async_trait::async_trait]
    impl<F> MessageListener for ScriptedServer<F>
    where
        F: Fn(&Request) -> Option<Response> + Send + Sync,
    {
        async fn on_message(&self, envelope: Envelope) {
            let request = Request::decode(envelope.payload, &self.types).unwrap();
            let _ = self.seen.send(request.clone());
            if let (Some(response), Some(reply_to)) = ((self.respond)(&request), envelope.reply_to) {
                let mut reply = Envelope::new(response.encode().unwrap()).with_reply_to(reply_to.clone());
                reply.correlation_id = envelope.correlation_id;
                self.transport.send(&reply_to, reply).await.unwrap();
            }
        }
    }

    struct Fixture {
        client: RpcClient,
        seen: mpsc::UnboundedReceiver<Request>,
        _server: Subscription,
    }

    async fn fixture<F>(respond: F) -> Fixture
    where
        F: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
    {
        let transport: Arc<dyn Transport> = Arc::new(InMemoryBroker::default());
        let (seen_tx, seen) = mpsc::unbounded_channel();
        let server = Arc::new(ScriptedServer {
            transport: Arc::clone(&transport),
            types: TypeRegistry::new(),
            seen: seen_tx,
            respond,
        });
        let _server = transport.subscribe(SERVER_QUEUE, server).await.unwrap();

        let table = Arc::new(HandleTable::new("memory://localhost", "client-request"));
        table.interfaces().register(
            InterfaceDescriptor::new("demo.Greeter")
                .method(MethodSignature::new("getGreeting").returns(TypeSpec::String)),
        );
        let client = RpcClient::connect(transport, table, Arc::new(TypeRegistry::new()))
            .await
            .unwrap();
        Fixture {
            client,
            seen,
            _server,
        }
    }

    fn server_handle(id: u32) -> Handle {
        Handle::new(HandleId::new(id), "demo.Greeter", "memory://localhost", SERVER_QUEUE)
    }

    fn greeting() -> MethodSignature {
        MethodSignature::new("getGreeting").returns(TypeSpec::String)
    }

    #[derive(Debug)]
    struct Local;

    #[async_trait::async_trait]
    impl RemoteObject for Local {
        fn type_name(&self) -> &str {
            "demo.Local"
        }
        fn implements(&self, interface: &str) -> bool {
            interface == "demo.Greeter"
        }
        fn methods(&self) -> &[MethodSignature] {
            &[]
        }
        async fn invoke(&self, _m: &MethodSignature, _a: Vec<Value>) -> Result<Value, Fault> {
            Ok(Value::Null)
        }
    }

    fn register() -> MethodSignature {
        MethodSignature::new("register").param(TypeSpec::interface("demo.Greeter"))
    }

    #[tokio::test]
    async fn test_call_returns_value() {
        let f = fixture(|_| Some(Response::Call(Ok(Value::from("Hello World"))))).await;
        let result = f.client.call(&server_handle(1), &greeting(), vec![]).await.unwrap();
        assert_eq!(result, Value::from("Hello World"));
        assert_eq!(f.client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_fault_is_raised() {
        let f = fixture(|_| Some(Response::Call(Err(Fault::new("IllegalAccess", "nope"))))).await;
        let err = f.client.call(&server_handle(1), &greeting(), vec![]).await.unwrap_err();
        assert_eq!(err.remote_kind(), Some("IllegalAccess"));
    }

    #[tokio::test]
    async fn test_argument_count_checked_locally() {
        let mut f = fixture(|_| Some(Response::Call(Ok(Value::Null)))).await;
        let add = MethodSignature::new("add").param(TypeSpec::Primitive(Scalar::Int));
        let err = f.client.call(&server_handle(1), &add, vec![]).await.unwrap_err();
        assert!(matches!(err, RpcError::ArgumentCount { expected: 1, actual: 0, .. }));
        assert!(f.seen.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_lookup_sends_to_request_queue() {
        let mut f = fixture(|request| match request {
            Request::Lookup { interface } if interface == "demo.Greeter" => {
                Some(Response::Lookup(Some(server_handle(4))))
            }
            _ => Some(Response::Lookup(None)),
        })
        .await;

        let proxy = f.client.lookup("server", "demo.Greeter").await.unwrap().unwrap();
        assert_eq!(proxy.remote_handle(), Some(&server_handle(4)));
        assert!(matches!(f.seen.recv().await, Some(Request::Lookup { .. })));

        assert!(f.client.lookup("server", "demo.Missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_release_reports_outcome() {
        let f = fixture(|_| Some(Response::Remove(false))).await;
        assert!(!f.client.release(&server_handle(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_undecodable_response_wakes_caller() {
        let transport: Arc<dyn Transport> = Arc::new(InMemoryBroker::default());

        struct Garbage(Arc<dyn Transport>);

        #[async_trait::async_trait]
        impl MessageListener for Garbage {
            async fn on_message(&self, envelope: Envelope) {
                let reply_to = envelope.reply_to.unwrap();
                let mut reply = Envelope::new(bytes::Bytes::from_static(&[99, 1, 2]));
                reply.correlation_id = envelope.correlation_id;
                self.0.send(&reply_to, reply).await.unwrap();
            }
        }

        let _server = transport
            .subscribe(SERVER_QUEUE, Arc::new(Garbage(Arc::clone(&transport))))
            .await
            .unwrap();
        let table = Arc::new(HandleTable::new("memory://localhost", "client-request"));
        let client = RpcClient::connect(transport, table, Arc::new(TypeRegistry::new()))
            .await
            .unwrap();

        let err = timeout(
            Duration::from_secs(5),
            client.call(&server_handle(1), &greeting(), vec![]),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert_eq!(err.remote_kind(), Some(kinds::READ_ERROR));
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_correlated() {
        let f = fixture(|request| match request {
            Request::Call { args, .. } => Some(Response::Call(Ok(args[0].clone()))),
            _ => None,
        })
        .await;
        let echo = MethodSignature::new("echo")
            .param(TypeSpec::Primitive(Scalar::Int))
            .returns(TypeSpec::Primitive(Scalar::Int));

        let calls = (0..50).map(|i| {
            let client = f.client.clone();
            let echo = echo.clone();
            tokio::spawn(async move { client.call(&server_handle(1), &echo, vec![Value::Int(i)]).await })
        });
        let results = futures::future::join_all(calls).await;
        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap().unwrap(), Value::Int(i as i32));
        }
    }

    #[tokio::test]
    async fn test_exported_argument_travels_as_handle() {
        let mut f = fixture(|_| Some(Response::Call(Ok(Value::Null)))).await;
        let table = Arc::clone(f.client.table());
        table.export_interfaces(["demo.Greeter"]);

        let local: Arc<dyn RemoteObject> = Arc::new(Local);
        f.client
            .call(&server_handle(1), &register(), vec![Value::Ref(Arc::clone(&local))])
            .await
            .unwrap();

        match f.seen.recv().await {
            Some(Request::Call { args, .. }) => {
                let handle = args[0].as_handle().unwrap();
                assert_eq!(handle.queue(), "client-request");
                assert_eq!(table.retain_count(handle), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_fails_waiting_calls() {
        let f = fixture(|_| None).await;
        let client = f.client.clone();
        let call = tokio::spawn(async move { client.call(&server_handle(1), &greeting(), vec![]).await });

        while f.client.pending_count() == 0 {
            tokio::task::yield_now().await;
        }
        f.client.close();
        let err = call.await.unwrap().unwrap_err();
        assert_eq!(err, RpcError::Closed);
    }

    #[tokio::test]
    async fn test_requests_after_close_fail_fast() {
        let mut f = fixture(|_| Some(Response::Remove(true))).await;
        f.client.close();
        assert!(f.client.is_closed());

        let call = timeout(
            Duration::from_secs(1),
            f.client.call(&server_handle(1), &greeting(), vec![]),
        )
        .await
        .unwrap();
        assert_eq!(call.unwrap_err(), RpcError::Closed);

        let lookup = timeout(Duration::from_secs(1), f.client.lookup("server", "demo.Greeter"))
            .await
            .unwrap();
        assert_eq!(lookup.unwrap_err(), RpcError::Closed);

        let release = timeout(Duration::from_secs(1), f.client.release(&server_handle(1)))
            .await
            .unwrap();
        assert_eq!(release.unwrap_err(), RpcError::Closed);

        assert_eq!(f.client.pending_count(), 0);
        assert!(f.seen.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_abandoned_call_removes_its_slot() {
        let f = fixture(|_| None).await;
        let gave_up = timeout(
            Duration::from_millis(50),
            f.client.call(&server_handle(1), &greeting(), vec![]),
        )
        .await;
        assert!(gave_up.is_err());
        assert_eq!(f.client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unresolvable_lookup_hands_retain_back() {
        let mut f = fixture(|request| match request {
            Request::Lookup { .. } => Some(Response::Lookup(Some(Handle::new(
                HandleId::new(9),
                "demo.ServerOnly",
                "memory://localhost",
                SERVER_QUEUE,
            )))),
            Request::Remove { .. } => Some(Response::Remove(true)),
            _ => None,
        })
        .await;

        let err = f.client.lookup("server", "demo.ServerOnly").await.unwrap_err();
        assert!(matches!(err, RpcError::Table(TableError::UnknownInterface(_))));
        let err = f.client.lookup_proxy("server", "demo.ServerOnly").await.unwrap_err();
        assert!(matches!(err, RpcError::Table(TableError::UnknownInterface(_))));

        let mut removes = 0;
        while removes < 2 {
            match timeout(Duration::from_secs(5), f.seen.recv()).await.unwrap() {
                Some(Request::Remove { handle }) => {
                    assert_eq!(handle.id(), HandleId::new(9));
                    removes += 1;
                }
                Some(Request::Lookup { .. }) => {}
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_unresolvable_result_hands_retain_back() {
        let mut f = fixture(|request| match request {
            Request::Call { .. } => Some(Response::Call(Ok(Value::Handle(Handle::new(
                HandleId::new(3),
                "demo.ServerOnly",
                "memory://localhost",
                SERVER_QUEUE,
            ))))),
            Request::Remove { .. } => Some(Response::Remove(true)),
            _ => None,
        })
        .await;

        let err = f.client.call(&server_handle(1), &greeting(), vec![]).await.unwrap_err();
        assert!(matches!(err, RpcError::Table(TableError::UnknownInterface(_))));

        assert!(matches!(f.seen.recv().await, Some(Request::Call { .. })));
        match timeout(Duration::from_secs(5), f.seen.recv()).await.unwrap() {
            Some(Request::Remove { handle }) => assert_eq!(handle.id(), HandleId::new(3)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsent_call_releases_exported_arguments() {
        let f = fixture(|_| Some(Response::Call(Ok(Value::Null)))).await;
        let table = Arc::clone(f.client.table());
        table.export_interfaces(["demo.Greeter"]);
        f.client.close();

        let local: Arc<dyn RemoteObject> = Arc::new(Local);
        let err = f
            .client
            .call(&server_handle(1), &register(), vec![Value::Ref(Arc::clone(&local))])
            .await
            .unwrap_err();
        assert_eq!(err, RpcError::Closed);
        assert!(table.is_empty());
    }
}
