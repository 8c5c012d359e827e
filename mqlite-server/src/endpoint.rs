use crate::config::EndpointConfig;
use crate::service::RpcService;
use mqlite_client::{RemoteRef, RpcClient};
use mqlite_core::{
    Handle, HandleTable, InterfaceDescriptor, Marshal, RemoteObject, RpcError, TypeRegistry,
};
use mqlite_transport::{Subscription, Transport};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// One process-side participant: a handle table, the client it calls out
/// with and the service answering requests on `<endpoint_id>-request`.
pub struct Endpoint {
    config: EndpointConfig,
    table: Arc<HandleTable>,
    types: Arc<TypeRegistry>,
    client: RpcClient,
    service: RpcService,
    subscription: Mutex<Option<Subscription>>,
}

impl Endpoint {
    pub async fn connect(config: EndpointConfig, transport: Arc<dyn Transport>) -> Result<Self, RpcError> {
        let table = Arc::new(HandleTable::new(&config.locator, config.request_queue()));
        let types = Arc::new(TypeRegistry::new());
        let client = RpcClient::connect(Arc::clone(&transport), Arc::clone(&table), Arc::clone(&types)).await?;
        let service = RpcService::new(transport, Arc::clone(&table), client.clone(), Arc::clone(&types));
        let subscription = service
            .listen()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        info!(
            endpoint = %config.endpoint_id,
            queue = %table.queue(),
            "Endpoint connected"
        );
        Ok(Endpoint {
            config,
            table,
            types,
            client,
            service,
            subscription: Mutex::new(Some(subscription)),
        })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn endpoint_id(&self) -> &str {
        &self.config.endpoint_id
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    pub fn service(&self) -> &RpcService {
        &self.service
    }

    pub fn table(&self) -> &Arc<HandleTable> {
        &self.table
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// Makes `descriptor` known here, for proxies and for publishing.
    pub fn register_interface(&self, descriptor: InterfaceDescriptor) -> Arc<InterfaceDescriptor> {
        self.table.interfaces().register(descriptor)
    }

    /// Allows `T` to be decoded when it arrives by value.
    pub fn register_type<T: Marshal + Default>(&self) -> String {
        self.types.register::<T>()
    }

    /// Marks interfaces as passed by reference.
    pub fn export_interfaces<I, S>(&self, interfaces: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service.export_interfaces(interfaces);
    }

    /// Publishes `object` as the implementation of `interface`. Fails here,
    /// not remotely, when the interface is unknown or not implemented.
    pub fn publish(&self, object: Arc<dyn RemoteObject>, interface: &str) -> Result<Handle, RpcError> {
        Ok(self.service.publish(object, interface)?)
    }

    pub async fn lookup(
        &self,
        endpoint_id: &str,
        interface: &str,
    ) -> Result<Option<Arc<dyn RemoteObject>>, RpcError> {
        self.client.lookup(endpoint_id, interface).await
    }

    pub async fn lookup_proxy(
        &self,
        endpoint_id: &str,
        interface: &str,
    ) -> Result<Option<Arc<RemoteRef>>, RpcError> {
        self.client.lookup_proxy(endpoint_id, interface).await
    }

    /// Stops serving requests and receiving replies.
    pub fn close(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.close();
        }
        self.client.close();
        info!(endpoint = %self.config.endpoint_id, "Endpoint closed");
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("config", &self.config)
            .field("table", &self.table)
            .field("client", &self.client)
            .finish()
    }
}
