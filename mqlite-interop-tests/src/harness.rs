//! Two endpoints wired over one in-memory broker

use crate::fixtures::{
    all_interfaces, Bean, BeanServer, Greeter, NParams, ParamTypes, RemoteObjects, ReturnTypes,
    GREETER, IBEAN, IBEAN_SERVER, N_PARAMS, PARAM_TYPES, REMOTE_OBJECTS, RETURN_TYPES,
};
use mqlite_core::{Handle, RemoteObject, RpcError};
use mqlite_server::{init_test_logging, Endpoint, EndpointConfig};
use mqlite_transport::{InMemoryBroker, Transport};
use std::sync::Arc;
use tracing::info;

pub const SERVER_ID: &str = "server";
pub const CLIENT_ID: &str = "client";

/// A serving endpoint with every fixture published, and a calling endpoint
/// that exports the callback interfaces.
pub struct Pair {
    pub broker: Arc<InMemoryBroker>,
    pub server: Endpoint,
    pub client: Endpoint,
    pub remote_objects: Arc<RemoteObjects>,
    pub published: Vec<Handle>,
}

impl Pair {
    pub async fn connect() -> Result<Self, RpcError> {
        init_test_logging();
        let broker = Arc::new(InMemoryBroker::default());
        let transport: Arc<dyn Transport> = broker.clone();

        let server = prepare(SERVER_ID, &transport).await?;
        let client = prepare(CLIENT_ID, &transport).await?;

        let remote_objects = Arc::new(RemoteObjects::default());
        let services: [(Arc<dyn RemoteObject>, &str); 5] = [
            (Arc::new(Greeter) as Arc<dyn RemoteObject>, GREETER),
            (Arc::new(ReturnTypes) as Arc<dyn RemoteObject>, RETURN_TYPES),
            (Arc::new(ParamTypes) as Arc<dyn RemoteObject>, PARAM_TYPES),
            (Arc::new(NParams) as Arc<dyn RemoteObject>, N_PARAMS),
            (remote_objects.clone() as Arc<dyn RemoteObject>, REMOTE_OBJECTS),
        ];
        let mut published = Vec::with_capacity(services.len());
        for (object, interface) in services {
            published.push(server.publish(object, interface)?);
        }

        info!(published = published.len(), "Fixture pair connected");
        Ok(Pair {
            broker,
            server,
            client,
            remote_objects,
            published,
        })
    }

    /// Looks up `interface` on the serving endpoint from the calling one.
    pub async fn lookup(&self, interface: &str) -> Result<Arc<dyn RemoteObject>, RpcError> {
        self.client
            .lookup(SERVER_ID, interface)
            .await?
            .ok_or_else(|| RpcError::Protocol(format!("{} is not published", interface)))
    }

    pub fn close(&self) {
        self.client.close();
        self.server.close();
    }
}

async fn prepare(endpoint_id: &str, transport: &Arc<dyn Transport>) -> Result<Endpoint, RpcError> {
    let endpoint = Endpoint::connect(
        EndpointConfig::default().with_endpoint_id(endpoint_id),
        Arc::clone(transport),
    )
    .await?;
    for descriptor in all_interfaces() {
        endpoint.register_interface(descriptor);
    }
    endpoint.register_type::<Bean>();
    endpoint.register_type::<BeanServer>();
    endpoint.export_interfaces([IBEAN, IBEAN_SERVER]);
    Ok(endpoint)
}
