//! In-process broker.
//!
//! Named queues come into existence on first send or subscribe and buffer
//! messages until their consumer attaches. Each queue has at most one
//! consumer, fed by its own delivery task in arrival order. Nothing is
//! persisted.

use crate::transport::{Destination, Envelope, MessageListener, Subscription, Transport, TransportError};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use uuid::Uuid;

#[derive(Debug)]
struct QueueSlot {
    sender: mpsc::UnboundedSender<Envelope>,
    receiver: Option<mpsc::UnboundedReceiver<Envelope>>,
}

impl QueueSlot {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        QueueSlot {
            sender,
            receiver: Some(receiver),
        }
    }
}

#[derive(Debug, Default)]
struct Queues {
    slots: DashMap<String, QueueSlot>,
    closed: DashSet<String>,
}

impl Queues {
    /// Temporary names are never reused and already fail once their slot
    /// is gone, so only named queues are remembered as closed.
    fn close(&self, destination: &Destination) {
        let name = destination.name();
        self.slots.remove(name);
        if !destination.is_temporary() {
            self.closed.insert(name.to_string());
        }
        debug!(%destination, "Closed destination");
    }
}

#[derive(Debug)]
pub struct InMemoryBroker {
    locator: String,
    queues: Arc<Queues>,
}

impl InMemoryBroker {
    pub fn new(locator: impl Into<String>) -> Self {
        InMemoryBroker {
            locator: locator.into(),
            queues: Arc::new(Queues::default()),
        }
    }

    /// Number of queues currently open, temporary ones included.
    pub fn queue_count(&self) -> usize {
        self.queues.slots.len()
    }

    pub fn has_queue(&self, name: &str) -> bool {
        self.queues.slots.contains_key(name)
    }

    fn attach(
        &self,
        destination: Destination,
        receiver: mpsc::UnboundedReceiver<Envelope>,
        listener: Arc<dyn MessageListener>,
    ) -> Subscription {
        let task = spawn_delivery(destination.name().to_string(), receiver, listener);
        let queues = Arc::clone(&self.queues);
        let closing = destination.clone();
        Subscription::new(destination, move || {
            task.abort();
            queues.close(&closing);
        })
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new("memory://localhost")
    }
}

fn spawn_delivery(
    queue: String,
    mut receiver: mpsc::UnboundedReceiver<Envelope>,
    listener: Arc<dyn MessageListener>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = receiver.recv().await {
            trace!(queue = %queue, bytes = envelope.payload.len(), "Delivering message");
            listener.on_message(envelope).await;
        }
        trace!(queue = %queue, "Delivery finished");
    })
}

#[async_trait]
impl Transport for InMemoryBroker {
    fn locator(&self) -> &str {
        &self.locator
    }

    async fn send(&self, destination: &Destination, envelope: Envelope) -> Result<(), TransportError> {
        let name = destination.name();
        if self.queues.closed.contains(name) {
            return Err(TransportError::DestinationClosed(destination.to_string()));
        }
        let closed = || TransportError::DestinationClosed(destination.to_string());
        match destination {
            Destination::Queue(_) => {
                let slot = self
                    .queues
                    .slots
                    .entry(name.to_string())
                    .or_insert_with(QueueSlot::new);
                slot.sender.send(envelope).map_err(|_| closed())
            }
            Destination::Temporary(_) => {
                let slot = self.queues.slots.get(name).ok_or_else(closed)?;
                slot.sender.send(envelope).map_err(|_| closed())
            }
        }
    }

    async fn subscribe(
        &self,
        queue: &str,
        listener: Arc<dyn MessageListener>,
    ) -> Result<Subscription, TransportError> {
        self.queues.closed.remove(queue);
        let receiver = self
            .queues
            .slots
            .entry(queue.to_string())
            .or_insert_with(QueueSlot::new)
            .receiver
            .take()
            .ok_or_else(|| TransportError::AlreadySubscribed(queue.to_string()))?;
        debug!(queue, "Subscribed");
        Ok(self.attach(Destination::queue(queue), receiver, listener))
    }

    async fn temporary_queue(
        &self,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(Destination, Subscription), TransportError> {
        let name = format!("ID:{}", Uuid::new_v4());
        let mut slot = QueueSlot::new();
        let receiver = slot.receiver.take().ok_or(TransportError::Shutdown)?;
        self.queues.slots.insert(name.clone(), slot);
        let destination = Destination::Temporary(name);
        debug!(destination = %destination, "Created temporary queue");
        let subscription = self.attach(destination.clone(), receiver, listener);
        Ok((destination, subscription))
    }
}
