use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Destination closed: {0}")]
    DestinationClosed(String),
    #[error("Queue {0} already has a consumer")]
    AlreadySubscribed(String),
    #[error("Transport shut down")]
    Shutdown,
}

/// Where a message is delivered: a named queue or a private reply queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    Queue(String),
    Temporary(String),
}

impl Destination {
    pub fn queue(name: impl Into<String>) -> Self {
        Destination::Queue(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Destination::Queue(name) | Destination::Temporary(name) => name,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Destination::Temporary(_))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Queue(name) => write!(f, "queue://{}", name),
            Destination::Temporary(name) => write!(f, "temp-queue://{}", name),
        }
    }
}

/// An opaque payload plus the two metadata fields the protocol relies on.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub payload: Bytes,
    pub correlation_id: Option<String>,
    pub reply_to: Option<Destination>,
}

impl Envelope {
    pub fn new(payload: Bytes) -> Self {
        Envelope {
            payload,
            ..Default::default()
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_reply_to(mut self, destination: Destination) -> Self {
        self.reply_to = Some(destination);
        self
    }
}

/// Push-style consumer callback.
#[async_trait]
pub trait MessageListener: Send + Sync {
    async fn on_message(&self, envelope: Envelope);
}

/// Active consumer registration. Dropping it stops delivery and closes the
/// destination.
pub struct Subscription {
    destination: Destination,
    closer: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(destination: Destination, closer: impl FnOnce() + Send + Sync + 'static) -> Self {
        Subscription {
            destination,
            closer: Some(Box::new(closer)),
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn close(mut self) {
        self.run_closer();
    }

    fn run_closer(&mut self) {
        if let Some(closer) = self.closer.take() {
            closer();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_closer();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("destination", &self.destination)
            .field("open", &self.closer.is_some())
            .finish()
    }
}

/// Point-to-point messaging the runtime is layered on.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Locator string identifying this transport connection.
    fn locator(&self) -> &str;

    async fn send(&self, destination: &Destination, envelope: Envelope) -> Result<(), TransportError>;

    /// Attaches the single consumer of the named queue.
    async fn subscribe(
        &self,
        queue: &str,
        listener: Arc<dyn MessageListener>,
    ) -> Result<Subscription, TransportError>;

    /// Creates a private, uniquely named destination consumed by `listener`.
    async fn temporary_queue(
        &self,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(Destination, Subscription), TransportError>;
}
