pub mod memory;
pub mod transport;

pub use memory::InMemoryBroker;
pub use transport::{Destination, Envelope, MessageListener, Subscription, Transport, TransportError};
