pub mod config;
pub mod endpoint;
pub mod logging;
pub mod service;

pub use config::EndpointConfig;
pub use endpoint::Endpoint;
pub use logging::init_test_logging;
pub use service::RpcService;
