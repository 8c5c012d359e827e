pub mod client;
pub mod macros;
pub mod proxy;

pub use client::{request_queue, RpcClient};
pub use proxy::{invoke_by_name, RemoteRef};

#[doc(hidden)]
pub mod __private {
    pub use mqlite_core::Value;
}
