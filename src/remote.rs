//! Remote container API.
//!
//! - `client_trait`: the `ContainerApi` trait (verbs, operation wait).
//! - `socket_client`: `SocketClient`, talking to the API over its unix socket.
//! - `types`: response envelope and operation types.

pub mod client_trait;
pub mod socket_client;
pub mod types;

pub use client_trait::ContainerApi;
pub use socket_client::SocketClient;
pub use types::{Method, Operation, Response, ResponseKind};
