//! Request dispatcher for Eternity.
//!
//! Connects to a local anonymizing-network client, decodes storage requests
//! from the frames it delivers, executes them against the content store, and
//! routes each reply back through the request's single-use reply token.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod server;
pub mod transport;
pub mod ws;

pub use client::StorageClient;
pub use config::{DeadlinePolicy, ServerConfig};
pub use dispatcher::{DispatchStats, Dispatcher, Response};
pub use error::{ServerError, ServerResult};
pub use server::EternityServer;
pub use transport::{MemoryTransport, Transport};
pub use ws::WsTransport;
