use std::sync::Arc;

use eternity_store::FsContentStore;
use tracing::info;

use crate::config::ServerConfig;
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::error::ServerResult;
use crate::transport::Transport;
use crate::ws::WsTransport;

/// Eternity storage server.
pub struct EternityServer {
    config: ServerConfig,
}

impl EternityServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open the configured store and record the configured peers in it.
    pub fn open_store(&self) -> ServerResult<Arc<FsContentStore>> {
        let store = FsContentStore::open(&self.config.store_root)?;
        store.set_peers(self.config.peers.clone())?;
        Ok(Arc::new(store))
    }

    /// Serve requests arriving over `transport` until it closes.
    pub async fn serve_on(&self, transport: Arc<dyn Transport>) -> ServerResult<DispatchStats> {
        let store = self.open_store()?;
        Dispatcher::new(store, &self.config).run(transport).await
    }

    /// Connect to the anonymizing client at `client_uri` and serve.
    pub async fn serve(self) -> ServerResult<DispatchStats> {
        let transport = WsTransport::connect(&self.config.client_uri).await?;
        info!(
            store = %self.config.store_root.display(),
            client = %self.config.client_uri,
            "eternity server starting"
        );
        self.serve_on(Arc::new(transport)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eternity_store::ContentStore;

    #[test]
    fn server_construction() {
        let server = EternityServer::new(ServerConfig::default());
        assert_eq!(server.config().client_uri, "ws://127.0.0.1:1977");
    }

    #[test]
    fn open_store_records_peers() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            store_root: dir.path().join("store"),
            peers: vec!["peer-x".into()],
            ..Default::default()
        };
        let store = EternityServer::new(config).open_store().unwrap();
        assert!(store.is_empty());
        assert!(!store.exists(&eternity_types::ContentHash::compute(b"none")));
        assert_eq!(store.options().peers, vec!["peer-x".to_string()]);
    }

    #[tokio::test]
    async fn serve_fails_without_client() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            store_root: dir.path().to_path_buf(),
            client_uri: format!("ws://{addr}"),
            ..Default::default()
        };
        assert!(EternityServer::new(config).serve().await.is_err());
    }
}
