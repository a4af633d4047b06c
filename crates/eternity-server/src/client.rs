use std::sync::Arc;

use eternity_crypto::SigningKey;
use eternity_protocol::{Action, ClientEvent, ClientRequest, ProtocolError, Reply};
use eternity_types::{ContentHash, Recipient};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ServerError, ServerResult};
use crate::transport::Transport;

/// Talks to a storage server through a local anonymizing-network client.
///
/// Requests are sent one at a time: each carries a fresh reply token and the
/// next Received frame is taken as its answer.
pub struct StorageClient {
    transport: Arc<dyn Transport>,
    server: Recipient,
    exchange: Mutex<()>,
}

impl StorageClient {
    pub fn new(transport: Arc<dyn Transport>, server: Recipient) -> Self {
        Self {
            transport,
            server,
            exchange: Mutex::new(()),
        }
    }

    pub fn server(&self) -> &Recipient {
        &self.server
    }

    /// Ask the anonymizing client for this node's own address.
    pub async fn self_address(&self) -> ServerResult<Recipient> {
        let _guard = self.exchange.lock().await;
        self.transport.send(ClientRequest::SelfAddress.encode()).await?;
        match self.next_event().await? {
            ClientEvent::SelfAddress(address) => Ok(address),
            other => Err(unexpected(&other)),
        }
    }

    /// Send `action` to the server and wait for its reply.
    pub async fn request(&self, action: &Action) -> ServerResult<Reply> {
        let _guard = self.exchange.lock().await;
        let frame = ClientRequest::Send {
            recipient: self.server.clone(),
            with_reply_token: true,
            message: action.encode(),
        };
        debug!(action = action.type_name(), "sending request");
        self.transport.send(frame.encode()).await?;
        match self.next_event().await? {
            ClientEvent::Received { message, .. } => Ok(Reply::decode(&message)?),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn search(&self, hash: ContentHash) -> ServerResult<bool> {
        Ok(self.request(&Action::Search(hash)).await?.is_ok())
    }

    /// Store `contents`, signed by `key` if given. Returns the acknowledged hash.
    pub async fn store(
        &self,
        contents: Vec<u8>,
        key: Option<&SigningKey>,
    ) -> ServerResult<Option<ContentHash>> {
        let action = match key {
            Some(key) => Action::signed_store(key, contents),
            None => Action::anonymous_store(contents),
        };
        Ok(self.request(&action).await?.stored_hash())
    }

    pub async fn serve(&self, hash: ContentHash) -> ServerResult<Option<Vec<u8>>> {
        let reply = self.request(&Action::Serve(hash)).await?;
        Ok(reply.is_ok().then_some(reply.body))
    }

    pub async fn delete(&self, hash: ContentHash, key: &SigningKey) -> ServerResult<Reply> {
        self.request(&Action::signed_delete(key, hash)).await
    }

    async fn next_event(&self) -> ServerResult<ClientEvent> {
        let frame = self
            .transport
            .receive()
            .await?
            .ok_or(ServerError::TransportClosed)?;
        match ClientEvent::decode(&frame)? {
            ClientEvent::Error { kind, message } => {
                Err(ProtocolError::TransportError { kind, message }.into())
            }
            event => Ok(event),
        }
    }
}

fn unexpected(event: &ClientEvent) -> ServerError {
    ProtocolError::UnexpectedTag(event.type_tag()).into()
}
