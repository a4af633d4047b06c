use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::error::{ServerError, ServerResult};

/// Duplex link to the anonymizing-network client.
///
/// Delivers whole binary frames, in order. `receive` returns `Ok(None)` once
/// the link is closed.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, frame: Vec<u8>) -> ServerResult<()>;
    async fn receive(&self) -> ServerResult<Option<Vec<u8>>>;
}

/// One end of an in-process transport pair.
pub struct MemoryTransport {
    tx: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    rx: Mutex<mpsc::Receiver<Vec<u8>>>,
}

impl MemoryTransport {
    /// Two connected ends; frames sent on one are received on the other.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(capacity);
        let (b_tx, a_rx) = mpsc::channel(capacity);
        (Self::new(a_tx, a_rx), Self::new(b_tx, b_rx))
    }

    fn new(tx: mpsc::Sender<Vec<u8>>, rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
        }
    }

    /// Stop sending. The other end sees the link close once it drains.
    pub async fn close(&self) {
        self.tx.lock().await.take();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, frame: Vec<u8>) -> ServerResult<()> {
        let tx = self.tx.lock().await;
        let tx = tx.as_ref().ok_or(ServerError::TransportClosed)?;
        tx.send(frame)
            .await
            .map_err(|_| ServerError::TransportClosed)
    }

    async fn receive(&self) -> ServerResult<Option<Vec<u8>>> {
        Ok(self.rx.lock().await.recv().await)
    }
}
