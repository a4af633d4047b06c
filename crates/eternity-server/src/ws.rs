use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::error::{ServerError, ServerResult};
use crate::transport::Transport;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connection to the anonymizing-network client.
///
/// Only binary messages carry frames. Text messages belong to the client's
/// JSON interface and are skipped.
pub struct WsTransport {
    sink: Mutex<SplitSink<Socket, Message>>,
    stream: Mutex<SplitStream<Socket>>,
}

impl WsTransport {
    pub async fn connect(uri: &str) -> ServerResult<Self> {
        let (socket, _response) = tokio_tungstenite::connect_async(uri)
            .await
            .map_err(|e| ServerError::Transport(format!("connect {uri}: {e}")))?;
        info!(%uri, "connected to anonymizing client");
        let (sink, stream) = socket.split();
        Ok(Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, frame: Vec<u8>) -> ServerResult<()> {
        self.sink
            .lock()
            .await
            .send(Message::Binary(frame.into()))
            .await
            .map_err(|e| ServerError::Transport(e.to_string()))
    }

    async fn receive(&self) -> ServerResult<Option<Vec<u8>>> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.to_vec())),
                Some(Ok(Message::Text(text))) => {
                    debug!(len = text.len(), "ignoring text message");
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(ServerError::Transport(e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn binary_frames_roundtrip_and_text_is_skipped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let peer = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text("{\"type\":\"legacy\"}".into()))
                .await
                .unwrap();
            ws.send(Message::Binary(vec![1u8, 2, 3].into())).await.unwrap();
            let echoed = loop {
                match ws.next().await.unwrap().unwrap() {
                    Message::Binary(data) => break data.to_vec(),
                    _ => continue,
                }
            };
            ws.close(None).await.unwrap();
            echoed
        });

        let transport = WsTransport::connect(&format!("ws://{addr}")).await.unwrap();
        assert_eq!(transport.receive().await.unwrap(), Some(vec![1, 2, 3]));
        transport.send(vec![4, 5]).await.unwrap();
        assert_eq!(transport.receive().await.unwrap(), None);
        assert_eq!(peer.await.unwrap(), vec![4, 5]);
    }

    #[tokio::test]
    async fn connect_failure_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = WsTransport::connect(&format!("ws://{addr}")).await.err().unwrap();
        assert!(matches!(err, ServerError::Transport(_)));
    }
}
