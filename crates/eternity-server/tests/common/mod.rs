//! A stand-in for the anonymizing-network client.
//!
//! Sits between one storage client and one server. Send frames from the
//! client become Received frames at the server, each with a fresh reply
//! token; Reply frames from the server are checked against the outstanding
//! tokens and delivered to the client without one.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use eternity_protocol::{ClientEvent, ClientRequest};
use eternity_server::{
    DispatchStats, EternityServer, MemoryTransport, ServerConfig, ServerResult, StorageClient,
    Transport,
};
use eternity_types::{Recipient, ReplyToken, RECIPIENT_LEN};
use tokio::task::JoinHandle;

pub const CLIENT_ADDRESS: [u8; RECIPIENT_LEN] = [0xc1; RECIPIENT_LEN];
pub const SERVER_ADDRESS: [u8; RECIPIENT_LEN] = [0x5e; RECIPIENT_LEN];

/// Reply tokens handed to the server, and the ones it answered on, in order.
#[derive(Debug, Default)]
pub struct RouteLog {
    pub issued: Vec<Vec<u8>>,
    pub answered: Vec<Vec<u8>>,
}

pub struct Network {
    pub client: StorageClient,
    pub log: Arc<Mutex<RouteLog>>,
    client_end: Arc<MemoryTransport>,
    server: JoinHandle<ServerResult<DispatchStats>>,
    _store_dir: tempfile::TempDir,
}

impl Network {
    pub async fn start(config: ServerConfig) -> Self {
        let store_dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            store_root: store_dir.path().to_path_buf(),
            ..config
        };

        let (client_end, client_side) = MemoryTransport::pair(16);
        let (server_end, server_side) = MemoryTransport::pair(16);
        let log = Arc::new(Mutex::new(RouteLog::default()));
        tokio::spawn(route(client_side, server_side, Arc::clone(&log)));

        let server = tokio::spawn(async move {
            EternityServer::new(config)
                .serve_on(Arc::new(server_end))
                .await
        });

        let client_end = Arc::new(client_end);
        let transport: Arc<dyn Transport> = client_end.clone();
        let client = StorageClient::new(transport, Recipient::from(SERVER_ADDRESS));
        Self {
            client,
            log,
            client_end,
            server,
            _store_dir: store_dir,
        }
    }

    /// Disconnect the client and wait for the server to drain.
    pub async fn shutdown(self) -> DispatchStats {
        self.client_end.close().await;
        self.server.await.unwrap().unwrap()
    }
}

async fn route(client_side: MemoryTransport, server_side: MemoryTransport, log: Arc<Mutex<RouteLog>>) {
    let mut outstanding = HashSet::new();
    let mut next_token = 0u64;
    loop {
        tokio::select! {
            frame = client_side.receive() => {
                let Ok(Some(frame)) = frame else {
                    server_side.close().await;
                    break;
                };
                match ClientRequest::decode(&frame).unwrap() {
                    ClientRequest::SelfAddress => {
                        let event = ClientEvent::SelfAddress(Recipient::from(CLIENT_ADDRESS));
                        client_side.send(event.encode()).await.unwrap();
                    }
                    ClientRequest::Send { recipient, with_reply_token, message } => {
                        assert_eq!(recipient, Recipient::from(SERVER_ADDRESS));
                        let reply_token = with_reply_token.then(|| {
                            next_token += 1;
                            let token = format!("surb-{next_token}").into_bytes();
                            outstanding.insert(token.clone());
                            log.lock().unwrap().issued.push(token.clone());
                            ReplyToken::new(token)
                        });
                        let event = ClientEvent::Received { message, reply_token };
                        server_side.send(event.encode()).await.unwrap();
                    }
                    ClientRequest::Reply { .. } => panic!("clients do not reply"),
                }
            }
            frame = server_side.receive() => {
                let Ok(Some(frame)) = frame else { break };
                match ClientRequest::decode(&frame).unwrap() {
                    ClientRequest::Reply { token, message } => {
                        let token = token.into_bytes();
                        assert!(outstanding.remove(&token), "reply token reused or unknown");
                        log.lock().unwrap().answered.push(token);
                        let event = ClientEvent::Received { message, reply_token: None };
                        client_side.send(event.encode()).await.unwrap();
                    }
                    other => panic!("server sent {other:?}"),
                }
            }
        }
    }
}
