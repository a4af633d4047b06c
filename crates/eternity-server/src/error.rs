use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("protocol error: {0}")]
    Protocol(#[from] eternity_protocol::ProtocolError),

    #[error("store error: {0}")]
    Store(#[from] eternity_store::StoreError),

    #[error("transport closed")]
    TransportClosed,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;
