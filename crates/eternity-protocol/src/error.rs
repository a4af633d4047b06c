use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Malformed, truncated, or internally inconsistent frame.
    #[error("framing error: {0}")]
    Framing(String),

    #[error("received frame carries no reply token")]
    MissingReplyToken,

    #[error("unknown action: {0:#04x}")]
    UnknownAction(u8),

    #[error("unexpected frame tag: {0:#04x}")]
    UnexpectedTag(u8),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// An Error frame sent by the anonymizing client.
    #[error("anonymizing client error (kind {kind}): {message}")]
    TransportError { kind: u8, message: String },
}

impl ProtocolError {
    pub(crate) fn truncated(field: &str) -> Self {
        Self::Framing(format!("truncated {field}"))
    }

    /// Returns `true` for errors caused by the bytes of the frame itself.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::Framing(_)
                | Self::MissingReplyToken
                | Self::UnknownAction(_)
                | Self::UnexpectedTag(_)
                | Self::MessageTooLarge { .. }
        )
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
