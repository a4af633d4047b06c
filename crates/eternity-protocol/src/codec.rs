use eternity_types::ReplyToken;

use crate::envelope::{ClientEvent, ClientRequest};
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{Action, Reply, Request, MAX_FRAME_SIZE};

/// Server-side codec: inbound frames to [`Request`]s, [`Reply`]s to outbound frames.
#[derive(Clone, Copy, Debug)]
pub struct EternityCodec {
    max_frame_size: usize,
}

impl Default for EternityCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

impl EternityCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Decode any frame sent by the anonymizing client.
    pub fn decode_event(&self, frame: &[u8]) -> ProtocolResult<ClientEvent> {
        if frame.len() > self.max_frame_size {
            return Err(ProtocolError::MessageTooLarge {
                size: frame.len(),
                max: self.max_frame_size,
            });
        }
        ClientEvent::decode(frame)
    }

    /// Decode a frame that must be an actionable storage request.
    ///
    /// A Received frame without a reply token is rejected: nothing could be
    /// answered. Error frames surface as [`ProtocolError::TransportError`].
    pub fn decode_request(&self, frame: &[u8]) -> ProtocolResult<Request> {
        match self.decode_event(frame)? {
            ClientEvent::Received {
                message,
                reply_token: Some(reply_token),
            } => Ok(Request {
                reply_token,
                action: Action::decode(&message)?,
            }),
            ClientEvent::Received {
                reply_token: None, ..
            } => Err(ProtocolError::MissingReplyToken),
            ClientEvent::Error { kind, message } => {
                Err(ProtocolError::TransportError { kind, message })
            }
            other => Err(ProtocolError::UnexpectedTag(other.type_tag())),
        }
    }

    /// Encode the Reply frame that routes `reply` back through `token`.
    pub fn encode_reply(&self, token: ReplyToken, reply: &Reply) -> Vec<u8> {
        ClientRequest::Reply {
            token,
            message: reply.encode(),
        }
        .encode()
    }
}
