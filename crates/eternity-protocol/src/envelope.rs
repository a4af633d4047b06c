//! Frames exchanged with the anonymizing-network client.
//!
//! Outbound frames ([`ClientRequest`]) ask the client to send a message,
//! answer through a reply token, or report our own address. Inbound frames
//! ([`ClientEvent`]) carry received messages, the address answer, or an
//! error. All length fields are u64 big-endian.

use bytes::BufMut;
use eternity_types::{Recipient, ReplyToken, RECIPIENT_LEN};

use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::{put_len_prefixed, take_array, take_exact_tail, take_len, take_bytes, take_u8};

pub mod tags {
    pub const SEND: u8 = 0x00;
    pub const REPLY: u8 = 0x01;
    pub const SELF_ADDRESS: u8 = 0x02;

    pub const ERROR: u8 = 0x00;
    pub const RECEIVED: u8 = 0x01;
    pub const SELF_ADDRESS_RESPONSE: u8 = 0x02;
}

/// A frame written to the anonymizing client.
#[derive(Debug, PartialEq, Eq)]
pub enum ClientRequest {
    /// `[0x00][with_reply_token][recipient; 96][len][message]`
    Send {
        recipient: Recipient,
        with_reply_token: bool,
        message: Vec<u8>,
    },
    /// `[0x01][token len][token][len][message]`
    Reply { token: ReplyToken, message: Vec<u8> },
    /// `[0x02]`
    SelfAddress,
}

/// A frame read from the anonymizing client.
#[derive(Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// `[0x00][kind][len][utf-8 message]`
    Error { kind: u8, message: String },
    /// `[0x01][has_token][token len][token]?[len][message]`
    Received {
        message: Vec<u8>,
        reply_token: Option<ReplyToken>,
    },
    /// `[0x02][address; 96]`
    SelfAddress(Recipient),
}

impl ClientRequest {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::Send { .. } => tags::SEND,
            Self::Reply { .. } => tags::REPLY,
            Self::SelfAddress => tags::SELF_ADDRESS,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Send { .. } => "Send",
            Self::Reply { .. } => "Reply",
            Self::SelfAddress => "SelfAddress",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u8(self.type_tag());
        match self {
            Self::Send {
                recipient,
                with_reply_token,
                message,
            } => {
                out.put_u8(u8::from(*with_reply_token));
                out.put_slice(recipient.as_bytes());
                put_len_prefixed(&mut out, message);
            }
            Self::Reply { token, message } => {
                put_len_prefixed(&mut out, token.as_bytes());
                put_len_prefixed(&mut out, message);
            }
            Self::SelfAddress => {}
        }
        out
    }

    /// Parse a frame as the anonymizing client would.
    pub fn decode(frame: &[u8]) -> ProtocolResult<Self> {
        let mut buf = frame;
        match take_u8(&mut buf, "tag")? {
            tags::SEND => {
                let with_reply_token = take_flag(&mut buf, "reply token flag")?;
                let recipient = Recipient::from(take_array::<RECIPIENT_LEN>(&mut buf, "recipient")?);
                let message = take_exact_tail(&mut buf, "message")?.to_vec();
                Ok(Self::Send {
                    recipient,
                    with_reply_token,
                    message,
                })
            }
            tags::REPLY => {
                let token_len = take_len(&mut buf, "reply token length")?;
                let token = ReplyToken::new(take_bytes(&mut buf, token_len, "reply token")?.to_vec());
                let message = take_exact_tail(&mut buf, "message")?.to_vec();
                Ok(Self::Reply { token, message })
            }
            tags::SELF_ADDRESS if buf.is_empty() => Ok(Self::SelfAddress),
            tags::SELF_ADDRESS => Err(ProtocolError::Framing(
                "self address request carries trailing bytes".into(),
            )),
            other => Err(ProtocolError::UnexpectedTag(other)),
        }
    }
}

impl ClientEvent {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::Error { .. } => tags::ERROR,
            Self::Received { .. } => tags::RECEIVED,
            Self::SelfAddress(_) => tags::SELF_ADDRESS_RESPONSE,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Error { .. } => "Error",
            Self::Received { .. } => "Received",
            Self::SelfAddress(_) => "SelfAddress",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u8(self.type_tag());
        match self {
            Self::Error { kind, message } => {
                out.put_u8(*kind);
                put_len_prefixed(&mut out, message.as_bytes());
            }
            Self::Received {
                message,
                reply_token,
            } => {
                match reply_token {
                    Some(token) => {
                        out.put_u8(1);
                        put_len_prefixed(&mut out, token.as_bytes());
                    }
                    None => out.put_u8(0),
                }
                put_len_prefixed(&mut out, message);
            }
            Self::SelfAddress(address) => out.put_slice(address.as_bytes()),
        }
        out
    }

    pub fn decode(frame: &[u8]) -> ProtocolResult<Self> {
        let mut buf = frame;
        match take_u8(&mut buf, "tag")? {
            tags::ERROR => {
                let kind = take_u8(&mut buf, "error kind")?;
                let message = String::from_utf8_lossy(take_exact_tail(&mut buf, "error message")?)
                    .into_owned();
                Ok(Self::Error { kind, message })
            }
            tags::RECEIVED => {
                let reply_token = if take_flag(&mut buf, "reply token flag")? {
                    let len = take_len(&mut buf, "reply token length")?;
                    Some(ReplyToken::new(take_bytes(&mut buf, len, "reply token")?.to_vec()))
                } else {
                    None
                };
                let message = take_exact_tail(&mut buf, "payload")?.to_vec();
                Ok(Self::Received {
                    message,
                    reply_token,
                })
            }
            tags::SELF_ADDRESS_RESPONSE => {
                if buf.len() != RECIPIENT_LEN {
                    return Err(ProtocolError::Framing(format!(
                        "self address must be {RECIPIENT_LEN} bytes, got {}",
                        buf.len()
                    )));
                }
                Ok(Self::SelfAddress(Recipient::from(take_array::<RECIPIENT_LEN>(
                    &mut buf, "address",
                )?)))
            }
            other => Err(ProtocolError::UnexpectedTag(other)),
        }
    }
}

fn take_flag(buf: &mut &[u8], field: &str) -> ProtocolResult<bool> {
    match take_u8(buf, field)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ProtocolError::Framing(format!("{field} must be 0 or 1, got {other}"))),
    }
}
