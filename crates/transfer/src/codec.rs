//! Classification of direct-channel messages into protocol frames.

use seedshare_protocol::ControlFrame;

use crate::TransferError;
use crate::channel::ChannelMessage;

/// A decoded direct-channel frame.
///
/// Text is always a control frame, binary is always file data. The
/// content is never sniffed.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Control(ControlFrame),
    Binary(Vec<u8>),
}

impl Frame {
    /// Decodes one channel message. Fails only on invalid control JSON.
    pub fn decode(msg: ChannelMessage) -> Result<Self, TransferError> {
        match msg {
            ChannelMessage::Text(text) => Ok(Self::Control(ControlFrame::from_json(&text)?)),
            ChannelMessage::Binary(data) => Ok(Self::Binary(data)),
        }
    }

    pub fn encode(&self) -> Result<ChannelMessage, TransferError> {
        match self {
            Self::Control(frame) => Ok(ChannelMessage::Text(frame.to_json()?)),
            Self::Binary(data) => Ok(ChannelMessage::Binary(data.clone())),
        }
    }
}

impl From<ControlFrame> for Frame {
    fn from(frame: ControlFrame) -> Self {
        Self::Control(frame)
    }
}
