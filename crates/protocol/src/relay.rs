use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::constants::{RelayMessageType, SEEDER_RECIPIENT};

/// Role a client may declare when joining a room.
pub const ROLE_SEEDER: &str = "seeder";

/// Envelope for all relay communication.
///
/// Only `type`, `sender` and `recipient` are interpreted by the relay.
/// Everything else (`room`, `offer`, `answer`, `candidate`, ...) lives in
/// `payload` and is forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    #[serde(rename = "type")]
    pub msg_type: RelayMessageType,
    /// Relay-assigned id of the originating connection. Client-supplied
    /// values of any JSON type are accepted here and overwritten on relay.
    #[serde(
        default,
        deserialize_with = "untrusted_sender",
        skip_serializing_if = "Option::is_none"
    )]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Delivery target named by a message's `recipient` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient<'a> {
    /// The seeder of the sender's room.
    Seeder,
    /// A concrete relay-assigned id.
    Peer(&'a str),
    /// Every other client of the sender's room.
    Room,
}

/// An ICE candidate as exchanged through the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
}

/// Keeps a string `sender`; any other JSON value is discarded.
fn untrusted_sender<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(id),
        _ => None,
    })
}

impl RelayMessage {
    /// Creates a message with an empty payload.
    pub fn new(msg_type: RelayMessageType, recipient: Option<String>) -> Self {
        Self {
            msg_type,
            sender: None,
            recipient,
            payload: Map::new(),
        }
    }

    /// `{type: welcome, id}` pushed by the relay on connect.
    pub fn welcome(id: impl Into<String>) -> Self {
        Self::new(RelayMessageType::Welcome, None).with_field("id", Value::String(id.into()))
    }

    /// `{type: join, room?, role?}`.
    pub fn join(room: Option<&str>, role: Option<&str>) -> Self {
        let mut msg = Self::new(RelayMessageType::Join, None);
        if let Some(room) = room {
            msg = msg.with_field("room", room);
        }
        if let Some(role) = role {
            msg = msg.with_field("role", role);
        }
        msg
    }

    /// `{type: offer, offer, recipient}`. The description is opaque.
    pub fn offer(recipient: impl Into<String>, offer: Value) -> Self {
        Self::new(RelayMessageType::Offer, Some(recipient.into())).with_field("offer", offer)
    }

    /// `{type: answer, answer, recipient}`.
    pub fn answer(recipient: impl Into<String>, answer: Value) -> Self {
        Self::new(RelayMessageType::Answer, Some(recipient.into())).with_field("answer", answer)
    }

    /// `{type: candidate, candidate, sdpMid, sdpMLineIndex, recipient}`.
    pub fn candidate(recipient: impl Into<String>, candidate: &IceCandidate) -> Self {
        let mut msg = Self::new(RelayMessageType::Candidate, Some(recipient.into()));
        if let Ok(Value::Object(fields)) = serde_json::to_value(candidate) {
            msg.payload.extend(fields);
        }
        msg
    }

    /// Advisory `{type: error, message}`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(RelayMessageType::Error, None).with_field("message", Value::String(message.into()))
    }

    /// Adds a payload field.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Overwrites `sender` with the relay-assigned id of the originating
    /// connection, discarding whatever the client supplied.
    pub fn stamp_sender(&mut self, id: &str) {
        self.sender = Some(id.to_string());
    }

    /// Classifies the `recipient` field.
    pub fn target(&self) -> Recipient<'_> {
        match self.recipient.as_deref() {
            None | Some("") => Recipient::Room,
            Some(SEEDER_RECIPIENT) => Recipient::Seeder,
            Some(id) => Recipient::Peer(id),
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Room requested by a `join`.
    pub fn room(&self) -> Option<&str> {
        self.str_field("room").filter(|r| !r.is_empty())
    }

    /// Role declared by a `join`.
    pub fn role(&self) -> Option<&str> {
        self.str_field("role")
    }

    /// Id carried by a `welcome`.
    pub fn welcome_id(&self) -> Option<&str> {
        self.str_field("id")
    }

    /// Text carried by an `error`.
    pub fn error_message(&self) -> Option<&str> {
        self.str_field("message")
    }

    /// Session description of an `offer` or `answer`.
    pub fn description(&self) -> Option<&Value> {
        match self.msg_type {
            RelayMessageType::Offer => self.payload.get("offer"),
            RelayMessageType::Answer => self.payload.get("answer"),
            _ => None,
        }
    }

    /// Parses the candidate fields of a `candidate` message.
    pub fn ice_candidate(&self) -> Option<IceCandidate> {
        if self.msg_type != RelayMessageType::Candidate {
            return None;
        }
        serde_json::from_value(Value::Object(self.payload.clone())).ok()
    }
}
