use serde::{Deserialize, Serialize};

use crate::types::FileDescriptor;

/// Control frames exchanged over the direct channel as JSON text.
///
/// Binary data frames are not part of this enum; they are told apart by
/// their wire representation (binary vs text), never by content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlFrame {
    /// Receiver asks for the shared-file listing.
    RequestList,

    /// Seeder's listing of the shared directory.
    FileList { files: Vec<FileDescriptor> },

    /// Receiver asks for one file by name.
    RequestFile {
        #[serde(rename = "fileName")]
        file_name: String,
    },

    /// Announces the data frames that follow.
    FileStart { name: String, size: u64 },

    /// All data frames of the current file have been sent.
    FileEnd,

    /// Request-scoped failure.
    Error { message: String },
}

impl ControlFrame {
    /// Wire name of the frame type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RequestList => "request-list",
            Self::FileList { .. } => "file-list",
            Self::RequestFile { .. } => "request-file",
            Self::FileStart { .. } => "file-start",
            Self::FileEnd => "file-end",
            Self::Error { .. } => "error",
        }
    }

    /// Serializes to the JSON text carried by the channel.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a control frame from channel text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
