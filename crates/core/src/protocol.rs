// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages for client-server communication.
//!
//! Every frame is a JSON object discriminated by its `type` field:
//! - Client sends the `auth` handshake, `heartbeat`s, and application
//!   messages shaped as `{type, data: {...payload, deviceId, timestamp, priority}}`
//! - Server pushes events shaped as `{type, data?}`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::{DeviceIdentity, DeviceInfo};
use crate::priority::Priority;

/// Application message kind for clipboard contents.
pub const KIND_CLIPBOARD_SYNC: &str = "clipboard_sync";
/// Application message kind for file transfer bookkeeping.
pub const KIND_FILE_TRANSFER: &str = "file_transfer";
/// Application message kind for this device's presence.
pub const KIND_DEVICE_STATUS: &str = "device_status";

/// Suggestions at or below this confidence are not worth showing.
pub const AI_SUGGESTION_THRESHOLD: f64 = 0.8;

/// Error parsing an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Not JSON, or a payload that does not match its type.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Object without a `type` discriminator.
    #[error("message has no type")]
    MissingType,

    /// A required field is absent.
    #[error("{kind} message is missing '{field}'")]
    MissingField { kind: &'static str, field: &'static str },

    /// A `type` this client does not understand.
    #[error("unknown message type: {0}")]
    UnknownType(String),
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ClientMessage {
    /// Connection-level traffic (handshake, keepalive).
    Control(ControlMessage),
    /// An application message of any kind.
    App(AppMessage),
}

/// Connection-level messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ControlMessage {
    /// Handshake sent once per socket, right after it opens.
    Auth {
        /// Bearer token; `null` when no token is available.
        token: Option<String>,
        device_id: String,
        device_info: DeviceInfo,
    },

    /// Keepalive sent on a fixed interval while connected.
    Heartbeat { timestamp: u64, device_id: String },
}

/// An application message, `{type: kind, data: {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Map<String, Value>,
}

impl AppMessage {
    /// Wraps `payload` with the sender's device id, the transmission time and
    /// the priority. These three keys override same-named payload keys.
    pub fn new(
        kind: impl Into<String>,
        payload: &Map<String, Value>,
        device_id: &str,
        timestamp: u64,
        priority: Priority,
    ) -> Self {
        let mut data = payload.clone();
        data.insert("deviceId".to_string(), Value::from(device_id));
        data.insert("timestamp".to_string(), Value::from(timestamp));
        data.insert("priority".to_string(), Value::from(priority.as_str()));
        AppMessage { kind: kind.into(), data }
    }
}

impl ClientMessage {
    /// Creates the handshake message for `identity`.
    pub fn auth(token: Option<String>, identity: &DeviceIdentity) -> Self {
        ClientMessage::Control(ControlMessage::Auth {
            token,
            device_id: identity.device_id.clone(),
            device_info: identity.device_info.clone(),
        })
    }

    /// Creates a heartbeat message.
    pub fn heartbeat(timestamp: u64, device_id: impl Into<String>) -> Self {
        ClientMessage::Control(ControlMessage::Heartbeat { timestamp, device_id: device_id.into() })
    }

    /// Creates an application message.
    pub fn app(message: AppMessage) -> Self {
        ClientMessage::App(message)
    }

    /// The `type` discriminator of this message.
    pub fn kind(&self) -> &str {
        match self {
            ClientMessage::Control(ControlMessage::Auth { .. }) => "auth",
            ClientMessage::Control(ControlMessage::Heartbeat { .. }) => "heartbeat",
            ClientMessage::App(app) => &app.kind,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Clipboard contents pushed from another device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardSync {
    pub device_id: String,
    pub device_name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ClipboardSync {
    /// Returns true if this update originated from `device_id`.
    ///
    /// The server echoes clipboard updates to every device of the user,
    /// including the sender.
    pub fn is_from(&self, device_id: &str) -> bool {
        self.device_id == device_id
    }
}

/// Lifecycle of a file transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransferStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    /// A status this client does not know about.
    Other(String),
}

impl From<String> for TransferStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => TransferStatus::Pending,
            "in_progress" => TransferStatus::InProgress,
            "completed" => TransferStatus::Completed,
            "failed" => TransferStatus::Failed,
            _ => TransferStatus::Other(s),
        }
    }
}

impl From<TransferStatus> for String {
    fn from(status: TransferStatus) -> Self {
        match status {
            TransferStatus::Pending => "pending".to_string(),
            TransferStatus::InProgress => "in_progress".to_string(),
            TransferStatus::Completed => "completed".to_string(),
            TransferStatus::Failed => "failed".to_string(),
            TransferStatus::Other(s) => s,
        }
    }
}

/// Progress report for a file transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTransferUpdate {
    pub transfer_id: String,
    pub status: TransferStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

impl FileTransferUpdate {
    /// Progress rounded to a whole percentage, clamped to 0..=100.
    pub fn progress_percent(&self) -> Option<u8> {
        self.progress.filter(|p| p.is_finite()).map(|p| p.round().clamp(0.0, 100.0) as u8)
    }
}

/// Presence of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceStatus {
    Online,
    Offline,
    Busy,
    /// A status this client does not know about.
    Other(String),
}

impl From<String> for DeviceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "online" => DeviceStatus::Online,
            "offline" => DeviceStatus::Offline,
            "busy" => DeviceStatus::Busy,
            _ => DeviceStatus::Other(s),
        }
    }
}

impl From<DeviceStatus> for String {
    fn from(status: DeviceStatus) -> Self {
        match status {
            DeviceStatus::Online => "online".to_string(),
            DeviceStatus::Offline => "offline".to_string(),
            DeviceStatus::Busy => "busy".to_string(),
            DeviceStatus::Other(s) => s,
        }
    }
}

/// Another device changed presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdate {
    pub device_name: String,
    pub status: DeviceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

/// A suggestion from the assistant service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    pub confidence: f64,
    pub description: String,
}

impl AiSuggestion {
    /// Returns true if the suggestion is confident enough to surface.
    pub fn is_actionable(&self) -> bool {
        self.confidence > AI_SUGGESTION_THRESHOLD
    }
}

/// Events pushed from server to client.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ClipboardSync(ClipboardSync),
    FileTransfer(FileTransferUpdate),
    DeviceUpdate(DeviceUpdate),
    AiSuggestion(AiSuggestion),
    /// Handshake accepted.
    AuthSuccess,
    /// Handshake rejected.
    AuthError { message: Option<String> },
    /// The server finished applying a batch of sync messages.
    SyncComplete,
    HeartbeatResponse,
    /// Application-level error reported by the server.
    Error { message: String },
}

/// Wire shape shared by all inbound frames.
#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl Envelope {
    fn payload<T: DeserializeOwned>(self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_value(self.data.unwrap_or(Value::Null))?)
    }

    /// `message` at the top level, or inside `data`.
    fn message(&self) -> Option<String> {
        self.message.clone().or_else(|| {
            self.data
                .as_ref()
                .and_then(|d| d.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
    }
}

impl InboundEvent {
    /// The `type` discriminator of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::ClipboardSync(_) => "clipboard_sync",
            InboundEvent::FileTransfer(_) => "file_transfer",
            InboundEvent::DeviceUpdate(_) => "device_update",
            InboundEvent::AiSuggestion(_) => "ai_suggestion",
            InboundEvent::AuthSuccess => "auth_success",
            InboundEvent::AuthError { .. } => "auth_error",
            InboundEvent::SyncComplete => "sync_complete",
            InboundEvent::HeartbeatResponse => "heartbeat_response",
            InboundEvent::Error { .. } => "error",
        }
    }

    /// Parses an inbound frame.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(s)?;
        let kind = envelope.kind.clone().ok_or(ProtocolError::MissingType)?;

        let event = match kind.as_str() {
            "clipboard_sync" => InboundEvent::ClipboardSync(envelope.payload()?),
            "file_transfer" => InboundEvent::FileTransfer(envelope.payload()?),
            "device_update" => InboundEvent::DeviceUpdate(envelope.payload()?),
            "ai_suggestion" => InboundEvent::AiSuggestion(envelope.payload()?),
            "auth_success" => InboundEvent::AuthSuccess,
            "auth_error" => InboundEvent::AuthError { message: envelope.message() },
            "sync_complete" => InboundEvent::SyncComplete,
            "heartbeat_response" => InboundEvent::HeartbeatResponse,
            "error" => InboundEvent::Error {
                message: envelope
                    .message()
                    .ok_or(ProtocolError::MissingField { kind: "error", field: "message" })?,
            },
            _ => return Err(ProtocolError::UnknownType(kind)),
        };
        Ok(event)
    }

    /// Serializes the event in its wire shape.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let data = match self {
            InboundEvent::ClipboardSync(p) => Some(serde_json::to_value(p)?),
            InboundEvent::FileTransfer(p) => Some(serde_json::to_value(p)?),
            InboundEvent::DeviceUpdate(p) => Some(serde_json::to_value(p)?),
            InboundEvent::AiSuggestion(p) => Some(serde_json::to_value(p)?),
            InboundEvent::AuthError { message: Some(message) } | InboundEvent::Error { message } => {
                Some(serde_json::json!({ "message": message }))
            }
            InboundEvent::AuthError { message: None }
            | InboundEvent::AuthSuccess
            | InboundEvent::SyncComplete
            | InboundEvent::HeartbeatResponse => None,
        };
        serde_json::to_string(&Envelope { kind: Some(self.kind().to_string()), data, message: None })
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
