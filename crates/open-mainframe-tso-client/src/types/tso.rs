//! z/OSMF TSO REST API wire types.
//!
//! Covers the `/zosmf/tsoApp/tso` session endpoints and the
//! `/zosmf/tsoApp/v1/tso` stateless endpoint.

use serde::{Deserialize, Serialize};

/// Protocol version sent with every command envelope.
pub const TSO_VERSION: &str = "0100";

/// Reply envelope returned by start, send, receive, ping and stop.
///
/// `tsoData` entries stay as raw JSON here; [`crate::classify`] turns them
/// into typed conversation events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TsoResponse {
    /// Session identifier, when the reply carries one.
    #[serde(rename = "servletKey", default, skip_serializing_if = "Option::is_none")]
    pub servlet_key: Option<String>,
    /// Message queue ID assigned at start.
    #[serde(rename = "queueID", default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    /// Protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<String>,
    /// Whether z/OSMF reused an existing address space.
    #[serde(default)]
    pub reused: bool,
    /// Whether the session timed out on the z/OSMF side.
    #[serde(default)]
    pub timeout: bool,
    /// Conversation entries, each keyed by `TSO MESSAGE` or `TSO PROMPT`.
    #[serde(rename = "tsoData", default)]
    pub tso_data: Vec<serde_json::Value>,
}

/// Body of the "submit command" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsoCommandRequest {
    /// Versioned response object wrapping the command text.
    #[serde(rename = "TSO RESPONSE")]
    pub response: TsoCommandPayload,
}

/// Payload of [`TsoCommandRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsoCommandPayload {
    /// Protocol version, always [`TSO_VERSION`].
    #[serde(rename = "VERSION")]
    pub version: String,
    /// Literal command text.
    #[serde(rename = "DATA")]
    pub data: String,
}

impl TsoCommandRequest {
    /// Wrap command text in the versioned envelope.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            response: TsoCommandPayload {
                version: TSO_VERSION.to_string(),
                data: command.into(),
            },
        }
    }
}

/// Body of the V1 stateless command call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatelessRequest {
    /// Command text.
    #[serde(rename = "tsoCmd")]
    pub tso_cmd: String,
    /// Always `stateless` for this client.
    #[serde(rename = "cmdState")]
    pub cmd_state: String,
}

impl StatelessRequest {
    /// Build a stateless request for a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            tso_cmd: command.into(),
            cmd_state: "stateless".to_string(),
        }
    }
}

/// Reply to the V1 stateless command call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatelessResponse {
    /// Always null for stateless calls.
    #[serde(rename = "servletKey", default)]
    pub servlet_key: Option<String>,
    /// Protocol version.
    #[serde(default)]
    pub ver: Option<String>,
    /// Output lines.
    #[serde(rename = "cmdResponse", default)]
    pub cmd_response: Vec<CmdResponseLine>,
    /// Whether z/OSMF reused an existing address space.
    #[serde(default)]
    pub reused: bool,
    /// Whether the command timed out.
    #[serde(default)]
    pub timeout: bool,
    /// `Y` once the READY prompt was seen.
    #[serde(rename = "tsoPromptReceived", default)]
    pub tso_prompt_received: Option<String>,
    /// `Y` when a requested keyword was detected.
    #[serde(rename = "keywordDetected", default)]
    pub keyword_detected: Option<String>,
}

/// One line of [`StatelessResponse::cmd_response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmdResponseLine {
    /// Output text.
    pub message: String,
}

impl StatelessResponse {
    /// Whether the prompt flag is set.
    pub fn prompt_received(&self) -> bool {
        self.tso_prompt_received.as_deref() == Some("Y")
    }
}
