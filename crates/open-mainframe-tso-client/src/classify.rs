//! Message classification: turns `tsoData` entries into conversation events.
//!
//! Each entry of a reply's `tsoData` array is an object keyed by one of:
//!
//! ```json
//! {"TSO MESSAGE": {"VERSION": "0100", "DATA": "READY"}}
//! {"TSO PROMPT":  {"VERSION": "0100", "HIDDEN": "FALSE"}}
//! ```
//!
//! Anything else is kept as [`ConversationEvent::Unrecognized`] so callers can
//! skip it without failing the parse.

use serde::Deserialize;
use serde_json::Value;

use crate::types::tso::TsoResponse;

/// Key of an output line entry.
pub const TSO_MESSAGE: &str = "TSO MESSAGE";
/// Key of a prompt entry.
pub const TSO_PROMPT: &str = "TSO PROMPT";

/// One classified entry of a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// A line of command output.
    Message {
        /// Version tag.
        version: String,
        /// Output text.
        text: String,
    },
    /// The session is ready for input; the current command's output is complete.
    Prompt {
        /// Version tag.
        version: String,
        /// Hidden-input marker.
        hidden: String,
    },
    /// An entry matching neither shape.
    Unrecognized(Value),
}

impl ConversationEvent {
    /// Output text, for message events.
    pub fn text(&self) -> Option<&str> {
        match self {
            ConversationEvent::Message { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Whether this is a prompt event.
    pub fn is_prompt(&self) -> bool {
        matches!(self, ConversationEvent::Prompt { .. })
    }
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(rename = "VERSION", default)]
    version: String,
    #[serde(rename = "DATA")]
    data: String,
}

#[derive(Deserialize)]
struct PromptBody {
    #[serde(rename = "VERSION", default)]
    version: String,
    #[serde(rename = "HIDDEN", default)]
    hidden: String,
}

/// Classify a single `tsoData` entry.
pub fn classify_entry(entry: &Value) -> ConversationEvent {
    let Some(object) = entry.as_object() else {
        return ConversationEvent::Unrecognized(entry.clone());
    };

    if let Some(body) = object.get(TSO_MESSAGE) {
        if let Ok(message) = MessageBody::deserialize(body) {
            return ConversationEvent::Message {
                version: message.version,
                text: message.data,
            };
        }
    }

    if let Some(body) = object.get(TSO_PROMPT) {
        if let Ok(prompt) = PromptBody::deserialize(body) {
            return ConversationEvent::Prompt {
                version: prompt.version,
                hidden: prompt.hidden,
            };
        }
    }

    ConversationEvent::Unrecognized(entry.clone())
}

/// Classify every entry of a reply, in encounter order.
///
/// Pure function of the reply: classifying the same reply twice yields the
/// same sequence.
pub fn classify(reply: &TsoResponse) -> Vec<ConversationEvent> {
    reply.tso_data.iter().map(classify_entry).collect()
}
