//! TSO client error types.
//!
//! Three families of failure reach the caller:
//! - **Validation**: a required input was blank; detected locally, nothing sent.
//! - **Protocol**: the z/OSMF reply was unparsable or lacked a required field.
//! - **Transport**: the request never completed, or z/OSMF answered non-2xx.
//!
//! Configuration loading failures are reported separately as
//! [`TsoClientError::Config`], before any client exists.
//!
//! The command orchestrator wraps failures in [`TsoClientError::Stage`] so the
//! caller can tell which step of the conversation went wrong.

use std::time::Duration;

use thiserror::Error;

use crate::types::error::ZosmfErrorBody;

/// Step of a TSO conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsoStage {
    /// Opening the TSO address space.
    Start,
    /// Submitting the command text.
    Send,
    /// Polling for output until the prompt.
    Collect,
    /// Ending the TSO address space.
    Stop,
}

impl std::fmt::Display for TsoStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TsoStage::Start => write!(f, "start"),
            TsoStage::Send => write!(f, "send"),
            TsoStage::Collect => write!(f, "collect"),
            TsoStage::Stop => write!(f, "stop"),
        }
    }
}

/// Errors raised by the TSO client.
#[derive(Debug, Error, miette::Diagnostic)]
#[non_exhaustive]
pub enum TsoClientError {
    /// A required input was missing or blank.
    #[error("invalid {field}: {message}")]
    #[diagnostic(code(tso::validation))]
    Validation {
        /// Name of the offending input.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The configuration file or environment could not be loaded.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(tso::config))]
    Config {
        /// What went wrong, including the source location.
        message: String,
    },

    /// The z/OSMF reply was malformed or missing a required field.
    #[error("malformed TSO reply: {message}")]
    #[diagnostic(code(tso::protocol), help("response body: {body}"))]
    Protocol {
        /// Description of the problem.
        message: String,
        /// Raw response body, for diagnosis.
        body: String,
    },

    /// The request did not complete (connect, TLS, read failure).
    #[error("transport error: {0}")]
    #[diagnostic(code(tso::transport))]
    Transport(String),

    /// z/OSMF answered with a non-2xx status.
    #[error("z/OSMF returned HTTP {status}{}", zosmf_suffix(.zosmf))]
    #[diagnostic(code(tso::http))]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
        /// Parsed z/OSMF error body, when the reply had that shape.
        zosmf: Option<ZosmfErrorBody>,
    },

    /// The conversation was cancelled by the caller.
    #[error("TSO conversation cancelled")]
    #[diagnostic(code(tso::cancelled))]
    Cancelled,

    /// No prompt arrived within the configured number of reply polls.
    #[error("no TSO prompt after {polls} reply polls")]
    #[diagnostic(code(tso::reply_limit), help("raise collect.max_polls or unset it"))]
    ReplyLimit {
        /// Number of classification passes made.
        polls: u32,
    },

    /// No prompt arrived before the configured collection deadline.
    #[error("no TSO prompt within {elapsed:?}")]
    #[diagnostic(code(tso::reply_deadline), help("raise collect.deadline_ms or unset it"))]
    ReplyDeadline {
        /// Time spent collecting.
        elapsed: Duration,
    },

    /// A conversation stage failed.
    #[error("TSO {stage} failed: {source}")]
    #[diagnostic(code(tso::stage))]
    Stage {
        /// The stage that failed.
        stage: TsoStage,
        /// Underlying failure.
        #[source]
        source: Box<TsoClientError>,
    },
}

fn zosmf_suffix(zosmf: &Option<ZosmfErrorBody>) -> String {
    match zosmf {
        Some(body) => format!(
            ": rc={}, reason={}, {}",
            body.rc, body.reason, body.message
        ),
        None => String::new(),
    }
}

impl TsoClientError {
    /// Create a validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a protocol error carrying the offending body.
    pub fn protocol(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            body: body.into(),
        }
    }

    /// Tag this error with the stage it happened in.
    pub fn at(self, stage: TsoStage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Stage the error was raised in, if the orchestrator tagged it.
    pub fn stage(&self) -> Option<TsoStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error with stage wrappers removed.
    pub fn root(&self) -> &TsoClientError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for locally detected input errors.
    pub fn is_validation(&self) -> bool {
        matches!(self.root(), Self::Validation { .. })
    }

    /// True for configuration file and environment errors.
    pub fn is_config(&self) -> bool {
        matches!(self.root(), Self::Config { .. })
    }

    /// True for malformed or incomplete replies.
    pub fn is_protocol(&self) -> bool {
        matches!(self.root(), Self::Protocol { .. })
    }

    /// True for network failures and non-2xx statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self.root(), Self::Transport(_) | Self::Http { .. })
    }
}

impl From<reqwest::Error> for TsoClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TsoClientError>;

/// Reject a blank required input.
pub(crate) fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TsoClientError::validation(field, "must not be blank"));
    }
    Ok(())
}
