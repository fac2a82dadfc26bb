//! Reply collection: polls a TSO session until the prompt marks the end of output.
//!
//! The collector is a two-state machine:
//!
//! ```text
//!   AwaitingData ──(prompt seen)──▶ Terminal
//!        ▲   │
//!        └───┘ (messages appended, poll again)
//! ```
//!
//! The first pass classifies the reply returned by the send call; every later
//! pass issues a fresh receive. Message text accumulates into the transcript
//! in encounter order. Any error from the transport or the reply parser ends
//! collection at once and no partial transcript is returned.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::classify::{classify, ConversationEvent};
use crate::client::TsoClient;
use crate::error::{Result, TsoClientError};
use crate::session::TsoSession;
use crate::types::tso::TsoResponse;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What a prompt means when no output has been collected yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyPromptPolicy {
    /// Treat it as a leftover prompt and keep polling.
    #[default]
    KeepPolling,
    /// Treat it as the end of the command's output.
    Terminate,
}

/// Limits on reply collection. The defaults poll until the prompt arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectOptions {
    /// Give up after this many classification passes.
    pub max_polls: Option<u32>,
    /// Give up once this much time has passed.
    pub deadline: Option<Duration>,
    /// Handling of a prompt that precedes all output.
    pub empty_prompt: EmptyPromptPolicy,
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Ordered output lines of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    /// Wrap collected lines.
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Output lines, in encounter order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Take the lines.
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the command produced no output.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl std::fmt::Display for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

impl IntoIterator for Transcript {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Collector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// No terminal prompt yet.
    AwaitingData,
    /// Prompt seen; output complete.
    Terminal,
}

/// Accumulates one command's output across reply passes.
#[derive(Debug)]
pub struct ReplyCollector {
    options: CollectOptions,
    state: CollectorState,
    lines: Vec<String>,
    passes: u32,
}

impl ReplyCollector {
    /// Fresh collector in [`CollectorState::AwaitingData`].
    pub fn new(options: CollectOptions) -> Self {
        Self {
            options,
            state: CollectorState::AwaitingData,
            lines: Vec::new(),
            passes: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// Classification passes made so far.
    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Lines collected so far.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Run one classification pass over a reply.
    pub fn absorb(&mut self, reply: &TsoResponse) -> CollectorState {
        self.passes += 1;
        let mut messages = 0usize;
        let mut prompts = 0usize;

        for event in classify(reply) {
            match event {
                ConversationEvent::Message { text, .. } => {
                    messages += 1;
                    self.lines.push(text);
                }
                ConversationEvent::Prompt { .. } => {
                    prompts += 1;
                    if !self.lines.is_empty()
                        || self.options.empty_prompt == EmptyPromptPolicy::Terminate
                    {
                        self.state = CollectorState::Terminal;
                    } else {
                        tracing::debug!(pass = self.passes, "prompt before any output; polling on");
                    }
                }
                ConversationEvent::Unrecognized(entry) => {
                    tracing::debug!(pass = self.passes, %entry, "skipping unrecognized tsoData entry");
                }
            }
        }

        tracing::debug!(
            pass = self.passes,
            messages,
            prompts,
            state = ?self.state,
            "TSO reply classified"
        );
        self.state
    }

    /// Hand over the transcript.
    pub fn finish(self) -> Transcript {
        Transcript::new(self.lines)
    }

    /// Poll `session` until the prompt, starting from the send reply.
    pub async fn run(
        mut self,
        client: &TsoClient,
        session: &TsoSession,
        first: TsoResponse,
    ) -> Result<Transcript> {
        let started = Instant::now();
        let mut reply = first;

        loop {
            if self.absorb(&reply) == CollectorState::Terminal {
                tracing::debug!(
                    servlet_key = %session.servlet_key(),
                    passes = self.passes,
                    lines = self.lines.len(),
                    "TSO output complete"
                );
                return Ok(self.finish());
            }

            if let Some(max) = self.options.max_polls {
                if self.passes >= max {
                    return Err(TsoClientError::ReplyLimit { polls: self.passes });
                }
            }

            reply = match self.options.deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_sub(started.elapsed());
                    if remaining.is_zero() {
                        return Err(TsoClientError::ReplyDeadline {
                            elapsed: started.elapsed(),
                        });
                    }
                    tokio::time::timeout(remaining, client.receive(session))
                        .await
                        .map_err(|_| TsoClientError::ReplyDeadline {
                            elapsed: started.elapsed(),
                        })??
                }
                None => client.receive(session).await?,
            };
        }
    }
}
