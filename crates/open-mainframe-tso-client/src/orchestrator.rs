//! Command orchestration: start, send, collect, stop.
//!
//! Once a session has started, it is always stopped exactly once: after a
//! successful collection, after a send or collect failure, and after
//! cancellation. A failed stop never replaces the error that caused it.

use tokio_util::sync::CancellationToken;

use crate::client::TsoClient;
use crate::collector::{ReplyCollector, Transcript};
use crate::error::{require, Result, TsoClientError, TsoStage};
use crate::session::{StartParams, TsoSession};
use crate::types::tso::TsoResponse;

/// Result of a full command conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// Collected output.
    pub transcript: Transcript,
    /// Reply to the stop call, or `None` if stopping failed.
    pub stop: Option<TsoResponse>,
}

impl TsoClient {
    /// Run one command in a fresh session and return its output.
    pub async fn issue_command(&self, params: &StartParams, command: &str) -> Result<Transcript> {
        self.run_conversation(params, command, None)
            .await
            .map(|outcome| outcome.transcript)
    }

    /// Like [`TsoClient::issue_command`], abandoning the conversation when
    /// `cancel` fires. The session is still stopped.
    pub async fn issue_command_with_cancel(
        &self,
        params: &StartParams,
        command: &str,
        cancel: CancellationToken,
    ) -> Result<Transcript> {
        self.run_conversation(params, command, Some(&cancel))
            .await
            .map(|outcome| outcome.transcript)
    }

    /// Like [`TsoClient::issue_command`], also returning the stop reply.
    pub async fn issue_command_detailed(
        &self,
        params: &StartParams,
        command: &str,
    ) -> Result<CommandOutcome> {
        self.run_conversation(params, command, None).await
    }

    async fn run_conversation(
        &self,
        params: &StartParams,
        command: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<CommandOutcome> {
        require("command", command).map_err(|e| e.at(TsoStage::Send))?;

        if cancel.is_some_and(|token| token.is_cancelled()) {
            return Err(TsoClientError::Cancelled);
        }

        // Start is never raced against the token: once the POST is out,
        // z/OSMF may own an address space and only its reply names it.
        let session = self
            .start(params)
            .await
            .map_err(|e| e.at(TsoStage::Start))?;
        if cancel.is_some_and(|token| token.is_cancelled()) {
            let servlet_key = session.servlet_key().to_string();
            tracing::info!(servlet_key = %servlet_key, "TSO command cancelled during start");
            if let Err(stop_err) = self.stop(session).await {
                tracing::warn!(
                    servlet_key = %servlet_key,
                    error = %stop_err,
                    "best-effort TSO stop failed"
                );
            }
            return Err(TsoClientError::Cancelled);
        }

        let conversation = self.converse(&session, command);
        let result = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::info!(servlet_key = %session.servlet_key(), "TSO command cancelled");
                    Err(TsoClientError::Cancelled)
                }
                collected = conversation => collected,
            },
            None => conversation.await,
        };

        match result {
            Ok(transcript) => {
                let stop = match self.stop(session).await {
                    Ok(reply) => Some(reply),
                    Err(err) => {
                        tracing::warn!(error = %err, "TSO stop failed after successful command");
                        None
                    }
                };
                Ok(CommandOutcome { transcript, stop })
            }
            Err(err) => {
                let servlet_key = session.servlet_key().to_string();
                if let Err(stop_err) = self.stop(session).await {
                    tracing::warn!(
                        servlet_key = %servlet_key,
                        error = %stop_err,
                        "best-effort TSO stop failed"
                    );
                }
                Err(err)
            }
        }
    }

    async fn converse(&self, session: &TsoSession, command: &str) -> Result<Transcript> {
        let first = self
            .send(session, command)
            .await
            .map_err(|e| e.at(TsoStage::Send))?;
        ReplyCollector::new(self.collect_options().clone())
            .run(self, session, first)
            .await
            .map_err(|e| e.at(TsoStage::Collect))
    }
}
