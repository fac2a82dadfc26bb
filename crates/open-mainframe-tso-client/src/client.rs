//! z/OSMF TSO client: start, send, receive, ping and stop calls.
//!
//! Implements the client side of the z/OSMF TSO REST services:
//! - `POST   /zosmf/tsoApp/tso?acct=…`: start a TSO address space
//! - `PUT    /zosmf/tsoApp/tso/:servletKey?readReply=false`: send a command
//! - `PUT    /zosmf/tsoApp/tso/:servletKey`: receive more output
//! - `PUT    /zosmf/tsoApp/tso/ping/:servletKey`: check the session is alive
//! - `DELETE /zosmf/tsoApp/tso/:servletKey`: stop the address space
//! - `PUT    /zosmf/tsoApp/v1/tso`: stateless command (z/OS V2R4+)

use std::sync::Arc;

use crate::collector::{CollectOptions, Transcript};
use crate::config::ClientConfig;
use crate::error::{require, Result, TsoClientError};
use crate::session::{StartParams, TsoSession};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::types::error::ZosmfErrorBody;
use crate::types::tso::{StatelessRequest, StatelessResponse, TsoCommandRequest, TsoResponse};

/// Session resource, relative to the z/OSMF base path.
pub const TSO_RESOURCE: &str = "/tsoApp/tso";
/// Ping resource.
pub const TSO_PING_RESOURCE: &str = "/tsoApp/tso/ping";
/// Stateless command resource.
pub const TSO_STATELESS_RESOURCE: &str = "/tsoApp/v1/tso";
/// Header z/OSMF requires on PUT, POST and DELETE.
pub const CSRF_HEADER: &str = "X-CSRF-ZOSMF-HEADER";
/// Literal z/OSMF sends in place of an absent servlet key.
pub const NULL_SERVLET_KEY: &str = "null";

/// Client for the z/OSMF TSO REST services.
#[derive(Clone)]
pub struct TsoClient {
    transport: Arc<dyn Transport>,
    auth: Option<(String, String)>,
    options: CollectOptions,
}

impl std::fmt::Debug for TsoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsoClient")
            .field("authenticated", &self.auth.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Whether a servlet key from a reply names a real session.
pub fn is_valid_servlet_key(key: Option<&str>) -> bool {
    match key.map(str::trim) {
        Some(k) => !k.is_empty() && k != NULL_SERVLET_KEY,
        None => false,
    }
}

impl TsoClient {
    /// Client over a transport, without credentials and with unbounded collection.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            auth: None,
            options: CollectOptions::default(),
        }
    }

    /// Client for a configuration, talking HTTP through `reqwest`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.connection)?;
        let mut client = Self::new(Arc::new(transport)).with_collect_options(config.collect_options());
        if let Some((name, value)) = config.connection.auth_header() {
            client = client.with_auth_header(name, value);
        }
        Ok(client)
    }

    /// Send this header on every request.
    pub fn with_auth_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth = Some((name.into(), value.into()));
        self
    }

    /// Replace the reply collection limits.
    pub fn with_collect_options(mut self, options: CollectOptions) -> Self {
        self.options = options;
        self
    }

    /// Reply collection limits.
    pub fn collect_options(&self) -> &CollectOptions {
        &self.options
    }

    // ----- plumbing -----

    fn request(&self, method: HttpMethod, path: impl Into<String>) -> HttpRequest {
        let mut request = HttpRequest::new(method, path)
            .header("Accept", "application/json")
            .header(CSRF_HEADER, "true")
            .header("Content-Type", "application/json");
        if let Some((name, value)) = &self.auth {
            request = request.header(name.clone(), value.clone());
        }
        request
    }

    async fn call(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let path = request.path.clone();
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            tracing::debug!(%method, %path, status = response.status, "z/OSMF request failed");
            return Err(TsoClientError::Http {
                status: response.status,
                zosmf: ZosmfErrorBody::parse(&response.body),
                body: response.body,
            });
        }
        Ok(response)
    }

    fn parse_reply(body: &str) -> Result<TsoResponse> {
        serde_json::from_str(body)
            .map_err(|e| TsoClientError::protocol(format!("invalid TSO reply JSON: {}", e), body))
    }

    fn session_path(session: &TsoSession) -> Result<String> {
        require("servlet key", session.servlet_key())?;
        Ok(format!("{}/{}", TSO_RESOURCE, session.servlet_key().trim()))
    }

    // ----- session lifecycle -----

    /// Start a TSO address space.
    ///
    /// The account is checked before anything is sent. A reply without a
    /// usable `servletKey` (absent, blank or the literal `"null"`) is a
    /// protocol error.
    pub async fn start(&self, params: &StartParams) -> Result<TsoSession> {
        let resolved = params.resolve()?;
        let mut request = self.request(HttpMethod::Post, TSO_RESOURCE);
        for (name, value) in resolved.query() {
            request = request.query(name, value);
        }

        let response = self.call(request).await?;
        let reply = Self::parse_reply(&response.body)?;
        let servlet_key = match reply.servlet_key.as_deref() {
            key if is_valid_servlet_key(key) => key.unwrap_or_default().trim().to_string(),
            _ => {
                return Err(TsoClientError::protocol(
                    "start reply has no servletKey",
                    response.body,
                ))
            }
        };

        tracing::info!(
            servlet_key = %servlet_key,
            account = %resolved.account,
            proc = %resolved.logon_procedure,
            reused = reply.reused,
            "TSO session started"
        );
        Ok(TsoSession::from_start(servlet_key, &reply))
    }

    /// Submit a command; returns the first reply, which may already hold output.
    pub async fn send(&self, session: &TsoSession, command: &str) -> Result<TsoResponse> {
        require("command", command)?;
        let path = Self::session_path(session)?;
        let body = serde_json::to_string(&TsoCommandRequest::new(command))
            .map_err(|e| TsoClientError::protocol(e.to_string(), String::new()))?;
        let request = self
            .request(HttpMethod::Put, path)
            .query("readReply", "false")
            .body(body);

        tracing::debug!(servlet_key = %session.servlet_key(), command, "sending TSO command");
        let response = self.call(request).await?;
        Self::parse_reply(&response.body)
    }

    /// Fetch more output from a session.
    pub async fn receive(&self, session: &TsoSession) -> Result<TsoResponse> {
        let path = Self::session_path(session)?;
        let response = self.call(self.request(HttpMethod::Put, path)).await?;
        Self::parse_reply(&response.body)
    }

    /// Check a session is still alive.
    pub async fn ping(&self, session: &TsoSession) -> Result<TsoResponse> {
        require("servlet key", session.servlet_key())?;
        let path = format!("{}/{}", TSO_PING_RESOURCE, session.servlet_key().trim());
        let response = self.call(self.request(HttpMethod::Put, path)).await?;
        Self::parse_reply(&response.body)
    }

    /// Stop a session and return the final reply.
    ///
    /// An empty reply body is accepted as an envelope with no flags set.
    pub async fn stop(&self, mut session: TsoSession) -> Result<TsoResponse> {
        session.mark_released();
        let path = Self::session_path(&session)?;
        let response = self.call(self.request(HttpMethod::Delete, path)).await?;
        let reply = if response.body.trim().is_empty() {
            TsoResponse::default()
        } else {
            Self::parse_reply(&response.body)?
        };

        tracing::info!(
            servlet_key = %session.servlet_key(),
            reused = reply.reused,
            timeout = reply.timeout,
            "TSO session stopped"
        );
        Ok(reply)
    }

    // ----- stateless -----

    /// Run a command without a session, through the V1 stateless service.
    pub async fn issue_stateless(&self, command: &str) -> Result<Transcript> {
        require("command", command)?;
        let body = serde_json::to_string(&StatelessRequest::new(command))
            .map_err(|e| TsoClientError::protocol(e.to_string(), String::new()))?;
        let request = self.request(HttpMethod::Put, TSO_STATELESS_RESOURCE).body(body);

        let response = self.call(request).await?;
        let reply: StatelessResponse = serde_json::from_str(&response.body).map_err(|e| {
            TsoClientError::protocol(format!("invalid stateless reply JSON: {}", e), &response.body)
        })?;

        if !reply.prompt_received() {
            tracing::warn!(command, "stateless TSO reply arrived without a prompt");
        }
        Ok(Transcript::new(
            reply.cmd_response.into_iter().map(|line| line.message).collect(),
        ))
    }
}
