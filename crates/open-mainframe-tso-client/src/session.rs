//! TSO session parameters and the live session handle.

use crate::classify::{classify, ConversationEvent};
use crate::error::{require, Result};
use crate::types::tso::TsoResponse;

// ---------------------------------------------------------------------------
// Start parameters
// ---------------------------------------------------------------------------

/// Default logon procedure.
pub const DEFAULT_LOGON_PROCEDURE: &str = "IZUFPROC";
/// Default character set.
pub const DEFAULT_CHARACTER_SET: &str = "697";
/// Default code page.
pub const DEFAULT_CODE_PAGE: &str = "1047";
/// Default screen rows.
pub const DEFAULT_ROWS: &str = "24";
/// Default screen columns.
pub const DEFAULT_COLUMNS: &str = "80";
/// Default region size.
pub const DEFAULT_REGION_SIZE: &str = "4096";

/// Options for starting a TSO address space.
///
/// Every option except `account` falls back to its z/OSMF default when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartParams {
    /// Accounting information. Required.
    pub account: Option<String>,
    /// Logon procedure (`proc`).
    pub logon_procedure: Option<String>,
    /// Character set (`chset`).
    pub character_set: Option<String>,
    /// Code page (`cpage`).
    pub code_page: Option<String>,
    /// Screen rows (`rows`).
    pub rows: Option<String>,
    /// Screen columns (`cols`).
    pub columns: Option<String>,
    /// Region size (`rsize`).
    pub region_size: Option<String>,
}

/// Start parameters with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStartParams {
    pub account: String,
    pub logon_procedure: String,
    pub character_set: String,
    pub code_page: String,
    pub rows: String,
    pub columns: String,
    pub region_size: String,
}

fn or_default(value: &Option<String>, default: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

impl StartParams {
    /// Parameters for the given account, everything else defaulted.
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            ..Self::default()
        }
    }

    /// Set the logon procedure.
    pub fn logon_procedure(mut self, value: impl Into<String>) -> Self {
        self.logon_procedure = Some(value.into());
        self
    }

    /// Set the character set.
    pub fn character_set(mut self, value: impl Into<String>) -> Self {
        self.character_set = Some(value.into());
        self
    }

    /// Set the code page.
    pub fn code_page(mut self, value: impl Into<String>) -> Self {
        self.code_page = Some(value.into());
        self
    }

    /// Set the screen rows.
    pub fn rows(mut self, value: impl Into<String>) -> Self {
        self.rows = Some(value.into());
        self
    }

    /// Set the screen columns.
    pub fn columns(mut self, value: impl Into<String>) -> Self {
        self.columns = Some(value.into());
        self
    }

    /// Set the region size.
    pub fn region_size(mut self, value: impl Into<String>) -> Self {
        self.region_size = Some(value.into());
        self
    }

    /// Validate and apply defaults.
    ///
    /// Fails with a validation error when the account is missing or blank.
    pub fn resolve(&self) -> Result<ResolvedStartParams> {
        let account = self.account.as_deref().unwrap_or("");
        require("account", account)?;
        Ok(ResolvedStartParams {
            account: account.trim().to_string(),
            logon_procedure: or_default(&self.logon_procedure, DEFAULT_LOGON_PROCEDURE),
            character_set: or_default(&self.character_set, DEFAULT_CHARACTER_SET),
            code_page: or_default(&self.code_page, DEFAULT_CODE_PAGE),
            rows: or_default(&self.rows, DEFAULT_ROWS),
            columns: or_default(&self.columns, DEFAULT_COLUMNS),
            region_size: or_default(&self.region_size, DEFAULT_REGION_SIZE),
        })
    }
}

impl ResolvedStartParams {
    /// Query pairs for the start call, in z/OSMF order.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("acct", self.account.clone()),
            ("proc", self.logon_procedure.clone()),
            ("chset", self.character_set.clone()),
            ("cpage", self.code_page.clone()),
            ("rows", self.rows.clone()),
            ("cols", self.columns.clone()),
            ("rsize", self.region_size.clone()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Session handle
// ---------------------------------------------------------------------------

/// A started TSO address space.
///
/// Consumed by [`crate::TsoClient::stop`], so a stopped session cannot be
/// used again. Dropping a handle that was never stopped logs a warning,
/// since the address space stays up on the host until z/OSMF times it out.
#[derive(Debug)]
pub struct TsoSession {
    servlet_key: String,
    queue_id: Option<String>,
    ver: Option<String>,
    reused: bool,
    timeout: bool,
    logon_messages: Vec<String>,
    released: bool,
}

impl TsoSession {
    pub(crate) fn from_start(servlet_key: String, reply: &TsoResponse) -> Self {
        let logon_messages = classify(reply)
            .into_iter()
            .filter_map(|event| match event {
                ConversationEvent::Message { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        Self {
            servlet_key,
            queue_id: reply.queue_id.clone(),
            ver: reply.ver.clone(),
            reused: reply.reused,
            timeout: reply.timeout,
            logon_messages,
            released: false,
        }
    }

    /// Attach to a session started elsewhere.
    ///
    /// The key is not checked here; calls made with a blank key fail with a
    /// validation error before anything is sent.
    pub fn attach(servlet_key: impl Into<String>) -> Self {
        Self {
            servlet_key: servlet_key.into(),
            queue_id: None,
            ver: None,
            reused: false,
            timeout: false,
            logon_messages: Vec::new(),
            released: false,
        }
    }

    /// The servlet key identifying this session.
    pub fn servlet_key(&self) -> &str {
        &self.servlet_key
    }

    /// Message queue ID assigned at start.
    pub fn queue_id(&self) -> Option<&str> {
        self.queue_id.as_deref()
    }

    /// Protocol version reported at start.
    pub fn ver(&self) -> Option<&str> {
        self.ver.as_deref()
    }

    /// Whether z/OSMF reused an existing address space.
    pub fn reused(&self) -> bool {
        self.reused
    }

    /// Whether the start reply reported a timeout.
    pub fn timed_out(&self) -> bool {
        self.timeout
    }

    /// Logon banner lines returned by the start call.
    pub fn logon_messages(&self) -> &[String] {
        &self.logon_messages
    }

    /// Detach without stopping; the caller takes over the key.
    pub fn detach(mut self) -> String {
        self.released = true;
        std::mem::take(&mut self.servlet_key)
    }

    pub(crate) fn mark_released(&mut self) {
        self.released = true;
    }
}

impl Drop for TsoSession {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                servlet_key = %self.servlet_key,
                "TSO session dropped without stop; address space left running"
            );
        }
    }
}
