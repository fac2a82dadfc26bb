//! Client configuration: z/OSMF connection, TSO logon defaults, and reply collection limits.
//!
//! Loaded from TOML, then overlaid with `ZOSMF_*` / `TSO_*` environment variables:
//!
//! ```toml
//! [connection]
//! host = "mainframe.example.com"
//! port = 443
//! user = "IBMUSER"
//! password = "SYS1"
//!
//! [tso]
//! account = "ACCT#"
//!
//! [collect]
//! max_polls = 200
//! ```

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::collector::{CollectOptions, EmptyPromptPolicy};
use crate::error::{Result, TsoClientError};
use crate::session::StartParams;

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// z/OSMF connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// TSO logon defaults.
    #[serde(default)]
    pub tso: TsoDefaults,
    /// Reply collection limits.
    #[serde(default)]
    pub collect: CollectConfig,
}

/// z/OSMF connection descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Host name.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// `https` or `http`.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Path prefix of the z/OSMF services.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Verify the server certificate.
    #[serde(default = "default_true")]
    pub reject_unauthorized: bool,
    /// Request timeout in seconds; zero means none.
    #[serde(default)]
    pub timeout_secs: u64,
    /// Credentials.
    #[serde(flatten)]
    pub credentials: Credentials,
}

/// How requests authenticate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// User ID for basic auth.
    #[serde(default)]
    pub user: Option<String>,
    /// Password for basic auth.
    #[serde(default)]
    pub password: Option<String>,
    /// JWT sent as the `jwtToken` cookie; wins over user/password.
    #[serde(default)]
    pub token: Option<String>,
}

/// Default TSO logon values; unset fields fall back to the z/OSMF defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TsoDefaults {
    /// Accounting information (required to start a session).
    #[serde(default)]
    pub account: Option<String>,
    /// Logon procedure.
    #[serde(default)]
    pub logon_procedure: Option<String>,
    /// Character set.
    #[serde(default)]
    pub character_set: Option<String>,
    /// Code page.
    #[serde(default)]
    pub code_page: Option<String>,
    /// Screen rows.
    #[serde(default)]
    pub rows: Option<String>,
    /// Screen columns.
    #[serde(default)]
    pub columns: Option<String>,
    /// Region size.
    #[serde(default)]
    pub region_size: Option<String>,
}

/// Reply collection limits. Unset means unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Maximum classification passes before giving up.
    #[serde(default)]
    pub max_polls: Option<u32>,
    /// Maximum collection time in milliseconds.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
    /// What a prompt with no preceding output means.
    #[serde(default)]
    pub empty_prompt: EmptyPromptPolicy,
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TsoClientError::config(format!("cannot read {}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| TsoClientError::config(e.to_string()))
    }

    /// Overlay `ZOSMF_*` and `TSO_ACCOUNT` environment variables.
    ///
    /// A `ZOSMF_PORT` that is not a port number is an error.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = var("ZOSMF_HOST") {
            self.connection.host = host;
        }
        if let Some(port) = var("ZOSMF_PORT") {
            self.connection.port = port.trim().parse().map_err(|_| {
                TsoClientError::config(format!("ZOSMF_PORT is not a port number: {:?}", port))
            })?;
        }
        if let Some(user) = var("ZOSMF_USER") {
            self.connection.credentials.user = Some(user);
        }
        if let Some(password) = var("ZOSMF_PASSWORD") {
            self.connection.credentials.password = Some(password);
        }
        if let Some(account) = var("TSO_ACCOUNT") {
            self.tso.account = Some(account);
        }
        Ok(())
    }

    /// Session start parameters seeded from the `[tso]` section.
    pub fn start_params(&self) -> StartParams {
        StartParams {
            account: self.tso.account.clone(),
            logon_procedure: self.tso.logon_procedure.clone(),
            character_set: self.tso.character_set.clone(),
            code_page: self.tso.code_page.clone(),
            rows: self.tso.rows.clone(),
            columns: self.tso.columns.clone(),
            region_size: self.tso.region_size.clone(),
        }
    }

    /// Reply collection options from the `[collect]` section.
    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            max_polls: self.collect.max_polls,
            deadline: self.collect.deadline_ms.map(Duration::from_millis),
            empty_prompt: self.collect.empty_prompt,
        }
    }
}

impl ConnectionConfig {
    /// `protocol://host:port/base_path`, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}/{}",
            self.protocol,
            self.host,
            self.port,
            self.base_path.trim_matches('/')
        )
        .trim_end_matches('/')
        .to_string()
    }

    /// Authentication header for this connection, if any credentials are set.
    pub fn auth_header(&self) -> Option<(&'static str, String)> {
        let creds = &self.credentials;
        if let Some(token) = &creds.token {
            return Some(("Cookie", format!("jwtToken={}", token)));
        }
        let user = creds.user.as_deref()?;
        let password = creds.password.as_deref().unwrap_or("");
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password));
        Some(("Authorization", format!("Basic {}", encoded)))
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            protocol: default_protocol(),
            base_path: default_base_path(),
            reject_unauthorized: true,
            timeout_secs: 0,
            credentials: Credentials::default(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    443
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_base_path() -> String {
    "/zosmf".to_string()
}

fn default_true() -> bool {
    true
}
