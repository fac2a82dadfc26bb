//! # z/OSMF TSO Client
//!
//! Client for the z/OSMF TSO REST services, for tooling that needs to run
//! TSO commands on a z/OS system (or on OpenMainframe's z/OSMF server).
//!
//! ## Features
//!
//! - **Session lifecycle**: start, send, receive, ping and stop calls
//! - **Message classification**: `tsoData` entries as typed conversation events
//! - **Reply collection**: polls until the TSO prompt, with optional poll/deadline limits
//! - **Command orchestration**: start → send → collect → stop, always stopping a started session
//! - **Cancellation**: abandon a conversation via `CancellationToken`, session still stopped
//! - **Stateless commands**: the V1 `tsoApp/v1/tso` service
//! - **Pluggable transport**: `reqwest` by default, any [`Transport`] for tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use open_mainframe_tso_client::{ClientConfig, StartParams, TsoClient};
//!
//! # async fn example() -> open_mainframe_tso_client::Result<()> {
//! let config = ClientConfig::from_file("tsocmd.toml")?;
//! let client = TsoClient::from_config(&config)?;
//! let transcript = client
//!     .issue_command(&StartParams::new("ACCT1"), "LISTCAT")
//!     .await?;
//! for line in transcript.lines() {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod classify;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod session;
pub mod transport;
pub mod types;

pub use classify::{classify, ConversationEvent};
pub use client::TsoClient;
pub use collector::{CollectOptions, CollectorState, EmptyPromptPolicy, ReplyCollector, Transcript};
pub use config::{ClientConfig, ConnectionConfig, Credentials};
pub use error::{Result, TsoClientError, TsoStage};
pub use orchestrator::CommandOutcome;
pub use session::{StartParams, TsoSession};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::tso::TsoResponse;
pub use tokio_util::sync::CancellationToken;
