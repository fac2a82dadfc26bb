//! `tsocmd`: run a TSO command through z/OSMF and print its output.
//!
//! ```bash
//! # Session-based, using tsocmd.toml for connection settings
//! tsocmd --config tsocmd.toml LISTCAT LEVEL(IBMUSER)
//!
//! # Stateless V1 service
//! tsocmd --stateless TIME
//! ```

use clap::Parser;
use miette::Result;
use open_mainframe_tso_client::logging::{init_tracing, LogFormat};
use open_mainframe_tso_client::{CancellationToken, ClientConfig, TsoClient};

#[derive(Parser, Debug)]
#[command(name = "tsocmd")]
#[command(author, version, about = "Issue TSO commands through z/OSMF", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Accounting information (overrides the config file)
    #[arg(short, long)]
    account: Option<String>,

    /// Give up after this many reply polls
    #[arg(long)]
    max_polls: Option<u32>,

    /// Use the stateless V1 service instead of a session
    #[arg(long)]
    stateless: bool,

    /// Log format: text, compact or json
    #[arg(long, default_value = "compact")]
    log_format: String,

    /// Command to issue
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("open_mainframe_tso_client=info,warn", LogFormat::parse(&cli.log_format))
        .map_err(|e| miette::miette!("cannot initialise logging: {e}"))?;

    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    config.apply_env()?;
    if let Some(account) = cli.account {
        config.tso.account = Some(account);
    }
    if let Some(max_polls) = cli.max_polls {
        config.collect.max_polls = Some(max_polls);
    }

    let client = TsoClient::from_config(&config)?;
    let command = cli.command.join(" ");

    let transcript = if cli.stateless {
        client.issue_stateless(&command).await?
    } else {
        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_ctrl_c.cancel();
            }
        });
        client
            .issue_command_with_cancel(&config.start_params(), &command, cancel)
            .await?
    };

    for line in transcript.lines() {
        println!("{}", line);
    }
    Ok(())
}
