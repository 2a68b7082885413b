//! chatbridge bot — keeps the chat provider token valid, then relays chat
//! events to command handlers until the session fails.
//!
//! Startup is strictly sequential: credential lifecycle, then chat session.
//! Any fatal error is logged and the process exits with status 1; an
//! external supervisor (systemd, a container runtime) is expected to
//! restart it.
//!
//! The messaging-platform relay is external: the document's `token` key is
//! kept intact on save but never read here.

mod router;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chatbridge_auth::{CredentialLifecycle, CredentialStore, ProviderConfig, TokenOrigin};
use chatbridge_models::ChatIdentity;
use chatbridge_sdk::{ConnectionSupervisor, IrcTransport, IrcTransportConfig, SupervisorConfig};
use clap::Parser;
use tracing::{error, info, warn};

use crate::router::CommandRouter;

const DEFAULT_CONFIG: &str = "config.json";

/// Chat bridge bot.
#[derive(Parser, Debug)]
#[command(name = "chatbridge-bot", about = "Chat bridge bot")]
struct Args {
    /// Credential document.  When the default `config.json` does not exist
    /// in the working directory, `<config dir>/chatbridge/config.json` is used.
    #[arg(long, env = "CHATBRIDGE_CONFIG", default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Prefix that marks a chat message as a command.
    #[arg(long, default_value = "!")]
    command_prefix: String,
}

/// Pick the credential document to use.
fn resolve_config_path(requested: &Path) -> PathBuf {
    if requested.exists() || requested != Path::new(DEFAULT_CONFIG) {
        return requested.to_path_buf();
    }
    dirs::config_dir()
        .map(|dir| dir.join("chatbridge").join(DEFAULT_CONFIG))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| requested.to_path_buf())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let path = resolve_config_path(&args.config);
    info!(path = %path.display(), "using credential document");

    // 1. Credential lifecycle
    let provider = ProviderConfig::from_env();
    let lifecycle = CredentialLifecycle::from_config(CredentialStore::new(&path), &provider)
        .context("failed to build HTTP client")?;
    let ensured = lifecycle
        .ensure_valid_token()
        .await
        .context("no usable access token")?;

    if let TokenOrigin::Refreshed {
        persist_error: Some(e),
    } = &ensured.origin
    {
        warn!(
            path = %path.display(),
            error = %e,
            "refreshed token was not saved; the next start will refresh again"
        );
    }

    // 2. Chat session
    let identity = ChatIdentity::new(&ensured.username, ensured.access_token)?;
    let transport = Arc::new(IrcTransport::new(IrcTransportConfig::from_env()));
    let supervisor = ConnectionSupervisor::start(
        transport,
        identity,
        ensured.channels,
        SupervisorConfig::from_env(),
    )
    .await?;

    // 3. Relay until something breaks
    let router = CommandRouter::with_builtins(args.command_prefix);
    let err = supervisor.run(&router).await;
    Err(err).context("chat session ended")
}

#[tokio::main]
async fn main() {
    // Initialise structured logging (controlled via RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
