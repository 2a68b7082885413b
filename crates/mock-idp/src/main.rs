//! mock-idp — serves `/oauth2/validate` and `/oauth2/token` on localhost so
//! the bot can run without the real provider.
//!
//! Point the bot at it with `CHATBRIDGE_ID_URL=http://localhost:4000`.

use std::sync::Arc;

use clap::Parser;
use mock_idp::{IdpConfig, IdpState};
use tracing::info;

/// Mock identity provider.
#[derive(Parser, Debug)]
#[command(name = "mock-idp", about = "Mock token introspection and refresh endpoints")]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 4000)]
    port: u16,

    /// Accepted client id.
    #[arg(long, default_value = "dev-client")]
    client_id: String,

    /// Accepted client secret.
    #[arg(long, default_value = "dev-secret")]
    client_secret: String,

    /// Seed access token (live at startup).
    #[arg(long, default_value = "dev-access")]
    access_token: String,

    /// Seed refresh token (live at startup).
    #[arg(long, default_value = "dev-refresh")]
    refresh_token: String,

    /// Login reported by introspection.
    #[arg(long, default_value = "mybot")]
    login: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = IdpConfig {
        client_id: args.client_id,
        client_secret: args.client_secret,
        login: args.login,
        ..IdpConfig::default()
    };
    let state = Arc::new(IdpState::new(config, &args.access_token, &args.refresh_token));
    let app = mock_idp::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "mock identity provider listening");

    axum::serve(listener, app).await?;
    Ok(())
}
