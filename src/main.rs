use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use portal_kit::config::{load_dotenv, ProcessEnv, ServerConfig, SupabaseConfig};
use portal_kit::environment::public_env;
use portal_kit::logging::init_logging;
use portal_kit::server::{create_router, AppState};
use portal_kit::session::ReqwestAuthApi;

#[derive(Parser)]
#[command(name = "portal-server")]
#[command(about = "Portal web server with session refresh")]
#[command(version = "0.1.0")]
struct Cli {
    /// Optional TOML settings file
    #[arg(long, default_value = "portal.toml")]
    config: PathBuf,

    /// Override the port from the settings file
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_logging();

    let cli = Cli::parse();
    let mut server_config = ServerConfig::load(&cli.config)?;
    if let Some(port) = cli.port {
        server_config.port = port;
    }

    // Missing auth settings are a startup failure, not a per-request one
    let supabase = SupabaseConfig::from_source(&ProcessEnv)?;
    info!("Auth service: {}", supabase.url);

    match public_env(&ProcessEnv) {
        Some(env) => info!("Public environment: {}", env),
        None => warn!("PUBLIC_ENV is unset or not one of qa/production"),
    }

    #[cfg(feature = "db")]
    {
        let db = portal_kit::db::database().await?;
        db.health_check().await?;
        info!("Database connection ready");
    }

    let state = AppState::new(
        Arc::new(ProcessEnv),
        Arc::new(ReqwestAuthApi::new(reqwest::Client::new())),
    );
    let app = create_router(state, &server_config);

    let bind_addr = server_config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Portal server listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
