use std::time::Duration;

use api::{router, AppState, ServerConfig};
use clap::{Parser, Subcommand};
use database::{session, Database};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "api")]
#[command(about = "Nudge chat proxy and conversation API")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Issue a session token for a user and print it
    IssueSession {
        /// User id the session belongs to
        #[arg(long)]
        user: String,

        /// Expire the session after this many hours
        #[arg(long)]
        ttl_hours: Option<u64>,
    },

    /// Revoke a session token
    RevokeSession {
        /// Token to revoke
        #[arg(long)]
        token: String,
    },

    /// Delete expired sessions
    PruneSessions,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("api=info,database=info")),
        )
        .init();

    let args = Args::parse();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::IssueSession { user, ttl_hours } => issue_session(&user, ttl_hours).await,
        Command::RevokeSession { token } => revoke_session(&token).await,
        Command::PruneSessions => prune_sessions().await,
    }
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let pruned = session::prune_expired(db.pool()).await?;
    if pruned > 0 {
        info!("Pruned {} expired session(s)", pruned);
    }

    let addr = config.addr;
    info!(
        "Upstream: {} (default model: {})",
        config.upstream_url, config.default_model
    );
    let app = router(AppState::new(config, db)?);

    info!(%addr, "Nudge API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn session_ttl(hours: Option<u64>) -> Option<Duration> {
    hours.map(|h| Duration::from_secs(h.saturating_mul(3600)))
}

async fn open_database() -> Result<Database, Box<dyn std::error::Error>> {
    let db = Database::connect(&api::config::database_url()).await?;
    db.migrate().await?;
    Ok(db)
}

async fn issue_session(user: &str, ttl_hours: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_database().await?;

    let session = session::create_session(db.pool(), user, session_ttl(ttl_hours)).await?;
    println!("{}", session.token);

    db.close().await;
    Ok(())
}

async fn revoke_session(token: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_database().await?;
    let result = session::delete_session(db.pool(), token).await;
    db.close().await;

    result?;
    println!("Session revoked");
    Ok(())
}

async fn prune_sessions() -> Result<(), Box<dyn std::error::Error>> {
    let db = open_database().await?;
    let pruned = session::prune_expired(db.pool()).await;
    db.close().await;

    println!("Pruned {} expired session(s)", pruned?);
    Ok(())
}
