//! OAuth 2.0 Authorization Server - Entry Point

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use rest_oauth2::{Config, MemoryStore, OAuthServer, StaticDirectory, pkce};

#[derive(Parser, Debug)]
#[command(name = "rest-oauth2")]
#[command(about = "OAuth 2.0 authorization server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a PKCE code verifier and its S256 challenge
    GenerateCodeChallenge {
        /// Use this value as the verifier instead of a random one
        seed: Option<String>,

        /// Length of a random verifier (43-128)
        #[arg(long, default_value_t = pkce::DEFAULT_VERIFIER_LENGTH)]
        length: usize,
    },
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// HTTP server port
    #[arg(long, default_value = "8080", env = "PORT")]
    port: u16,

    /// Public base URL (e.g., https://auth.example.com)
    #[arg(long, env = "OAUTH2_BASE_URL")]
    base_url: Option<String>,

    /// Known users as `id[:admin]`, comma separated
    #[arg(long, env = "OAUTH2_USERS", default_value = "")]
    users: String,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Some(Command::GenerateCodeChallenge { seed, length }) = cli.command {
        let (verifier, challenge) = pkce::generate_pair(seed.as_deref(), length)?;
        println!("code_verifier:  {verifier}");
        println!("code_challenge: {challenge}");
        println!("method:         S256");
        return Ok(());
    }

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting OAuth 2.0 server");

    let mut config = Config::from_env()?;
    if let Some(base_url) = cli.serve.base_url {
        config = config.with_base_url(base_url);
    }

    let users = StaticDirectory::parse(&cli.serve.users);
    if users.is_empty() {
        tracing::warn!("No users configured; set OAUTH2_USERS to allow logins");
    }

    let server = OAuthServer::new(config, Arc::new(MemoryStore::new()), Arc::new(users))?;
    server.run_http(cli.serve.port).await
}
