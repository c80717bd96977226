use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing_subscriber::{fmt::time::Uptime, EnvFilter};

use sketchparty::server::bootstrap::{build_realtime_url, run_server, ServerConfig};

const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Parser)]
#[command(name = "sketchparty_server")]
#[command(about = "Run the drawing party game server", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Postgres connection string. Omit to run fully in memory.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Base Supabase HTTPS endpoint (e.g. https://xyz.supabase.co)
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabase anon key for realtime websocket auth
    #[arg(long, env = "SUPABASE_ANON_KEY")]
    supabase_anon_key: Option<String>,

    /// Toggle structured (JSON) tracing output
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let manifest_env = env!("CARGO_MANIFEST_DIR");
    let manifest_env_path = PathBuf::from(manifest_env).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json)?;

    let realtime_url = match (&args.supabase_url, &args.supabase_anon_key) {
        (Some(url), Some(key)) => Some(build_realtime_url(url, key)?),
        _ => None,
    };

    let config = ServerConfig {
        bind: args.bind,
        database_url: args.database_url,
        realtime_url,
        realtime_api_key: args.supabase_anon_key,
    };

    run_server(config).await
}

fn init_tracing(json: bool) -> Result<()> {
    if json {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("sketchparty=info,server=info,relay=info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_timer(Uptime::default())
            .with_ansi(false)
            .json()
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing subscriber: {err}"))?;
    } else {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("sketchparty=info,server=info,relay=info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_timer(Uptime::default())
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing subscriber: {err}"))?;
    }
    Ok(())
}
