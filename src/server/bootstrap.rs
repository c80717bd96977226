use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use crate::db::connect_to;
use crate::lobby::service::{RoomService, RoomServiceFactory};
use crate::lobby::storage::{InMemoryRoomStore, RoomStore, SeaOrmRoomStore};
use crate::relay::feed::ChangeFeed;
use crate::relay::realtime::{RealtimeClient, RealtimeClientConfig};
use crate::relay::watcher::{spawn_watcher, RoomEvents};

use super::routes::SketchPartyServer;

const LOG_TARGET: &str = "server::bootstrap";

pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Postgres DSN. When absent the server runs on the in-memory store.
    pub database_url: Option<String>,
    /// Websocket endpoint of the realtime service, required when a
    /// database is configured.
    pub realtime_url: Option<Url>,
    pub realtime_api_key: Option<String>,
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let stop = CancellationToken::new();
    let feed = ChangeFeed::default();

    let store: Arc<dyn RoomStore> = match &config.database_url {
        Some(url) => {
            let conn = connect_to(url).await.context("failed to connect to Postgres")?;
            let realtime_url = config
                .realtime_url
                .clone()
                .context("realtime URL required when a database is configured")?;
            let api_key = config
                .realtime_api_key
                .clone()
                .context("realtime API key required when a database is configured")?;
            let client = RealtimeClient::new(
                RealtimeClientConfig::new(realtime_url, api_key),
                feed.clone(),
                stop.clone(),
            );
            tokio::spawn(client.run());
            Arc::new(SeaOrmRoomStore::new(conn))
        }
        None => {
            info!(target = LOG_TARGET, "no database configured, using in-memory store");
            Arc::new(InMemoryRoomStore::new(feed.clone()))
        }
    };

    let events = Arc::new(RoomEvents::new());
    spawn_watcher(Arc::clone(&store), &feed, Arc::clone(&events), stop.clone());

    let service: Arc<dyn RoomService> = Arc::new(RoomServiceFactory::new(store));
    let server = SketchPartyServer::new(service, events);
    let make_service = server.into_router().into_make_service();

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    info!(target = LOG_TARGET, %local_addr, "sketchparty server listening");

    let result = axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error");

    stop.cancel();
    result
}

async fn shutdown_signal() {
    use tracing::warn;

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = LOG_TARGET,
            error = %err,
            "failed to install ctrl-c handler"
        );
    }
    info!(target = LOG_TARGET, "shutdown signal received");
}

/// Builds the websocket URL of a Supabase project's realtime endpoint.
pub fn build_realtime_url(base: &str, api_key: &str) -> Result<Url> {
    use anyhow::{anyhow, bail};

    let mut url = Url::parse(base).context("invalid Supabase base URL")?;
    match url.scheme() {
        "http" => {
            if url.set_scheme("ws").is_err() {
                bail!("failed to convert http scheme to ws");
            }
        }
        "https" => {
            if url.set_scheme("wss").is_err() {
                bail!("failed to convert https scheme to wss");
            }
        }
        "ws" | "wss" => {}
        other => bail!("unsupported Supabase URL scheme '{other}'"),
    }

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow!("Supabase URL cannot be a base URL"))?;
        segments.pop_if_empty();
        segments.extend(&["realtime", "v1", "websocket"]);
    }

    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("apikey", api_key);
        pairs.append_pair("vsn", "1.0.0");
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realtime_url_is_derived_from_project_url() {
        let url = build_realtime_url("https://proj.supabase.co", "anon-key").expect("url");
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/realtime/v1/websocket");
        assert!(url.query().unwrap().contains("apikey=anon-key"));
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert!(build_realtime_url("ftp://proj.supabase.co", "k").is_err());
    }
}
