//! Supabase realtime client.
//!
//! Speaks the Phoenix channel protocol over a websocket and republishes
//! every observed row change onto the process-wide [`ChangeFeed`]. Used
//! when the server runs against a remote Postgres so room watchers see
//! writes made by any server instance.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::feed::{ChangeFeed, ChangeOp, ChangeTable, TableChange};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const LOG_TARGET: &str = "relay::realtime";

/// Tables whose changes drive room watchers.
const WATCHED_TABLES: &[&str] = &["rooms", "room_players", "guesses", "drawing_strokes"];

#[derive(Debug, Clone)]
pub struct RealtimeClientConfig {
    pub realtime_url: Url,
    pub api_key: String,
    pub schema: String,
    pub handshake_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
}

impl RealtimeClientConfig {
    pub fn new(realtime_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            realtime_url,
            api_key: api_key.into(),
            schema: "public".to_string(),
            handshake_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub fn topic(&self) -> String {
        format!("realtime:{}", self.schema)
    }
}

pub struct RealtimeClient {
    cfg: RealtimeClientConfig,
    feed: ChangeFeed,
    stop: CancellationToken,
}

impl RealtimeClient {
    pub fn new(cfg: RealtimeClientConfig, feed: ChangeFeed, stop: CancellationToken) -> Self {
        Self { cfg, feed, stop }
    }

    pub async fn run(self) -> Result<()> {
        info!(target = LOG_TARGET, url = %self.cfg.realtime_url, "starting realtime client");
        while !self.stop.is_cancelled() {
            match self.connect().await {
                Ok(stream) => {
                    if let Err(err) = self.pump(stream).await {
                        warn!(target = LOG_TARGET, error = %err, "realtime stream ended with error");
                    }
                }
                Err(err) => {
                    warn!(target = LOG_TARGET, error = %err, "failed to connect to realtime endpoint");
                }
            }

            if self.stop.is_cancelled() {
                break;
            }

            debug!(
                target = LOG_TARGET,
                delay_secs = self.cfg.reconnect_delay.as_secs_f32(),
                "waiting before reconnect attempt"
            );
            sleep(self.cfg.reconnect_delay).await;
        }

        info!(target = LOG_TARGET, "realtime client stopped");
        Ok(())
    }

    async fn connect(&self) -> Result<WsStream> {
        let ws_url = self.cfg.realtime_url.to_string();
        let connect_fut = connect_async(ws_url);
        let (stream, _) = timeout(self.cfg.handshake_timeout, connect_fut)
            .await
            .context("realtime handshake timed out")?
            .context("realtime handshake failed")?;

        Ok(stream)
    }

    async fn pump(&self, stream: WsStream) -> Result<()> {
        let (mut sink, mut source) = stream.split();

        let join_message = self.join_message()?;
        sink.send(Message::Text(join_message))
            .await
            .context("failed to send join message")?;

        let mut heartbeat = interval(self.cfg.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let heartbeat_msg = heartbeat_message()?;
        let topic = self.cfg.topic();

        let mut joined = false;

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => {
                    debug!(target = LOG_TARGET, "shutdown signal received");
                    break;
                }
                _ = heartbeat.tick() => {
                    if let Err(err) = sink.send(Message::Text(heartbeat_msg.clone())).await {
                        warn!(target = LOG_TARGET, error = %err, "heartbeat send failed, ending loop");
                        break;
                    }
                }
                msg = source.next() => {
                    match msg {
                        Some(Ok(Message::Text(txt))) => {
                            if let Err(err) = self.handle_text(&topic, &mut joined, txt) {
                                warn!(target = LOG_TARGET, error = %err, "failed to handle realtime message");
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            sink.send(Message::Pong(payload)).await.ok();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!(target = LOG_TARGET, ?frame, "socket closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!(target = LOG_TARGET, error = %err, "websocket error");
                            break;
                        }
                        None => {
                            debug!(target = LOG_TARGET, "websocket stream ended");
                            break;
                        }
                    }
                }
            }
        }

        self.send_leave(&mut sink).await.ok();
        let _ = sink.close().await;

        Ok(())
    }

    fn handle_text(&self, topic: &str, joined: &mut bool, txt: String) -> Result<()> {
        let message: IncomingMessage<Value> =
            serde_json::from_str(&txt).context("failed to deserialize realtime message")?;

        match message.event.as_str() {
            "phx_reply" => {
                if message.topic == topic {
                    if let Some(payload) = message.payload {
                        let reply: ReplyPayload = serde_json::from_value(payload)
                            .context("failed to decode phx_reply payload")?;
                        if reply.status == "ok" {
                            *joined = true;
                            debug!(target = LOG_TARGET, "subscription acknowledged");
                        } else {
                            warn!(
                                target = LOG_TARGET,
                                status = reply.status,
                                "subscription rejected"
                            );
                        }
                    }
                }
            }
            "postgres_changes" => {
                if !*joined {
                    debug!(target = LOG_TARGET, "ignoring change before join ack");
                    return Ok(());
                }
                if let Some(payload) = message.payload {
                    let payload: PgPayload<Change<Value>> = serde_json::from_value(payload)
                        .context("failed to parse postgres change payload")?;
                    if let Some(change) = payload.data {
                        self.handle_change(change)?;
                    }
                }
            }
            other => {
                debug!(
                    target = LOG_TARGET,
                    event = other,
                    "ignoring realtime event"
                );
            }
        }

        Ok(())
    }

    fn handle_change(&self, change: Change<Value>) -> Result<()> {
        let Some(table) = ChangeTable::from_name(&change.table) else {
            debug!(target = LOG_TARGET, table = %change.table, "skipping change on unwatched table");
            return Ok(());
        };

        let op = match change.event_type.to_ascii_uppercase().as_str() {
            "INSERT" => ChangeOp::Insert,
            "UPDATE" => ChangeOp::Update,
            "DELETE" => ChangeOp::Delete,
            other => return Err(anyhow!("unknown change type `{other}`")),
        };

        let row = match op {
            ChangeOp::Delete => change.old,
            _ => change.new,
        }
        .ok_or_else(|| anyhow!("change payload missing row record"))?;

        let room_id = extract_room_id(table, &row);
        self.feed.publish(TableChange {
            table,
            op,
            room_id,
            row,
        });

        Ok(())
    }

    async fn send_leave(
        &self,
        sink: &mut futures::stream::SplitSink<WsStream, Message>,
    ) -> Result<()> {
        let leave = leave_message(self.cfg.topic())?;
        sink.send(Message::Text(leave))
            .await
            .context("failed to send leave message")
    }

    fn join_message(&self) -> Result<String> {
        let changes = WATCHED_TABLES
            .iter()
            .map(|table| PostgresChange {
                event: "*",
                schema: self.cfg.schema.as_str(),
                table,
            })
            .collect();

        let payload = JoinPayload {
            access_token: &self.cfg.api_key,
            user_token: &self.cfg.api_key,
            config: JoinConfig {
                postgres_changes: changes,
            },
        };

        let envelope = PhoenixEnvelope {
            topic: self.cfg.topic(),
            event: "phx_join",
            reference: "1",
            payload,
        };

        encode_message(&envelope)
    }
}

/// Room key carried by a changed row. Room rows carry it as `id`, the
/// rest as `room_id`.
fn extract_room_id(table: ChangeTable, row: &Value) -> Option<uuid::Uuid> {
    let key = match table {
        ChangeTable::Rooms => "id",
        _ => "room_id",
    };
    row.get(key)
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse().ok())
}

fn heartbeat_message() -> Result<String> {
    let envelope = PhoenixEnvelope {
        topic: "phoenix".to_string(),
        event: "heartbeat",
        reference: "hb",
        payload: EmptyPayload {},
    };
    encode_message(&envelope)
}

fn leave_message(topic: String) -> Result<String> {
    let envelope = PhoenixEnvelope {
        topic,
        event: "phx_leave",
        reference: "2",
        payload: EmptyPayload {},
    };
    encode_message(&envelope)
}

fn encode_message<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("failed to serialize realtime message")
}

#[derive(serde::Serialize)]
struct PhoenixEnvelope<T> {
    topic: String,
    event: &'static str,
    #[serde(rename = "ref")]
    reference: &'static str,
    payload: T,
}

#[derive(serde::Serialize)]
struct EmptyPayload {}

#[derive(serde::Serialize)]
struct JoinPayload<'a> {
    access_token: &'a str,
    user_token: &'a str,
    config: JoinConfig<'a>,
}

#[derive(serde::Serialize)]
struct JoinConfig<'a> {
    #[serde(rename = "postgres_changes")]
    postgres_changes: Vec<PostgresChange<'a>>,
}

#[derive(serde::Serialize)]
struct PostgresChange<'a> {
    event: &'a str,
    schema: &'a str,
    table: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct IncomingMessage<T = Value> {
    topic: String,
    event: String,
    #[serde(rename = "ref")]
    _ref: Option<String>,
    payload: Option<T>,
}

#[derive(Debug, serde::Deserialize)]
struct PgPayload<T> {
    data: Option<T>,
}

#[derive(Debug, serde::Deserialize)]
struct Change<T> {
    #[serde(default)]
    table: String,
    #[serde(rename = "eventType", alias = "type")]
    event_type: String,
    new: Option<T>,
    #[serde(default)]
    old: Option<T>,
}

#[derive(Debug, serde::Deserialize)]
struct ReplyPayload {
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_payload_maps_to_feed_entry() {
        let feed = ChangeFeed::default();
        let mut rx = feed.subscribe();
        let client = RealtimeClient::new(
            RealtimeClientConfig::new(
                Url::parse("wss://example.test/realtime/v1/websocket").expect("url"),
                "anon",
            ),
            feed,
            CancellationToken::new(),
        );

        let room_id = uuid::Uuid::new_v4();
        let change = Change {
            table: "guesses".to_string(),
            event_type: "INSERT".to_string(),
            new: Some(serde_json::json!({
                "room_id": room_id.to_string(),
                "guess": "cat",
                "is_correct": true,
            })),
            old: None,
        };
        client.handle_change(change).expect("handled");

        let seen = rx.try_recv().expect("published");
        assert_eq!(seen.table, ChangeTable::Guesses);
        assert_eq!(seen.op, ChangeOp::Insert);
        assert_eq!(seen.room_id, Some(room_id));
    }

    #[test]
    fn unwatched_tables_are_skipped() {
        let feed = ChangeFeed::default();
        let mut rx = feed.subscribe();
        let client = RealtimeClient::new(
            RealtimeClientConfig::new(
                Url::parse("wss://example.test/realtime/v1/websocket").expect("url"),
                "anon",
            ),
            feed,
            CancellationToken::new(),
        );

        let change = Change {
            table: "migrations".to_string(),
            event_type: "INSERT".to_string(),
            new: Some(serde_json::json!({})),
            old: None,
        };
        client.handle_change(change).expect("handled");
        assert!(rx.try_recv().is_err());
    }
}
