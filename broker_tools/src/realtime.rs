//! Client for the broker's realtime WebSocket feed.
//!
//! Frames are JSON objects of the form `{name, request_id, msg}`. After an
//! `authenticate` handshake the socket carries two kinds of traffic:
//! request/reply pairs correlated by `request_id`, and unsolicited event
//! frames (margin, balance, blocking and position updates) which are fanned
//! out to subscribers through a broadcast channel.
//!
//! The broker drops connections that stay silent for a minute, so a
//! keep-alive frame is sent every 55 seconds. A lost connection is retried
//! every 5 seconds until it comes back or [`RealtimeSession::close`] is
//! called; only one reconnect loop runs at a time.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures_util::{future::BoxFuture, SinkExt, StreamExt};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use teg_common::Secret;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

const KEEP_ALIVE_SECS: u64 = 55;
const RECONNECT_DELAY_SECS: u64 = 5;
const REPLY_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("The realtime socket is not connected")]
    NotConnected,
    #[error("The realtime socket rejected our credentials")]
    AuthenticationFailed,
    #[error("The broker rejected the request: {0}")]
    Rejected(String),
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Timed out waiting for a reply")]
    Timeout,
    #[error("Could not encode or decode a frame: {0}")]
    Codec(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Frame {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(default)]
    msg: Value,
}

//--------------------------------------     Event payloads     ---------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginUpdate {
    pub account: String,
    pub margin_value: f64,
    pub margin_level: f64,
    pub margin_excess: f64,
    pub pnl: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdate {
    pub account: String,
    pub currency: String,
    pub balance: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingUpdate {
    pub account: String,
    pub blocked: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpUpdate {
    pub account: String,
    #[serde(default)]
    pub ips: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskUpdate {
    pub account: String,
    pub check_loss: bool,
    pub check_gain: bool,
    pub check_draw_down: bool,
    pub max_gain: f64,
    pub max_loss: f64,
    pub draw_down: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub account: String,
    pub ticker: String,
    pub quantity: f64,
    pub average_price: f64,
    pub side: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeHistoryOrder {
    pub clordid: String,
    pub ticker: String,
    #[serde(rename = "transact-time")]
    pub transact_time: String,
    #[serde(rename = "avg-price")]
    pub avg_price: f64,
    #[serde(rename = "cum-qtd")]
    pub cum_qty: f64,
    pub side: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeHistoryReport {
    #[serde(rename = "request-id", default)]
    pub request_id: String,
    pub account: String,
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub orders: Vec<TradeHistoryOrder>,
}

/// Events published on the broadcast channel as they arrive from the broker.
#[derive(Debug, Clone)]
pub enum BrokerEvent {
    Margin(Vec<MarginUpdate>),
    Balance(Vec<BalanceUpdate>),
    Blocking(Vec<BlockingUpdate>),
    IpAccess(Vec<IpUpdate>),
    Risk(Vec<RiskUpdate>),
    Position(Vec<PositionUpdate>),
    BalanceOperation(Value),
    TradeHistory(Value),
    /// The session dropped and was re-established. Subscriptions must be
    /// re-issued by the consumer.
    Reconnected,
}

struct PendingReply {
    tx: oneshot::Sender<Result<Frame, RealtimeError>>,
    /// Subscriptions are complete when the broker acks them with a `result`
    /// frame. Queries keep waiting for the payload frame that follows the ack.
    resolve_on_ack: bool,
}

struct Inner {
    url: String,
    token: Secret<String>,
    outbound: Mutex<Option<mpsc::Sender<Message>>>,
    pending: Mutex<HashMap<String, PendingReply>>,
    events: broadcast::Sender<BrokerEvent>,
    closed: AtomicBool,
    reconnecting: AtomicBool,
}

#[derive(Clone)]
pub struct RealtimeSession {
    inner: Arc<Inner>,
}

impl RealtimeSession {
    pub fn new(url: String, token: Secret<String>) -> Self {
        let (events, _) = broadcast::channel(64);
        let inner = Inner {
            url,
            token,
            outbound: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            events,
            closed: AtomicBool::new(false),
            reconnecting: AtomicBool::new(false),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Subscribe to the stream of broker events. Each receiver sees every
    /// event published after it subscribes.
    pub fn events(&self) -> broadcast::Receiver<BrokerEvent> {
        self.inner.events.subscribe()
    }

    /// Open the socket, authenticate, and start the keep-alive and reader
    /// tasks.
    ///
    /// Boxed because the reconnect task spawned on disconnect awaits this
    /// future again, and the recursion needs a concrete type.
    pub fn connect(&self) -> BoxFuture<'_, Result<(), RealtimeError>> {
        Box::pin(self.connect_inner())
    }

    async fn connect_inner(&self) -> Result<(), RealtimeError> {
        self.inner.closed.store(false, Ordering::SeqCst);
        let (ws, _) = connect_async(&self.inner.url).await.map_err(|e| RealtimeError::Transport(e.to_string()))?;
        info!("📡 Realtime socket connected to {}", self.inner.url);
        let (mut write, mut read) = ws.split();
        let (tx, mut rx) = mpsc::channel::<Message>(32);
        *self.inner.outbound.lock().await = Some(tx.clone());

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let session = self.clone();
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => session.dispatch(&text).await,
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }
            session.on_disconnect().await;
        });

        self.authenticate().await?;

        let session = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(KEEP_ALIVE_SECS));
            tick.tick().await;
            loop {
                tick.tick().await;
                if session.inner.closed.load(Ordering::SeqCst) {
                    break;
                }
                let frame =
                    Frame { name: "keepAlive".to_string(), request_id: Some(new_request_id()), msg: json!({}) };
                if tx.send(text_frame(&frame)).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    /// Close the socket and stop reconnecting.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Some(tx) = self.inner.outbound.lock().await.take() {
            let _ = tx.send(Message::Close(None)).await;
        }
    }

    async fn authenticate(&self) -> Result<(), RealtimeError> {
        let msg = json!({ "token": self.inner.token.reveal() });
        let reply = self.send_and_wait("authenticate", msg, false).await?;
        let success = reply.msg.get("success").and_then(Value::as_bool).unwrap_or(false);
        if success {
            info!("📡 Realtime socket authenticated");
            Ok(())
        } else {
            Err(RealtimeError::AuthenticationFailed)
        }
    }

    //-------------------------------------     Queries     ---------------------------------------------

    pub async fn margin_snapshot(&self, account: Option<&str>) -> Result<Vec<MarginUpdate>, RealtimeError> {
        let reply = self.query("get-margin", account).await?;
        decode(reply.msg)
    }

    pub async fn balance_snapshot(&self, account: Option<&str>) -> Result<Vec<BalanceUpdate>, RealtimeError> {
        let reply = self.query("get-balance", account).await?;
        decode(reply.msg)
    }

    pub async fn blocking_snapshot(&self, account: Option<&str>) -> Result<Vec<BlockingUpdate>, RealtimeError> {
        let reply = self.query("get-blocking-update", account).await?;
        decode(reply.msg)
    }

    pub async fn ip_snapshot(&self, account: Option<&str>) -> Result<Vec<IpUpdate>, RealtimeError> {
        let reply = self.query("get-ip-update", account).await?;
        decode(reply.msg)
    }

    pub async fn risk_snapshot(&self, account: Option<&str>) -> Result<Vec<RiskUpdate>, RealtimeError> {
        let reply = self.query("get-risk-update", account).await?;
        decode(reply.msg)
    }

    pub async fn position_snapshot(&self, account: Option<&str>) -> Result<Vec<PositionUpdate>, RealtimeError> {
        let reply = self.query("get-position-update", account).await?;
        decode(reply.msg)
    }

    pub async fn trade_history(
        &self,
        account: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<TradeHistoryReport, RealtimeError> {
        let body = json!({
            "account": account,
            "date_start": start.to_rfc3339(),
            "date_end": end.to_rfc3339(),
        });
        let msg = json!({ "name": "request-trade-history", "body": body });
        let reply = self.send_and_wait("requestMessage", msg, false).await?;
        decode(reply.msg)
    }

    //-----------------------------------     Subscriptions     -----------------------------------------

    pub async fn subscribe_margin_changed(&self) -> Result<(), RealtimeError> {
        self.subscribe("margin-changed").await
    }

    pub async fn subscribe_balance_changed(&self) -> Result<(), RealtimeError> {
        self.subscribe("balance-changed").await
    }

    pub async fn subscribe_blocking_changed(&self) -> Result<(), RealtimeError> {
        self.subscribe("blocking-changed").await
    }

    pub async fn subscribe_ip_changed(&self) -> Result<(), RealtimeError> {
        self.subscribe("ip-changed").await
    }

    pub async fn subscribe_risk_changed(&self) -> Result<(), RealtimeError> {
        self.subscribe("risk-changed").await
    }

    pub async fn subscribe_position_changed(&self) -> Result<(), RealtimeError> {
        self.subscribe("position-changed").await
    }

    async fn subscribe(&self, topic: &str) -> Result<(), RealtimeError> {
        debug!("📡 Subscribing to {topic}");
        let msg = json!({ "name": topic, "body": {} });
        self.send_and_wait("subscribeMessage", msg, true).await.map(|_| ())
    }

    async fn query(&self, message: &str, account: Option<&str>) -> Result<Frame, RealtimeError> {
        debug!("📡 Requesting {message} for {}", account.unwrap_or("all accounts"));
        let msg = json!({ "name": message, "body": { "account": account } });
        self.send_and_wait("sendMessage", msg, false).await
    }

    //-------------------------------------     Plumbing     --------------------------------------------

    async fn send_and_wait(&self, kind: &str, msg: Value, resolve_on_ack: bool) -> Result<Frame, RealtimeError> {
        let request_id = new_request_id();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(request_id.clone(), PendingReply { tx, resolve_on_ack });
        let frame = Frame { name: kind.to_string(), request_id: Some(request_id.clone()), msg };
        if let Err(e) = self.send_frame(&frame).await {
            self.inner.pending.lock().await.remove(&request_id);
            return Err(e);
        }
        match tokio::time::timeout(Duration::from_secs(REPLY_TIMEOUT_SECS), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RealtimeError::NotConnected),
            Err(_) => {
                self.inner.pending.lock().await.remove(&request_id);
                Err(RealtimeError::Timeout)
            },
        }
    }

    async fn send_frame(&self, frame: &Frame) -> Result<(), RealtimeError> {
        let outbound = self.inner.outbound.lock().await;
        let tx = outbound.as_ref().ok_or(RealtimeError::NotConnected)?;
        tx.send(text_frame(frame)).await.map_err(|_| RealtimeError::NotConnected)
    }

    async fn dispatch(&self, text: &str) {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("📡 Discarding unparseable frame: {e}");
                return;
            },
        };
        trace!("📡 Received '{}' frame", frame.name);
        // Result payloads carry the correlation id inside msg rather than at
        // the top level.
        let request_id = frame
            .request_id
            .clone()
            .or_else(|| frame.msg.get("request-id").and_then(Value::as_str).map(String::from));
        if let Some(id) = request_id {
            let mut pending = self.inner.pending.lock().await;
            if let Entry::Occupied(entry) = pending.entry(id) {
                if frame.name == "result" {
                    let accepted = frame.msg.get("success").and_then(Value::as_bool).unwrap_or(false);
                    if accepted {
                        if entry.get().resolve_on_ack {
                            let _ = entry.remove().tx.send(Ok(frame));
                        }
                        // otherwise the payload arrives in a later frame with
                        // the same correlation id
                    } else {
                        let reason =
                            frame.msg.get("reason").and_then(Value::as_str).unwrap_or("unspecified").to_string();
                        let _ = entry.remove().tx.send(Err(RealtimeError::Rejected(reason)));
                    }
                } else {
                    let _ = entry.remove().tx.send(Ok(frame));
                }
                return;
            }
        }
        self.publish(frame);
    }

    fn publish(&self, frame: Frame) {
        let event = match frame.name.as_str() {
            "margin" => serde_json::from_value(frame.msg).map(BrokerEvent::Margin),
            "balance" => serde_json::from_value(frame.msg).map(BrokerEvent::Balance),
            "blocking-update" => serde_json::from_value(frame.msg).map(BrokerEvent::Blocking),
            "ip-update" => serde_json::from_value(frame.msg).map(BrokerEvent::IpAccess),
            "risk-update" => serde_json::from_value(frame.msg).map(BrokerEvent::Risk),
            "position-update" => serde_json::from_value(frame.msg).map(BrokerEvent::Position),
            "balance-operation-result" => Ok(BrokerEvent::BalanceOperation(frame.msg)),
            "trade-history-result" => Ok(BrokerEvent::TradeHistory(frame.msg)),
            other => {
                trace!("📡 Ignoring unhandled frame '{other}'");
                return;
            },
        };
        match event {
            Ok(event) => {
                let _ = self.inner.events.send(event);
            },
            Err(e) => warn!("📡 Could not decode '{}' payload: {e}", frame.name),
        }
    }

    async fn on_disconnect(&self) {
        self.inner.outbound.lock().await.take();
        let mut pending = self.inner.pending.lock().await;
        for (_, reply) in pending.drain() {
            let _ = reply.tx.send(Err(RealtimeError::NotConnected));
        }
        drop(pending);
        if self.inner.closed.load(Ordering::SeqCst) {
            info!("📡 Realtime socket closed");
            return;
        }
        if self.inner.reconnecting.swap(true, Ordering::SeqCst) {
            return;
        }
        let session = self.clone();
        tokio::spawn(async move {
            loop {
                warn!("📡 Realtime socket lost. Reconnecting in {RECONNECT_DELAY_SECS}s");
                tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
                if session.inner.closed.load(Ordering::SeqCst) {
                    break;
                }
                match session.connect().await {
                    Ok(()) => {
                        info!("📡 Realtime socket re-established");
                        let _ = session.inner.events.send(BrokerEvent::Reconnected);
                        break;
                    },
                    Err(e) => error!("📡 Reconnect attempt failed: {e}"),
                }
            }
            session.inner.reconnecting.store(false, Ordering::SeqCst);
        });
    }
}

fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

fn text_frame(frame: &Frame) -> Message {
    // Frame serialization cannot fail: every field is a plain string or Value.
    Message::Text(serde_json::to_string(frame).unwrap_or_default())
}

fn decode<T: serde::de::DeserializeOwned>(msg: Value) -> Result<T, RealtimeError> {
    serde_json::from_value(msg).map_err(|e| RealtimeError::Codec(e.to_string()))
}
