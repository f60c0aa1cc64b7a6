//! Default `WalletEventStream`/`ChainEventStream` implementations.
//!
//! `WalletStreamAdapter` reuses the router/handler shape
//! `infrastructure/client/user/user_ws.rs` builds around `UserHandler` and
//! `TradeMessage` — instead of folding trades into an `OrderManager`, the
//! handler here forwards each one down an mpsc channel for `next_fill` to
//! normalize. `ChainStreamAdapter` follows `infrastructure/client/ctf.rs`'s
//! `ethers`-based contract interaction style: an `abigen!`-generated typed
//! event filter on the exchange contract's `OrderFilled` log, subscribed
//! over a `Provider<Ws>`.

use super::fill_normalizer::{normalize_chain_fill, normalize_wallet_fill, ChainLogRaw, WalletTradeRaw};
use super::interfaces::{ChainEventStream, WalletEventStream};
use super::types::{FillEvent, TaskErrorKind};
use crate::infrastructure::client::user::types::{TradeMessage, UserSubscription};
use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::providers::{Provider, Ws};
use ethers::types::Address;
use futures::StreamExt;
use hypersockets::core::*;
use hypersockets::{MessageHandler, MessageRouter, WsMessage};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

// =============================================================================
// Wallet channel
// =============================================================================

const USER_WS_URL: &str = "wss://ws-subscriptions-clob.polymarket.com/ws/user";
const HEARTBEAT_INTERVAL_SECS: u64 = 5;

/// Configuration for the user-channel wallet stream. Mirrors `UserConfig`
/// in `user_ws.rs`; kept separate since this adapter only needs auth, not
/// the order-tracker's `SharedOrderManager` plumbing.
pub struct WalletStreamConfig {
    pub api_key: String,
    pub api_secret: String,
    pub api_passphrase: String,
}

impl WalletStreamConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_key: std::env::var("API_KEY")
                .map_err(|_| anyhow::anyhow!("API_KEY environment variable not set"))?,
            api_secret: std::env::var("API_SECRET")
                .map_err(|_| anyhow::anyhow!("API_SECRET environment variable not set"))?,
            api_passphrase: std::env::var("API_PASSPHRASE")
                .map_err(|_| anyhow::anyhow!("API_PASSPHRASE environment variable not set"))?,
        })
    }

    fn subscription(&self) -> UserSubscription {
        UserSubscription::new(self.api_key.clone(), self.api_secret.clone(), self.api_passphrase.clone())
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
struct TradeRoute;

struct TradeRouter;

#[async_trait::async_trait]
impl MessageRouter for TradeRouter {
    type Message = Option<TradeMessage>;
    type RouteKey = TradeRoute;

    async fn parse(&self, message: WsMessage) -> hypersockets::Result<Self::Message> {
        let text = match message.as_text() {
            Some(t) => t,
            None => return Ok(None),
        };
        if text == "PONG" {
            return Ok(None);
        }
        match serde_json::from_str::<TradeMessage>(text) {
            Ok(trade) if trade.event_type == "trade" => Ok(Some(trade)),
            _ => Ok(None),
        }
    }

    fn route_key(&self, _message: &Self::Message) -> Self::RouteKey {
        TradeRoute
    }
}

/// Forwards every parsed trade message into an mpsc channel instead of
/// folding it into an `OrderManager`, the way `UserHandler::handle_trade`
/// does for the order tracker.
struct TradeForwarder {
    tx: mpsc::UnboundedSender<TradeMessage>,
}

impl MessageHandler<Option<TradeMessage>> for TradeForwarder {
    fn handle(&mut self, message: Option<TradeMessage>) -> hypersockets::Result<()> {
        if let Some(trade) = message {
            if self.tx.send(trade).is_err() {
                debug!("[WalletStream] receiver dropped, trade discarded");
            }
        }
        Ok(())
    }
}

/// A derived per-trade dedup nonce. The user-channel `trade` message
/// carries no numeric nonce field (unlike the on-chain log's `logIndex`),
/// so the trade's own `id` — unique per fill per Polymarket's API — is
/// hashed into one instead of leaving `DedupKey::Wallet` unaddressable.
fn derive_nonce(trade_id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    trade_id.hash(&mut hasher);
    hasher.finish()
}

/// Production `WalletEventStream` over the Polymarket user WebSocket
/// channel.
pub struct WalletStreamAdapter {
    rx: mpsc::UnboundedReceiver<TradeMessage>,
    shutdown_flag: Arc<AtomicBool>,
}

impl WalletStreamAdapter {
    /// Connect and authenticate against the user channel, spawning the
    /// background pump task the same way `spawn_user_order_tracker` does.
    pub async fn connect(config: WalletStreamConfig) -> anyhow::Result<Self> {
        let shutdown_flag = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::unbounded_channel();

        let subscription_json = serde_json::to_string(&config.subscription())?;
        let router = TradeRouter;
        let handler = TradeForwarder { tx };

        let client = WebSocketClientBuilder::new()
            .url(USER_WS_URL)
            .router(router, move |routing| routing.handler(TradeRoute, handler))
            .heartbeat(Duration::from_secs(HEARTBEAT_INTERVAL_SECS), WsMessage::Text("PING".to_string()))
            .subscription(WsMessage::Text(subscription_json))
            .shutdown_flag(shutdown_flag.clone())
            .build()
            .await?;

        let pump_flag = shutdown_flag.clone();
        tokio::spawn(async move {
            while pump_flag.load(Ordering::Acquire) {
                match client.try_recv_event() {
                    Some(ClientEvent::Connected) => info!("[WalletStream] connected to user channel"),
                    Some(ClientEvent::Disconnected) => warn!("[WalletStream] disconnected from user channel"),
                    Some(ClientEvent::Reconnecting(attempt)) => {
                        warn!("[WalletStream] reconnecting (attempt {})", attempt)
                    }
                    Some(ClientEvent::Error(err)) => warn!("[WalletStream] error: {}", err),
                    None => tokio::time::sleep(Duration::from_millis(10)).await,
                }
            }
            if let Err(e) = client.shutdown().await {
                warn!("[WalletStream] error during shutdown: {}", e);
            }
        });

        Ok(Self { rx, shutdown_flag })
    }
}

impl Drop for WalletStreamAdapter {
    fn drop(&mut self) {
        self.shutdown_flag.store(false, Ordering::Release);
    }
}

#[async_trait]
impl WalletEventStream for WalletStreamAdapter {
    async fn next_fill(&mut self) -> Option<FillEvent> {
        loop {
            let trade = self.rx.recv().await?;

            let price: f64 = match trade.price.parse() {
                Ok(p) => p,
                Err(_) => {
                    debug!("[WalletStream] unparsable price in trade {}, skipping", trade.id);
                    continue;
                }
            };
            let timestamp_ms: u64 = trade.timestamp.parse().unwrap_or(0);
            let order_hash = trade.taker_order_id.clone().unwrap_or_else(|| trade.id.clone());
            let nonce = derive_nonce(&trade.id);

            let raw = WalletTradeRaw {
                order_hash,
                nonce,
                price,
                size: trade.size.clone(),
                timestamp_ms,
            };

            match normalize_wallet_fill(&raw) {
                Some(fill) => return Some(fill),
                None => {
                    debug!("[WalletStream] trade {} failed normalization, skipping", trade.id);
                    continue;
                }
            }
        }
    }
}

// =============================================================================
// Chain channel
// =============================================================================

const CHAIN_RECONNECT_BACKOFF_MS: u64 = 2_000;

abigen!(
    CtfExchange,
    r#"[
        event OrderFilled(bytes32 indexed orderHash, address indexed maker, address indexed taker, uint256 makerAssetId, uint256 takerAssetId, uint256 makerAmountFilled, uint256 takerAmountFilled, uint256 fee)
    ]"#
);

/// Production `ChainEventStream` subscribing to `OrderFilled` logs on the
/// exchange's settlement contract over a `Provider<Ws>`, mirroring the
/// `ethers`/`abigen!` pattern `CtfClient` uses for `ConditionalTokens`.
pub struct ChainStreamAdapter {
    rx: mpsc::UnboundedReceiver<FillEvent>,
    shutdown_flag: Arc<AtomicBool>,
}

impl ChainStreamAdapter {
    pub async fn connect(ws_url: &str, exchange_address: Address) -> Result<Self, TaskErrorKind> {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown_flag = Arc::new(AtomicBool::new(true));
        let pump_flag = shutdown_flag.clone();
        let ws_url = ws_url.to_string();

        tokio::spawn(async move {
            while pump_flag.load(Ordering::Acquire) {
                if let Err(e) = Self::run_subscription(&ws_url, exchange_address, &tx, &pump_flag).await {
                    warn!("[ChainStream] subscription error: {}, reconnecting", e);
                    tokio::time::sleep(Duration::from_millis(CHAIN_RECONNECT_BACKOFF_MS)).await;
                }
            }
        });

        Ok(Self { rx, shutdown_flag })
    }

    async fn run_subscription(
        ws_url: &str,
        exchange_address: Address,
        tx: &mpsc::UnboundedSender<FillEvent>,
        shutdown_flag: &Arc<AtomicBool>,
    ) -> anyhow::Result<()> {
        let provider = Provider::<Ws>::connect(ws_url).await?;
        let provider = Arc::new(provider);
        let contract = CtfExchange::new(exchange_address, provider);

        let events = contract.event::<OrderFilledFilter>();
        let mut stream = events.stream_with_meta().await?;

        info!("[ChainStream] subscribed to OrderFilled on {:?}", exchange_address);

        while shutdown_flag.load(Ordering::Acquire) {
            match stream.next().await {
                Some(Ok((event, meta))) => {
                    let observed_at_ms = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_millis() as u64)
                        .unwrap_or(0);

                    let maker_amount: f64 = event.maker_amount_filled.to_string().parse().unwrap_or(0.0);
                    let taker_amount: f64 = event.taker_amount_filled.to_string().parse().unwrap_or(0.0);
                    let price = if taker_amount > 0.0 { maker_amount / taker_amount } else { 0.0 };

                    let raw = ChainLogRaw {
                        tx_hash: format!("{:?}", meta.transaction_hash),
                        log_index: meta.log_index.as_u64(),
                        price,
                        amount_base_units: event.taker_amount_filled.to_string(),
                        timestamp_ms: observed_at_ms,
                    };

                    if let Some(fill) = normalize_chain_fill(&raw) {
                        if tx.send(fill).is_err() {
                            return Ok(());
                        }
                    }
                }
                Some(Err(e)) => {
                    debug!("[ChainStream] log decode error: {}", e);
                }
                None => return Err(anyhow::anyhow!("OrderFilled log stream ended")),
            }
        }
        Ok(())
    }
}

impl Drop for ChainStreamAdapter {
    fn drop(&mut self) {
        self.shutdown_flag.store(false, Ordering::Release);
    }
}

#[async_trait]
impl ChainEventStream for ChainStreamAdapter {
    async fn next_fill(&mut self) -> Option<FillEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_is_stable_for_the_same_trade_id() {
        assert_eq!(derive_nonce("trade-1"), derive_nonce("trade-1"));
        assert_ne!(derive_nonce("trade-1"), derive_nonce("trade-2"));
    }

    #[test]
    fn price_ratio_guards_against_zero_taker_amount() {
        let maker_amount = 0.0_f64;
        let taker_amount = 0.0_f64;
        let price = if taker_amount > 0.0 { maker_amount / taker_amount } else { 0.0 };
        assert_eq!(price, 0.0);
    }
}
