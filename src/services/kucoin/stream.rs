//! KuCoin public WebSocket feed.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use super::messages::{PingRequest, SubscribeRequest};
use super::KucoinProvider;
use crate::error::ProviderError;
use crate::models::Granularity;
use crate::services::market_data::{StreamSource, Subscription};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(18);
const MESSAGE_BUFFER: usize = 256;

#[async_trait]
impl StreamSource for KucoinProvider {
    async fn subscribe(
        &self,
        instrument: &str,
        granularity: Granularity,
    ) -> Result<Subscription, ProviderError> {
        let bullet = self.bullet_public().await?;
        let server = bullet
            .instance_servers
            .first()
            .ok_or_else(|| ProviderError::Decode("bullet response has no instance servers".to_string()))?;

        let connect_id = Utc::now().timestamp_millis().to_string();
        let mut url = Url::parse(&server.endpoint)
            .map_err(|e| ProviderError::Decode(format!("invalid stream endpoint: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("token", &bullet.token)
            .append_pair("connectId", &connect_id);

        let ping_interval = match server.ping_interval {
            0 => DEFAULT_PING_INTERVAL,
            ms => Duration::from_millis(ms),
        };

        let (mut ws, _) = tokio::time::timeout(self.timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| ProviderError::Transport(format!("stream handshake timed out after {:?}", self.timeout)))??;
        info!(symbol = %instrument, endpoint = %server.endpoint, "KuCoin stream connected");

        let request = SubscribeRequest::candles(connect_id.clone(), instrument, granularity);
        let payload = serde_json::to_string(&request)
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        ws.send(Message::Text(payload)).await?;

        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let symbol = instrument.to_string();
        let task = tokio::spawn(pump(ws, tx, shutdown_rx, ping_interval, connect_id, symbol));

        Ok(Subscription::new(instrument, rx, shutdown_tx, task))
    }
}

/// Forward text frames to `tx`, ping on schedule, stop on shutdown or transport end.
async fn pump(
    ws: WsStream,
    tx: mpsc::Sender<String>,
    mut shutdown: oneshot::Receiver<()>,
    ping_interval: Duration,
    connect_id: String,
    symbol: String,
) {
    let (mut write, mut read) = ws.split();
    let mut ping = tokio::time::interval(ping_interval);
    // first tick fires immediately
    ping.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!(symbol = %symbol, "Closing KuCoin stream on request");
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            _ = ping.tick() => {
                let Ok(payload) = serde_json::to_string(&PingRequest::new(connect_id.clone())) else {
                    continue;
                };
                if let Err(e) = write.send(Message::Text(payload)).await {
                    warn!(symbol = %symbol, error = %e, "KuCoin ping failed");
                    break;
                }
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if tx.send(text).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(symbol = %symbol, frame = ?frame, "KuCoin stream closed by server");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(symbol = %symbol, error = %e, "KuCoin stream transport error");
                    break;
                }
                None => break,
            }
        }
    }
}
