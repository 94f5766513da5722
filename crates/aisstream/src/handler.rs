//! aisstream.io WebSocket handler implementation.
//!
//! The handler owns the subscribe frame and the producing end of the raw
//! message channel. Frames are forwarded as-is; decoding happens in the
//! ingest workers. The channel is a rendezvous channel, so a slow consumer
//! side blocks the read loop here rather than buffering unboundedly.

use async_trait::async_trait;
use common::error::{Error, Result};
use common::WsHandler;
use metrics::counter;
use tracing::{info, warn};

use crate::messages::build_subscribe_message;
use crate::AisConfig;

/// Feed handler for the aisstream.io stream.
pub struct AisHandler {
    config: AisConfig,
    raw_tx: flume::Sender<Vec<u8>>,
    session_id: String,
}

impl AisHandler {
    /// Create a new handler forwarding raw frames into `raw_tx`.
    pub fn new(config: AisConfig, raw_tx: flume::Sender<Vec<u8>>, session_id: String) -> Self {
        Self {
            config,
            raw_tx,
            session_id,
        }
    }
}

#[async_trait]
impl WsHandler for AisHandler {
    fn url(&self) -> &str {
        &self.config.url
    }

    fn on_connect_message(&self) -> Option<String> {
        Some(build_subscribe_message(&self.config))
    }

    async fn on_message(&self, msg: &str) -> Result<()> {
        counter!("seawatch_feed_frames_forwarded_total").increment(1);
        self.raw_tx
            .send_async(msg.as_bytes().to_vec())
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    async fn on_disconnect(&self) {
        warn!("[{}] aisstream connection lost", self.session_id);
    }

    async fn on_reconnect(&self) {
        info!("[{}] aisstream subscribed", self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefaultSub;

    fn make_handler(raw_tx: flume::Sender<Vec<u8>>) -> AisHandler {
        let config = AisConfig {
            url: "wss://stream.aisstream.io/v0/stream".to_string(),
            api_key: "key".to_string(),
            default_sub: DefaultSub {
                boxes: vec![vec![[-90.0, -180.0], [90.0, 180.0]]],
                filter_mmsi: vec![],
                filter_msg_type: vec![],
            },
        };
        AisHandler::new(config, raw_tx, "test-feed".to_string())
    }

    #[tokio::test]
    async fn test_forwards_raw_bytes() {
        let (tx, rx) = flume::bounded::<Vec<u8>>(1);
        let handler = make_handler(tx);

        handler.on_message(r#"{"MessageType":"x"}"#).await.unwrap();
        assert_eq!(rx.recv_async().await.unwrap(), br#"{"MessageType":"x"}"#);
    }

    #[tokio::test]
    async fn test_send_after_consumers_gone() {
        let (tx, rx) = flume::bounded::<Vec<u8>>(1);
        let handler = make_handler(tx);
        drop(rx);

        assert!(matches!(
            handler.on_message("{}").await,
            Err(Error::ChannelClosed)
        ));
    }

    #[test]
    fn test_connect_message_is_subscribe_frame() {
        let (tx, _rx) = flume::bounded::<Vec<u8>>(1);
        let handler = make_handler(tx);

        let frame = handler.on_connect_message().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["APIKey"], "key");
    }
}
