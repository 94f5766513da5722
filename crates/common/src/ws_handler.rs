//! WebSocket handler trait for feed adapters.

use crate::error::Result;
use async_trait::async_trait;

/// Trait that feed adapters implement to handle WebSocket events.
/// The WsManager calls these methods when events occur.
#[async_trait]
pub trait WsHandler: Send + Sync + 'static {
    /// Returns the WebSocket URL to connect to.
    fn url(&self) -> &str;

    /// Returns the message to send immediately after connection (e.g., the
    /// subscription payload). Return None if no initial message is needed.
    fn on_connect_message(&self) -> Option<String>;

    /// Called when a text frame is received from the WebSocket.
    async fn on_message(&self, msg: &str) -> Result<()>;

    /// Called when the connection is lost (before reconnect attempt).
    async fn on_disconnect(&self) {}

    /// Called when a (re)connection succeeds.
    async fn on_reconnect(&self) {}
}
