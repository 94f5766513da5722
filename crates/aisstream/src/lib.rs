//! Upstream adapter for the aisstream.io AIS WebSocket feed.
//!
//! Provides the wire schema (subscribe frame, incoming packets) and a
//! [`common::WsHandler`] implementation that fans raw frames out to the
//! ingest channel.

use serde::Deserialize;

pub mod handler;
pub mod messages;

pub use handler::AisHandler;
pub use messages::{
    build_subscribe_message, AisMessage, Metadata, Packet, PositionReport, ShipStaticData,
    SubscribeMessage,
};

/// Feed configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AisConfig {
    /// WebSocket URL of the stream endpoint.
    pub url: String,
    /// aisstream.io API key, sent in the subscribe frame.
    pub api_key: String,
    /// Subscription applied on every (re)connect.
    #[serde(default)]
    pub default_sub: DefaultSub,
}

/// Default subscription: areas plus optional MMSI / message-type filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultSub {
    #[serde(default)]
    pub boxes: Vec<Vec<[f64; 2]>>,
    #[serde(default, rename = "filterMMSI")]
    pub filter_mmsi: Vec<String>,
    #[serde(default)]
    pub filter_msg_type: Vec<String>,
}
