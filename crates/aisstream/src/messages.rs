//! Wire schema for the aisstream.io WebSocket feed.

use serde::{Deserialize, Serialize};

use crate::AisConfig;

/// Subscription frame, sent once per session immediately after connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeMessage {
    #[serde(rename = "APIKey")]
    pub api_key: String,
    /// Areas to receive reports for, each a `[[lat, lng], [lat, lng]]` pair.
    #[serde(rename = "BoundingBoxes")]
    pub bounding_boxes: Vec<Vec<[f64; 2]>>,
    #[serde(rename = "FiltersShipMMSI", default, skip_serializing_if = "Vec::is_empty")]
    pub filters_ship_mmsi: Vec<String>,
    #[serde(rename = "FilterMessageTypes", default, skip_serializing_if = "Vec::is_empty")]
    pub filter_message_types: Vec<String>,
}

/// Build the subscription frame for a feed configuration.
pub fn build_subscribe_message(config: &AisConfig) -> String {
    let msg = SubscribeMessage {
        api_key: config.api_key.clone(),
        bounding_boxes: config.default_sub.boxes.clone(),
        filters_ship_mmsi: config.default_sub.filter_mmsi.clone(),
        filter_message_types: config.default_sub.filter_msg_type.clone(),
    };
    serde_json::to_string(&msg).unwrap()
}

/// One incoming feed packet. Every packet carries `Metadata`; the `Message`
/// body is only populated for the types listed in it.
#[derive(Debug, Clone, Deserialize)]
pub struct Packet {
    #[serde(rename = "MessageType")]
    pub msg_type: String,
    #[serde(rename = "Metadata")]
    pub metadata: Metadata,
    #[serde(rename = "Message", default)]
    pub message: AisMessage,
}

/// Per-packet metadata, present for every message type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(rename = "MMSI")]
    pub mmsi: u32,
    #[serde(rename = "ShipName", default)]
    pub ship_name: String,
    #[serde(rename = "latitude", default)]
    pub latitude: f64,
    #[serde(rename = "longitude", default)]
    pub longitude: f64,
    #[serde(rename = "time_utc", default)]
    pub time_utc: String,
}

/// Decoded message body. Only position reports and static data are
/// interpreted downstream; other types ride on metadata alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AisMessage {
    #[serde(rename = "PositionReport")]
    pub position_report: Option<PositionReport>,
    #[serde(rename = "ShipStaticData")]
    pub ship_static_data: Option<ShipStaticData>,
}

/// Class A AIS position report (messages 1, 2, and 3).
/// Reference: https://www.navcen.uscg.gov/ais-class-a-reports
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PositionReport {
    pub cog: f64,
    pub communication_state: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "MessageID")]
    pub message_id: i32,
    pub navigational_status: u8,
    pub position_accuracy: bool,
    pub raim: bool,
    pub rate_of_turn: i32,
    pub repeat_indicator: i32,
    pub sog: f64,
    pub spare: i32,
    pub special_manoeuvre_indicator: i32,
    pub timestamp: i32,
    pub true_heading: u16,
    #[serde(rename = "UserID")]
    pub user_id: u32,
    pub valid: bool,
}

/// Class A ship static and voyage related data (message 5).
/// Reference: https://www.navcen.uscg.gov/ais-class-a-static-voyage-message-5
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ShipStaticData {
    pub ais_version: i32,
    pub call_sign: String,
    pub destination: String,
    pub dimension: Dimension,
    pub dte: bool,
    pub eta: Eta,
    pub fix_type: i32,
    pub imo_number: u32,
    pub maximum_static_draught: f64,
    #[serde(rename = "MessageID")]
    pub message_id: i32,
    pub name: String,
    pub repeat_indicator: i32,
    pub spare: bool,
    #[serde(rename = "Type")]
    pub ship_type: u8,
    #[serde(rename = "UserID")]
    pub user_id: u32,
    pub valid: bool,
}

/// Hull dimensions relative to the GPS antenna, meters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Dimension {
    pub a: i32,
    pub b: i32,
    pub c: i32,
    pub d: i32,
}

/// Estimated time of arrival, month-day-hour-minute.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Eta {
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub month: i32,
}
