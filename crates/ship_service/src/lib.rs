//! Ship service library.
//!
//! Maintains an in-memory database of live AIS ship state and serves
//! spatial and per-ship queries over HTTP.
//!
//! # Architecture
//!
//! - **Three-lock store**: state, info and history maps behind independent
//!   reader/writer locks, so query, static-data and eviction paths do not
//!   contend
//! - **Geohash index**: a geohash-sorted snapshot rebuilt on a timer backs
//!   bounding-box queries in logarithmic time
//! - **Worker-pool ingest**: N workers drain the feed client's raw message
//!   channel and reduce it into the store

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod ingest;
pub mod janitor;
pub mod meta;
pub mod store;

pub use api::{create_router, render_index, AppState};
pub use cache::{GeoEntry, GeoIndex, SearchEntry, SpatialCache};
pub use config::Config;
pub use error::Error;
pub use ingest::IngestPool;
pub use janitor::{Janitor, JanitorConfig};
pub use store::{HistoryPoint, InfoWindow, ShipDump, ShipInfo, ShipState, Ships};
