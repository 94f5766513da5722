//! In-memory ship store.
//!
//! The store is the sole owner of ship state. Three maps keyed by MMSI sit
//! behind three independent reader/writer locks, so spatial queries (state),
//! static-data updates (info) and route eviction (history) do not contend
//! with each other. Locks are held only across in-memory mutation, never
//! across I/O or serialization; every read path returns owned copies.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use aisstream::{Metadata, PositionReport, ShipStaticData};
use chrono::Utc;
use common::geo::{self, BoundingBox};
use serde::Serialize;

use crate::cache::{GeoEntry, GeoIndex, SearchEntry};
use crate::error::{Error, Result};

/// SOG above which a ship is considered under way, knots.
pub const MOVING_SPEED_THRESHOLD: f64 = 0.1;

/// True-heading value the upstream sends when no heading is available.
pub const HEADING_UNKNOWN: u16 = 511;

/// Marker for ships that are moored, at anchor or aground.
pub const MARKER_STOPPED: u8 = 0;
/// Marker for ships under way.
pub const MARKER_MOVING: u8 = 1;
/// Marker for everything else.
pub const MARKER_IDLE: u8 = 2;

/// Dynamic per-ship state, updated by every packet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipState {
    pub mmsi: u32,
    pub name: String,
    pub latlon: [f64; 2],
    pub geohash: u64,
    pub heading: u16,
    pub sog: f64,
    pub nav_stat: u8,
    pub ship_type: u8,
    pub marker: u8,
    pub rotation: u16,
    pub last_update: i64,
}

/// Voyage info, updated only from static-data messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipInfo {
    pub destination: String,
    pub imo_number: u32,
}

/// One recorded route position, epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub latlon: [f64; 2],
    pub timestamp: i64,
}

/// Full per-ship view for `/shipDump`.
#[derive(Debug, Clone, Serialize)]
pub struct ShipDump {
    pub state: ShipState,
    pub info: ShipInfo,
    pub history: Vec<HistoryPoint>,
}

/// Merged state + info view for `/shipInfoWindow`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoWindow {
    pub mmsi: u32,
    pub name: String,
    pub latlon: [f64; 2],
    pub heading: u16,
    pub sog: f64,
    pub nav_stat: u8,
    pub ship_type: u8,
    pub last_update: i64,
    pub destination: String,
    pub imo_number: u32,
}

/// The ship database: state, info and route history, each behind its own
/// lock. See the module docs for the locking discipline.
#[derive(Debug, Default)]
pub struct Ships {
    state: RwLock<HashMap<u32, ShipState>>,
    info: RwLock<HashMap<u32, ShipInfo>>,
    history: RwLock<HashMap<u32, VecDeque<HistoryPoint>>>,
}

impl Ships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty info and history entries for a ship. Runs before
    /// `apply_metadata` for every packet, so by the time a state key is
    /// visible its info/history entries already exist. The state entry
    /// itself is created inside `apply_metadata` under the state lock,
    /// which closes the double-create window between two workers.
    pub fn ensure(&self, mmsi: u32) {
        self.info.write().unwrap().entry(mmsi).or_default();
        self.history.write().unwrap().entry(mmsi).or_default();
    }

    /// Apply packet metadata: name, position, geohash, update stamp.
    pub fn apply_metadata(&self, meta: &Metadata) {
        let mut state = self.state.write().unwrap();
        let ship = state.entry(meta.mmsi).or_default();
        ship.mmsi = meta.mmsi;
        ship.name = meta.ship_name.clone();
        ship.latlon = [meta.latitude, meta.longitude];
        ship.geohash = geo::encode_int(meta.latitude, meta.longitude);
        ship.last_update = Utc::now().timestamp();
    }

    /// Apply a position report: heading, speed, navigational status.
    pub fn apply_position_report(&self, mmsi: u32, report: &PositionReport) {
        let mut state = self.state.write().unwrap();
        if let Some(ship) = state.get_mut(&mmsi) {
            ship.heading = report.true_heading;
            ship.sog = report.sog;
            ship.nav_stat = report.navigational_status;
        }
    }

    /// Apply static data: ship type under the state lock, voyage info under
    /// the info lock.
    pub fn apply_static_data(&self, mmsi: u32, data: &ShipStaticData) {
        {
            let mut state = self.state.write().unwrap();
            if let Some(ship) = state.get_mut(&mmsi) {
                ship.ship_type = data.ship_type;
            }
        }

        let mut info = self.info.write().unwrap();
        if let Some(entry) = info.get_mut(&mmsi) {
            entry.destination = data.destination.clone();
            entry.imo_number = data.imo_number;
        }
    }

    /// Prepend a route point unless the ship is within the wobble threshold
    /// of its newest recorded position.
    pub fn update_history(&self, mmsi: u32, latlon: [f64; 2]) {
        let mut history = self.history.write().unwrap();
        let route = history.entry(mmsi).or_default();

        if route.front().is_none_or(|newest| ship_moved(latlon, newest.latlon)) {
            route.push_front(HistoryPoint {
                latlon,
                timestamp: Utc::now().timestamp(),
            });
        }
    }

    /// Recompute marker and rotation from the ship's current state.
    pub fn refresh_derived(&self, mmsi: u32) {
        let mut state = self.state.write().unwrap();
        let Some(ship) = state.get_mut(&mmsi) else {
            return;
        };

        ship.marker = if matches!(ship.nav_stat, 1 | 5 | 6) {
            MARKER_STOPPED
        } else if ship.sog > MOVING_SPEED_THRESHOLD {
            MARKER_MOVING
        } else {
            MARKER_IDLE
        };

        ship.rotation = if ship.heading == HEADING_UNKNOWN {
            0
        } else {
            ship.heading
        };
    }

    /// Copy out the raw material for a cache rebuild under one state read
    /// lock: (mmsi, geohash) pairs and the search fields. The entries hold
    /// primitive values only; nothing points back into the store.
    pub fn snapshot_for_index(&self) -> (Vec<GeoEntry>, Vec<SearchEntry>) {
        let state = self.state.read().unwrap();

        let mut geo_list = Vec::with_capacity(state.len());
        let mut search_list = Vec::with_capacity(state.len());
        for (mmsi, ship) in state.iter() {
            geo_list.push(GeoEntry {
                mmsi: *mmsi,
                geohash: ship.geohash,
            });
            search_list.push(SearchEntry {
                mmsi: *mmsi,
                name: ship.name.clone(),
                latlon: ship.latlon,
            });
        }

        (geo_list, search_list)
    }

    /// Number of known ships.
    pub fn count(&self) -> usize {
        self.state.read().unwrap().len()
    }

    /// Merged state + info view for one ship.
    pub fn info_window(&self, mmsi: u32) -> Option<InfoWindow> {
        let ship = self.state.read().unwrap().get(&mmsi)?.clone();
        let info = self
            .info
            .read()
            .unwrap()
            .get(&mmsi)
            .cloned()
            .unwrap_or_default();

        Some(InfoWindow {
            mmsi,
            name: ship.name,
            latlon: ship.latlon,
            heading: ship.heading,
            sog: ship.sog,
            nav_stat: ship.nav_stat,
            ship_type: ship.ship_type,
            last_update: ship.last_update,
            destination: info.destination,
            imo_number: info.imo_number,
        })
    }

    /// Route history for one ship, newest first.
    pub fn history(&self, mmsi: u32) -> Option<Vec<HistoryPoint>> {
        self.history
            .read()
            .unwrap()
            .get(&mmsi)
            .map(|route| route.iter().cloned().collect())
    }

    /// Copy of every known ship. The three locks are taken one after
    /// another, so the result is only consistent per map, which is fine for
    /// a diagnostic dump.
    pub fn dump(&self) -> HashMap<u32, ShipDump> {
        let mut ships: HashMap<u32, ShipDump> = HashMap::new();

        {
            let state = self.state.read().unwrap();
            for (mmsi, ship) in state.iter() {
                ships.insert(
                    *mmsi,
                    ShipDump {
                        state: ship.clone(),
                        info: ShipInfo::default(),
                        history: Vec::new(),
                    },
                );
            }
        }

        {
            let info = self.info.read().unwrap();
            for (mmsi, entry) in info.iter() {
                if let Some(dump) = ships.get_mut(mmsi) {
                    dump.info = entry.clone();
                }
            }
        }

        {
            let history = self.history.read().unwrap();
            for (mmsi, route) in history.iter() {
                if let Some(dump) = ships.get_mut(mmsi) {
                    dump.history = route.iter().cloned().collect();
                }
            }
        }

        ships
    }

    /// Ships inside a bounding box. The geo index narrows the candidates in
    /// logarithmic time; the exact half-open predicate is then applied under
    /// the state read lock, because a geohash range covers a rectangle whose
    /// Z-curve encloses cells outside the box.
    pub fn ships_in_box(&self, bbox: &BoundingBox, geo_index: &GeoIndex) -> Result<Vec<ShipState>> {
        if !bbox.in_range() {
            return Err(Error::BboxOutOfRange);
        }

        let candidates = geo_index.candidates(bbox)?;

        let state = self.state.read().unwrap();
        let mut ships = Vec::new();
        for mmsi in candidates {
            // the ship may have been evicted since the index snapshot
            if let Some(ship) = state.get(&mmsi) {
                if bbox.contains(ship.latlon) {
                    ships.push(ship.clone());
                }
            }
        }

        Ok(ships)
    }

    /// Delete ships not updated within `max_age_secs`. State entries go
    /// first under the state write lock; info and history follow under
    /// their own locks, so an observer either sees the full ship or none of
    /// it. Returns the evicted MMSIs.
    pub fn sweep_derelict(&self, now: i64, max_age_secs: i64) -> Vec<u32> {
        let mut evicted = Vec::new();

        {
            let mut state = self.state.write().unwrap();
            state.retain(|mmsi, ship| {
                if now - ship.last_update > max_age_secs {
                    evicted.push(*mmsi);
                    false
                } else {
                    true
                }
            });
        }

        {
            let mut info = self.info.write().unwrap();
            let mut history = self.history.write().unwrap();
            for mmsi in &evicted {
                info.remove(mmsi);
                history.remove(mmsi);
            }
        }

        evicted
    }

    /// Drop route points older than `max_age_secs`. History is newest
    /// first, so everything from the first too-old index onward goes.
    pub fn truncate_routes(&self, now: i64, max_age_secs: i64) {
        let mut history = self.history.write().unwrap();
        for route in history.values_mut() {
            if let Some(idx) = route
                .iter()
                .position(|point| now - point.timestamp > max_age_secs)
            {
                route.truncate(idx);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn seed_history(&self, mmsi: u32, points: Vec<HistoryPoint>) {
        self.history.write().unwrap().insert(mmsi, points.into());
    }
}

/// Whether a ship has moved since its last recorded position. Coordinates
/// are rounded to four decimal places (roughly 11 m) first, so a stationary
/// ship with high-precision GPS wobble does not grow its history.
/// e.g., 36.87983666666666 -> 36.8798
fn ship_moved(current: [f64; 2], previous: [f64; 2]) -> bool {
    (0..2).any(|i| (current[i] * 1e4).round() != (previous[i] * 1e4).round())
}
