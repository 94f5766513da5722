//! Spatial cache: derived indexes over the ship store.
//!
//! Two indexes are rebuilt together on a timer from a snapshot of the store:
//! a geohash-sorted list backing bounding-box queries, and a flat search
//! list of (MMSI, name, position). Each rebuild swaps a fresh `Arc` in, so a
//! reader takes the list reference once per query and never races a rebuild.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use common::geo::BoundingBox;
use common::ControlCommand;
use metrics::gauge;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::store::Ships;

/// Rebuilds per second right after startup, to prime the cache quickly.
const PRIME_ROUNDS: u32 = 5;

/// One geo-index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoEntry {
    pub mmsi: u32,
    pub geohash: u64,
}

/// One search-index entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub mmsi: u32,
    pub name: String,
    pub latlon: [f64; 2],
}

/// Geohash-sorted index of all ships at snapshot time.
#[derive(Debug, Default)]
pub struct GeoIndex {
    /// Entries sorted ascending by geohash.
    pub list: Vec<GeoEntry>,
    /// Epoch second of the rebuild that produced this index.
    pub last_update: i64,
}

impl GeoIndex {
    /// Candidate MMSIs for a bounding box: every entry whose geohash lies in
    /// the corner-hash range. The two bounds are asymmetric on purpose:
    /// `begin` is the first index with geohash >= hash(SW), `upper` is one
    /// past the last index with geohash <= hash(NE). When `begin >= upper`
    /// the range wraps around the list end; Z-order hashes are not monotone
    /// in lat/lng, so the wrap branch is load-bearing (a box crossing the
    /// antimeridian lands here), not an edge case. Candidates are a coarse
    /// superset; callers must apply the exact predicate afterwards.
    pub fn candidates(&self, bbox: &BoundingBox) -> Result<Vec<u32>> {
        if self.list.is_empty() {
            return Err(Error::IndexNotReady);
        }

        let (h_sw, h_ne) = bbox.corner_hashes();
        let begin = self.list.partition_point(|e| e.geohash < h_sw);
        let upper = self.list.partition_point(|e| e.geohash <= h_ne);

        let mut mmsis;
        if begin < upper {
            mmsis = Vec::with_capacity(upper - begin);
            mmsis.extend(self.list[begin..upper].iter().map(|e| e.mmsi));
        } else {
            mmsis = Vec::with_capacity(self.list.len() - begin + upper);
            mmsis.extend(self.list[begin..].iter().map(|e| e.mmsi));
            mmsis.extend(self.list[..upper].iter().map(|e| e.mmsi));
        }

        Ok(mmsis)
    }
}

/// The rebuilt-on-a-timer cache pair.
#[derive(Debug, Default)]
pub struct SpatialCache {
    geo: RwLock<Arc<GeoIndex>>,
    search: RwLock<Arc<Vec<SearchEntry>>>,
}

impl SpatialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current geo index. Hold the returned `Arc` for the whole query.
    pub fn geo_index(&self) -> Arc<GeoIndex> {
        self.geo.read().unwrap().clone()
    }

    /// Current search list.
    pub fn search_list(&self) -> Arc<Vec<SearchEntry>> {
        self.search.read().unwrap().clone()
    }

    /// Rebuild both indexes from a store snapshot. The store lock is only
    /// held for the copy-out; sorting happens out of lock, and the finished
    /// lists replace the previous ones atomically.
    pub fn rebuild(&self, ships: &Ships) {
        let (mut geo_list, search_list) = ships.snapshot_for_index();
        geo_list.sort_unstable_by_key(|e| e.geohash);

        let count = geo_list.len();
        let index = GeoIndex {
            list: geo_list,
            last_update: Utc::now().timestamp(),
        };

        *self.geo.write().unwrap() = Arc::new(index);
        *self.search.write().unwrap() = Arc::new(search_list);

        gauge!("seawatch_ships_tracked").set(count as f64);
        debug!("spatial cache rebuilt, {} ships", count);
    }

    /// Rebuild loop: every second for the first five seconds, then on the
    /// configured interval. A rebuild that overruns the interval delays the
    /// next tick instead of bursting to catch up.
    pub async fn run(
        self: Arc<Self>,
        ships: Arc<Ships>,
        refresh: Duration,
        mut quit_rx: mpsc::Receiver<ControlCommand>,
    ) {
        for _ in 0..PRIME_ROUNDS {
            self.rebuild(&ships);
            tokio::select! {
                biased;
                _ = quit_rx.recv() => {
                    info!("spatial cache stopped during priming");
                    return;
                }
                _ = sleep(Duration::from_secs(1)) => {}
            }
        }

        let mut tick = interval(refresh);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tick.reset();

        loop {
            tokio::select! {
                biased;
                _ = quit_rx.recv() => {
                    info!("spatial cache stopped");
                    return;
                }
                _ = tick.tick() => {
                    self.rebuild(&ships);
                }
            }
        }
    }
}
