//! Janitor: periodic eviction of derelict ships and old route history.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::ControlCommand;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::store::Ships;

pub const SECONDS_IN_DAY: i64 = 86400;

/// Janitor configuration, camelCase in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JanitorConfig {
    #[serde(default = "default_enable")]
    pub enable: bool,
    /// Hours between sweeps.
    #[serde(default = "default_schedule_hours")]
    pub schedule_hours: u64,
    #[serde(default)]
    pub expiry_days: ExpiryDays,
}

/// Expiry windows in days. A zero disables that sweep.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryDays {
    #[serde(default = "default_expiry_days")]
    pub derelict_ship: u32,
    #[serde(default = "default_expiry_days")]
    pub route_history: u32,
}

fn default_enable() -> bool {
    true
}

fn default_schedule_hours() -> u64 {
    6
}

fn default_expiry_days() -> u32 {
    7
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            enable: true,
            schedule_hours: default_schedule_hours(),
            expiry_days: ExpiryDays::default(),
        }
    }
}

impl Default for ExpiryDays {
    fn default() -> Self {
        Self {
            derelict_ship: default_expiry_days(),
            route_history: default_expiry_days(),
        }
    }
}

/// Periodic cleanup task over the ship store.
pub struct Janitor {
    config: JanitorConfig,
    ships: Arc<Ships>,
}

impl Janitor {
    pub fn new(config: JanitorConfig, ships: Arc<Ships>) -> Self {
        Self { config, ships }
    }

    /// Run until shutdown. With the janitor disabled or both expiry windows
    /// zero, the task just parks on its quit channel.
    pub async fn run(self, mut quit_rx: mpsc::Receiver<ControlCommand>) {
        let expiry = &self.config.expiry_days;
        if !self.config.enable || (expiry.derelict_ship == 0 && expiry.route_history == 0) {
            info!("janitor idle (disabled or no expiry configured)");
            let _ = quit_rx.recv().await;
            return;
        }

        let mut tick = interval(Duration::from_secs(self.config.schedule_hours * 3600));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tick.reset(); // first sweep after one full interval

        loop {
            tokio::select! {
                biased;

                _ = quit_rx.recv() => {
                    info!("janitor stopped");
                    return;
                }

                _ = tick.tick() => {
                    self.sweep();
                }
            }
        }
    }

    /// One sweep. The two passes are independent: route truncation runs
    /// even when derelict eviction is switched off, and vice versa.
    fn sweep(&self) {
        let now = Utc::now().timestamp();
        let expiry = &self.config.expiry_days;

        if expiry.derelict_ship > 0 {
            let evicted = self
                .ships
                .sweep_derelict(now, i64::from(expiry.derelict_ship) * SECONDS_IN_DAY);
            if !evicted.is_empty() {
                info!("evicted {} derelict ships", evicted.len());
            }
        }

        if expiry.route_history > 0 {
            self.ships
                .truncate_routes(now, i64::from(expiry.route_history) * SECONDS_IN_DAY);
        }
    }
}
