//! Ingest worker pool.
//!
//! N identical workers share the receiving end of the feed client's raw
//! message channel. Each worker decodes a packet and applies the per-packet
//! mutation sequence to the store. Workers never coordinate; correctness
//! rests on the store's per-map locking, and concurrent updates to the same
//! MMSI interleave at field granularity, which matches the feed's
//! last-observation-wins semantics.

use std::sync::Arc;

use aisstream::Packet;
use common::ControlCommand;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::Ships;

/// A running worker with its control channel.
struct WorkerHandle {
    quit_tx: mpsc::Sender<ControlCommand>,
    join_handle: JoinHandle<()>,
}

/// Pool of ingest workers draining the raw message channel.
pub struct IngestPool {
    workers: Vec<WorkerHandle>,
}

impl IngestPool {
    /// Spawn `count` workers over a shared receiver.
    pub fn spawn(
        count: usize,
        ships: Arc<Ships>,
        raw_rx: flume::Receiver<Vec<u8>>,
        ship_history: bool,
    ) -> Self {
        let mut workers = Vec::with_capacity(count);

        for i in 0..count {
            let (quit_tx, quit_rx) = mpsc::channel::<ControlCommand>(1);
            let worker = IngestWorker {
                worker_id: format!("ingest-{}", i + 1),
                ships: ships.clone(),
                ship_history,
            };
            let rx = raw_rx.clone();
            let join_handle = tokio::spawn(async move { worker.run(rx, quit_rx).await });

            workers.push(WorkerHandle {
                quit_tx,
                join_handle,
            });
        }

        info!("spawned {} ingest workers", count);
        Self { workers }
    }

    /// Number of live workers.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop every worker and wait for completion. Called after the feed
    /// client has stopped, so the raw channel has drained by the time the
    /// quit commands land.
    pub async fn shutdown(self) {
        for worker in &self.workers {
            let _ = worker.quit_tx.send(ControlCommand::Shutdown).await;
        }
        for worker in self.workers {
            let _ = worker.join_handle.await;
        }
        info!("ingest pool stopped");
    }
}

struct IngestWorker {
    worker_id: String,
    ships: Arc<Ships>,
    ship_history: bool,
}

impl IngestWorker {
    async fn run(
        self,
        raw_rx: flume::Receiver<Vec<u8>>,
        mut quit_rx: mpsc::Receiver<ControlCommand>,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = quit_rx.recv() => {
                    debug!("[{}] worker stopped", self.worker_id);
                    return;
                }

                msg = raw_rx.recv_async() => {
                    match msg {
                        Ok(raw) => {
                            if let Err(e) = self.process(&raw) {
                                warn!("[{}] failed to process packet: {}", self.worker_id, e);
                                counter!("seawatch_packets_dropped_total", "reason" => "decode").increment(1);
                            }
                        }
                        Err(_) => {
                            // feed client gone; nothing more will arrive
                            debug!("[{}] raw channel disconnected", self.worker_id);
                            let _ = quit_rx.recv().await;
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Apply one packet: ensure entries exist, then metadata, history,
    /// type-specific fields, and finally the derived marker/rotation.
    fn process(&self, raw: &[u8]) -> Result<()> {
        let packet: Packet = serde_json::from_slice(raw)?;

        let mmsi = packet.metadata.mmsi;
        if mmsi == 0 {
            counter!("seawatch_packets_dropped_total", "reason" => "mmsi0").increment(1);
            return Ok(());
        }

        self.ships.ensure(mmsi);
        self.ships.apply_metadata(&packet.metadata);

        if self.ship_history {
            self.ships
                .update_history(mmsi, [packet.metadata.latitude, packet.metadata.longitude]);
        }

        match packet.msg_type.as_str() {
            "PositionReport" => {
                if let Some(report) = &packet.message.position_report {
                    self.ships.apply_position_report(mmsi, report);
                }
            }
            "ShipStaticData" => {
                if let Some(data) = &packet.message.ship_static_data {
                    self.ships.apply_static_data(mmsi, data);
                }
            }
            _ => {}
        }

        self.ships.refresh_derived(mmsi);

        counter!("seawatch_packets_processed_total").increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_packet(mmsi: u32, lat: f64, lng: f64, sog: f64) -> Vec<u8> {
        format!(
            r#"{{"MessageType":"PositionReport","Metadata":{{"MMSI":{mmsi},"ShipName":"SHIP {mmsi}","latitude":{lat},"longitude":{lng},"time_utc":""}},"Message":{{"PositionReport":{{"Sog":{sog},"TrueHeading":90,"NavigationalStatus":0}}}}}}"#
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn test_mmsi_zero_dropped() {
        let ships = Arc::new(Ships::new());
        let (tx, rx) = flume::bounded::<Vec<u8>>(0);
        let pool = IngestPool::spawn(2, ships.clone(), rx, true);

        tx.send_async(position_packet(0, 1.0, 2.0, 0.0)).await.unwrap();
        tx.send_async(position_packet(7, 1.0, 2.0, 0.0)).await.unwrap();
        drop(tx);
        pool.shutdown().await;

        assert_eq!(ships.count(), 1);
        assert!(ships.info_window(7).is_some());
    }

    #[tokio::test]
    async fn test_decode_error_does_not_kill_worker() {
        let ships = Arc::new(Ships::new());
        let (tx, rx) = flume::bounded::<Vec<u8>>(0);
        let pool = IngestPool::spawn(1, ships.clone(), rx, true);

        tx.send_async(b"not json at all".to_vec()).await.unwrap();
        tx.send_async(position_packet(42, 10.0, 20.0, 1.0)).await.unwrap();
        drop(tx);
        pool.shutdown().await;

        assert_eq!(ships.count(), 1);
    }

    #[tokio::test]
    async fn test_static_data_routed_to_info() {
        let ships = Arc::new(Ships::new());
        let (tx, rx) = flume::bounded::<Vec<u8>>(0);
        let pool = IngestPool::spawn(1, ships.clone(), rx, true);

        let raw = br#"{"MessageType":"ShipStaticData","Metadata":{"MMSI":9,"ShipName":"N","latitude":1.0,"longitude":2.0,"time_utc":""},"Message":{"ShipStaticData":{"Destination":"OSLO","ImoNumber":123,"Type":80}}}"#;
        tx.send_async(raw.to_vec()).await.unwrap();
        drop(tx);
        pool.shutdown().await;

        let window = ships.info_window(9).unwrap();
        assert_eq!(window.destination, "OSLO");
        assert_eq!(window.imo_number, 123);
        assert_eq!(window.ship_type, 80);
    }

    #[tokio::test]
    async fn test_history_disabled() {
        let ships = Arc::new(Ships::new());
        let (tx, rx) = flume::bounded::<Vec<u8>>(0);
        let pool = IngestPool::spawn(1, ships.clone(), rx, false);

        tx.send_async(position_packet(5, 10.0, 20.0, 1.0)).await.unwrap();
        drop(tx);
        pool.shutdown().await;

        // the entry exists (created by ensure) but stays empty
        assert_eq!(ships.history(5).unwrap().len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_handles_synthetic_stream() {
        const PACKETS: u32 = 100_000;
        const DISTINCT: u32 = 10_000;

        let ships = Arc::new(Ships::new());
        let (tx, rx) = flume::bounded::<Vec<u8>>(0);
        let pool = IngestPool::spawn(10, ships.clone(), rx, true);

        for i in 0..PACKETS {
            // mmsi 0 shows up periodically and must not be stored
            let mmsi = i % (DISTINCT + 1);
            let lat = f64::from(mmsi % 170) - 85.0;
            let lng = f64::from(mmsi % 350) - 175.0;
            tx.send_async(position_packet(mmsi, lat, lng, 2.0)).await.unwrap();
        }
        drop(tx);
        pool.shutdown().await;

        assert_eq!(ships.count(), DISTINCT as usize);
    }
}
