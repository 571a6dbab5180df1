//! Ingest statistics
//!
//! Lock-free counters updated by the coordinator on every packet.
//! Snapshots are taken for logging and the HTTP API.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

/// Diagnostic counters owned by the coordinator; all monotonic
pub struct IngestStats {
    packets_received: AtomicU64,
    packets_rejected: AtomicU64,
    records_declared: AtomicU64,
    quotes_decoded: AtomicU64,
    decode_errors: AtomicU64,
    symbol_table_packets: AtomicU64,
    symbol_table_entries: AtomicU64,
    minute_sets: AtomicU64,
    five_minute_sets: AtomicU64,
    /// Unix millis of the last packet
    last_packet_time: AtomicU64,
    start_time: Instant,
}

/// Plain copy of `IngestStats` for export
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub packets_received: u64,
    pub packets_rejected: u64,
    pub records_declared: u64,
    pub quotes_decoded: u64,
    pub decode_errors: u64,
    pub symbol_table_packets: u64,
    pub symbol_table_entries: u64,
    pub minute_sets: u64,
    pub five_minute_sets: u64,
    pub last_packet_time: u64,
    pub packet_rate: f64,
    pub uptime_seconds: u64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self {
            packets_received: AtomicU64::new(0),
            packets_rejected: AtomicU64::new(0),
            records_declared: AtomicU64::new(0),
            quotes_decoded: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            symbol_table_packets: AtomicU64::new(0),
            symbol_table_entries: AtomicU64::new(0),
            minute_sets: AtomicU64::new(0),
            five_minute_sets: AtomicU64::new(0),
            last_packet_time: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Count a packet and return its 1-based sequence number
    #[inline]
    pub fn record_packet(&self, declared: usize) -> u64 {
        self.records_declared
            .fetch_add(declared as u64, Ordering::Relaxed);
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.last_packet_time.store(now, Ordering::Relaxed);
        self.packets_received.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.packets_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_quotes(&self, decoded: usize) {
        self.quotes_decoded
            .fetch_add(decoded as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_errors(&self, errors: usize) {
        if errors > 0 {
            self.decode_errors
                .fetch_add(errors as u64, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_symbol_table(&self, declared_entries: usize) {
        self.symbol_table_packets.fetch_add(1, Ordering::Relaxed);
        self.symbol_table_entries
            .fetch_add(declared_entries as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_minute_sets(&self, sets: usize) {
        self.minute_sets.fetch_add(sets as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_five_minute_sets(&self, sets: usize) {
        self.five_minute_sets
            .fetch_add(sets as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let packets = self.packets_received.load(Ordering::Relaxed);
        let uptime = self.start_time.elapsed().as_secs();
        let rate = if uptime > 0 {
            packets as f64 / uptime as f64
        } else {
            0.0
        };

        StatsSnapshot {
            packets_received: packets,
            packets_rejected: self.packets_rejected.load(Ordering::Relaxed),
            records_declared: self.records_declared.load(Ordering::Relaxed),
            quotes_decoded: self.quotes_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            symbol_table_packets: self.symbol_table_packets.load(Ordering::Relaxed),
            symbol_table_entries: self.symbol_table_entries.load(Ordering::Relaxed),
            minute_sets: self.minute_sets.load(Ordering::Relaxed),
            five_minute_sets: self.five_minute_sets.load(Ordering::Relaxed),
            last_packet_time: self.last_packet_time.load(Ordering::Relaxed),
            packet_rate: rate,
            uptime_seconds: uptime,
        }
    }
}

impl Default for IngestStats {
    fn default() -> Self {
        Self::new()
    }
}
