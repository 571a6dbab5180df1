//! Ingestion coordinator
//!
//! Takes one raw packet, picks the decoder for its record family, feeds the
//! results to the cache and republishes them as events:
//! - quotes: cache upsert, then one batch event, then one event per quote
//! - symbol table: merged into the cache, then one batch event
//! - minute / 5-minute bars: published directly, never cached

use crate::core::{OwnedPacket, Quote, RawPacket, RecordFamily};
use crate::decode::{self, symbol_table, DecodeOptions};
use crate::hot_path::{EventBus, EventKind, MarketEvent, StockCache};
use crate::infrastructure::config::{Config, ConfigError};
use crate::infrastructure::metrics::IngestStats;
use crate::infrastructure::queue::PacketHandler;
use std::sync::Arc;
use tracing::Level;

/// Packets logged in detail after startup
const DETAILED_PACKETS: u64 = 10;

/// Declared-count sanity bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketLimits {
    /// Counts above this are treated as corrupt
    pub max_records: usize,
    /// Count used instead of a corrupt one
    pub clamp_to: usize,
}

impl Default for PacketLimits {
    fn default() -> Self {
        Self {
            max_records: 100_000,
            clamp_to: 10_000,
        }
    }
}

impl PacketLimits {
    /// Usable record count, or `None` when the packet should be skipped
    #[inline]
    pub fn validate(&self, declared: i32) -> Option<usize> {
        let declared = usize::try_from(declared).ok().filter(|&n| n > 0)?;
        if declared > self.max_records {
            Some(self.clamp_to)
        } else {
            Some(declared)
        }
    }
}

/// What one packet produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketReport {
    pub family: RecordFamily,
    /// Quotes, bar sets or symbol entries produced
    pub records: usize,
    pub errors: usize,
    /// Packet was skipped before decoding
    pub rejected: bool,
}

impl PacketReport {
    fn rejected(family: RecordFamily) -> Self {
        Self {
            family,
            records: 0,
            errors: 0,
            rejected: true,
        }
    }

    fn decoded(family: RecordFamily, records: usize, errors: usize) -> Self {
        Self {
            family,
            records,
            errors,
            rejected: false,
        }
    }
}

/// Routes decoded packets into the cache and out to subscribers
pub struct IngestionCoordinator {
    cache: Arc<StockCache>,
    bus: Arc<EventBus>,
    stats: Arc<IngestStats>,
    options: DecodeOptions,
    limits: PacketLimits,
}

impl IngestionCoordinator {
    pub fn new(
        cache: Arc<StockCache>,
        bus: Arc<EventBus>,
        stats: Arc<IngestStats>,
        options: DecodeOptions,
        limits: PacketLimits,
    ) -> Self {
        Self {
            cache,
            bus,
            stats,
            options,
            limits,
        }
    }

    /// Coordinator with decode options and limits from `config`
    pub fn from_config(
        config: &Config,
        cache: Arc<StockCache>,
        bus: Arc<EventBus>,
        stats: Arc<IngestStats>,
    ) -> Result<Self, ConfigError> {
        let limits = PacketLimits {
            max_records: config.decode.max_records_per_packet,
            clamp_to: config.decode.clamp_records_to,
        };
        Ok(Self::new(cache, bus, stats, config.decode_options()?, limits))
    }

    pub fn cache(&self) -> &Arc<StockCache> {
        &self.cache
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    /// Decode one packet and publish the results
    ///
    /// Never fails; problems show up as a rejected report or error counts.
    pub fn on_packet(&self, packet: RawPacket<'_>) -> PacketReport {
        let family = packet.family;
        let declared = usize::try_from(packet.count).unwrap_or(0);
        let seq = self.stats.record_packet(declared);

        let Some(data) = packet.data else {
            crate::log_ingest!(Level::ERROR, %family, "packet has no buffer");
            self.stats.record_rejected();
            return PacketReport::rejected(family);
        };

        if seq <= DETAILED_PACKETS {
            crate::log_ingest!(
                Level::INFO,
                seq,
                %family,
                count = packet.count,
                data_type = packet.data_type,
                bytes = data.len(),
                "packet received"
            );
        }

        let report = match family {
            RecordFamily::SymbolTable => Some(self.ingest_symbol_table(data)),
            RecordFamily::Quote => self
                .checked_count(&packet)
                .map(|count| self.ingest_quotes(data, count)),
            RecordFamily::MinuteBar => self
                .checked_count(&packet)
                .map(|count| self.ingest_minute(data, packet.data_type, count)),
            RecordFamily::FiveMinuteBar => self
                .checked_count(&packet)
                .map(|count| self.ingest_five_minute(data, packet.data_type, count)),
        };
        let Some(report) = report else {
            self.stats.record_rejected();
            return PacketReport::rejected(family);
        };

        self.stats.record_errors(report.errors);
        self.log_progress(seq);
        report
    }

    /// Declared count after sanity checks; `None` skips the packet
    fn checked_count(&self, packet: &RawPacket<'_>) -> Option<usize> {
        let family = packet.family;
        let Some(count) = self.limits.validate(packet.count) else {
            crate::log_ingest!(Level::DEBUG, %family, count = packet.count, "empty packet skipped");
            return None;
        };
        if i64::from(packet.count) != count as i64 {
            crate::log_ingest!(
                Level::WARN,
                %family,
                declared = packet.count,
                clamped = count,
                "implausible record count clamped"
            );
        }
        Some(count)
    }

    fn ingest_quotes(&self, data: &[u8], count: usize) -> PacketReport {
        let outcome = decode::decode_quotes(data, count, &self.options);
        let mut quotes = outcome.records;

        for quote in quotes.iter_mut() {
            if quote.name.is_empty() {
                if let Some(name) = self.cache.lookup_name(&quote.code) {
                    quote.name = name;
                }
            }
            self.cache.upsert_quote(quote.clone());
        }
        self.stats.record_quotes(quotes.len());

        let report = PacketReport::decoded(RecordFamily::Quote, quotes.len(), outcome.errors);
        if !quotes.is_empty() {
            self.publish_quotes(quotes);
        }
        report
    }

    /// Batch first, then one event per quote
    fn publish_quotes(&self, quotes: Vec<Quote>) {
        let singles = self.bus.has_interest(EventKind::Quote);
        let batch = Arc::new(quotes);
        self.bus.publish(MarketEvent::QuoteBatch(batch.clone()));
        if singles {
            for quote in batch.iter() {
                self.bus.publish(MarketEvent::Quote(Arc::new(quote.clone())));
            }
        }
    }

    fn ingest_minute(&self, data: &[u8], type_tag: u16, count: usize) -> PacketReport {
        let outcome = decode::decode_minute_bars(data, type_tag, count, &self.options);
        let sets = outcome.records.len();
        self.stats.record_minute_sets(sets);
        for set in outcome.records {
            self.bus.publish(MarketEvent::MinuteBarSet(Arc::new(set)));
        }
        PacketReport::decoded(RecordFamily::MinuteBar, sets, outcome.errors)
    }

    fn ingest_five_minute(&self, data: &[u8], type_tag: u16, count: usize) -> PacketReport {
        let outcome = decode::decode_five_minute_bars(data, type_tag, count, &self.options);
        let sets = outcome.records.len();
        self.stats.record_five_minute_sets(sets);
        for set in outcome.records {
            self.bus.publish(MarketEvent::FiveMinuteBarSet(Arc::new(set)));
        }
        PacketReport::decoded(RecordFamily::FiveMinuteBar, sets, outcome.errors)
    }

    fn ingest_symbol_table(&self, data: &[u8]) -> PacketReport {
        let declared = symbol_table::declared_entries(data).unwrap_or(0);
        self.stats.record_symbol_table(usize::from(declared));

        let outcome = decode::decode_symbol_table(data, &self.options);
        let mut entries = 0;
        for table in outcome.records {
            entries += table.len();
            let merged = self.cache.upsert_symbols(&table.entries);
            crate::log_ingest!(
                Level::INFO,
                market = %table.market_name,
                declared,
                merged,
                total = self.cache.symbol_count(),
                "symbol table merged"
            );
            self.bus
                .publish(MarketEvent::SymbolTableBatch(Arc::new(table.entries)));
        }
        PacketReport::decoded(RecordFamily::SymbolTable, entries, outcome.errors)
    }

    fn log_progress(&self, seq: u64) {
        if seq % 1000 == 0 {
            let stats = self.stats.snapshot();
            crate::log_ingest!(
                Level::INFO,
                packets = stats.packets_received,
                quotes = stats.quotes_decoded,
                errors = stats.decode_errors,
                cache = %self.cache.summary(),
                "ingest progress"
            );
        } else if seq % 100 == 0 {
            crate::log_ingest!(Level::DEBUG, packets = seq, "ingest progress");
        }
    }
}

impl PacketHandler for IngestionCoordinator {
    fn handle(&self, packet: &OwnedPacket) {
        self.on_packet(packet.as_raw());
    }
}
