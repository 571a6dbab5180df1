//! Authoritative quote and symbol-name store
//!
//! Two concurrent maps keyed by canonical code:
//! - quotes: one `Quote` per code, created on first sighting and mutated in
//!   place afterwards
//! - symbols: code -> display name, fed by symbol tables and by quotes that
//!   carry a name
//!
//! Writes to the same code serialize on the map's shard lock. `clear` takes
//! the gate exclusively so an upsert cannot straddle a reset and resurrect a
//! stale entry.

use crate::core::{code, Quote};
use crate::hot_path::debounce::ChangeNotifier;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::Level;

/// Quote count above which a warning is logged; storage is never capped
pub const DEFAULT_SOFT_LIMIT: usize = 50_000;

/// Whether an update carries order-book data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookUpdate {
    /// Incoming ladders are complete; overwrite all levels
    Replace,
    /// No usable ladder data; keep the stored levels
    Keep,
}

/// One quote update headed for the cache
#[derive(Debug, Clone)]
pub struct QuoteUpdate {
    pub quote: Quote,
    pub book: BookUpdate,
}

impl From<Quote> for QuoteUpdate {
    /// Decoded quote records always carry all five levels
    fn from(quote: Quote) -> Self {
        Self {
            quote,
            book: BookUpdate::Replace,
        }
    }
}

pub struct StockCache {
    quotes: DashMap<String, Quote>,
    symbols: DashMap<String, String>,
    gate: RwLock<()>,
    soft_limit: usize,
    over_limit: AtomicBool,
    notifier: Arc<ChangeNotifier>,
}

impl StockCache {
    pub fn new(soft_limit: usize, notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            quotes: DashMap::new(),
            symbols: DashMap::new(),
            gate: RwLock::new(()),
            soft_limit,
            over_limit: AtomicBool::new(false),
            notifier,
        }
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Insert or merge a full quote (book included)
    #[inline]
    pub fn upsert_quote(&self, quote: Quote) -> bool {
        self.upsert(QuoteUpdate::from(quote))
    }

    /// Insert or merge one quote update
    ///
    /// Returns false when the update is rejected (empty code).
    pub fn upsert(&self, update: QuoteUpdate) -> bool {
        let QuoteUpdate { mut quote, book } = update;
        let key = code::normalize(&quote.code);
        if key.is_empty() {
            crate::log_cache!(Level::DEBUG, "rejected quote with empty code");
            return false;
        }

        let inserted = {
            let _gate = self.gate.read();

            if !quote.name.is_empty() {
                self.symbols.insert(key.clone(), quote.name.clone());
            }

            match self.quotes.entry(key) {
                Entry::Occupied(mut stored) => {
                    let stored = stored.get_mut();
                    stored.merge_from(&quote, book == BookUpdate::Replace);
                    if !quote.name.is_empty() {
                        stored.name = quote.name;
                    } else if stored.name.is_empty() {
                        if let Some(name) = self.lookup_name(&stored.code) {
                            stored.name = name;
                        }
                    }
                    false
                }
                Entry::Vacant(slot) => {
                    quote.code = slot.key().clone();
                    if quote.name.is_empty() {
                        if let Some(name) = self.lookup_name(&quote.code) {
                            quote.name = name;
                        }
                    }
                    if book == BookUpdate::Keep {
                        quote.book = Default::default();
                    }
                    quote.recompute_derived();
                    slot.insert(quote);
                    true
                }
            }
        };

        if inserted {
            self.check_soft_limit();
        }
        self.notifier.mark_changed();
        true
    }

    fn check_soft_limit(&self) {
        let count = self.quotes.len();
        if count > self.soft_limit && !self.over_limit.swap(true, Ordering::Relaxed) {
            crate::log_cache!(
                Level::WARN,
                count,
                soft_limit = self.soft_limit,
                "quote cache above soft limit"
            );
        }
    }

    /// Store one code -> name pair; blank code or name is ignored
    pub fn upsert_symbol(&self, code: &str, name: &str) -> bool {
        let merged = {
            let _gate = self.gate.read();
            self.merge_symbol(code, name)
        };
        if merged {
            self.notifier.mark_changed();
        }
        merged
    }

    /// Merge a batch of code -> name pairs; returns how many were stored
    ///
    /// Later pairs overwrite earlier ones for the same canonical code.
    pub fn upsert_symbols<I, K, V>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let merged = {
            let _gate = self.gate.read();
            entries
                .into_iter()
                .filter(|(code, name)| self.merge_symbol(code.as_ref(), name.as_ref()))
                .count()
        };
        if merged > 0 {
            crate::log_cache!(Level::DEBUG, merged, total = self.symbols.len(), "symbols merged");
            self.notifier.mark_changed();
        }
        merged
    }

    /// Caller holds the gate
    fn merge_symbol(&self, raw_code: &str, name: &str) -> bool {
        let key = code::normalize(raw_code);
        let name = name.trim();
        if key.is_empty() || name.is_empty() {
            return false;
        }
        // Quotes seen before their name arrived pick it up now
        if let Some(mut quote) = self.quotes.get_mut(&key) {
            if quote.name.is_empty() {
                quote.name = name.to_string();
            }
        }
        self.symbols.insert(key, name.to_string());
        true
    }

    /// Quote for `code` after normalization
    pub fn lookup_quote(&self, code: &str) -> Option<Quote> {
        let key = code::normalize(code);
        self.quotes.get(&key).map(|q| q.value().clone())
    }

    /// Name for `code`, trying prefix-stripped and prefix-added variants
    pub fn lookup_name(&self, code: &str) -> Option<String> {
        code::lookup_candidates(code)
            .iter()
            .find_map(|candidate| self.symbols.get(candidate).map(|n| n.value().clone()))
    }

    /// Empty both maps as one step with respect to concurrent upserts
    pub fn clear(&self) {
        let (quotes, symbols) = {
            let _gate = self.gate.write();
            let counts = (self.quotes.len(), self.symbols.len());
            self.quotes.clear();
            self.symbols.clear();
            self.over_limit.store(false, Ordering::Relaxed);
            counts
        };
        crate::log_cache!(Level::INFO, quotes, symbols, "cache cleared");
        self.notifier.mark_changed();
    }

    #[inline]
    pub fn quote_count(&self) -> usize {
        self.quotes.len()
    }

    #[inline]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Copy of every stored quote, in no particular order
    pub fn quotes_snapshot(&self) -> Vec<Quote> {
        self.quotes.iter().map(|q| q.value().clone()).collect()
    }

    /// Copy of the symbol table
    pub fn symbol_table_snapshot(&self) -> HashMap<String, String> {
        self.symbols
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "quotes={} symbols={} soft_limit={}",
            self.quote_count(),
            self.symbol_count(),
            self.soft_limit
        )
    }
}
