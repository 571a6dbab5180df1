//! Market data types
//!
//! Quote is the authoritative per-stock snapshot held by the cache.
//! MinuteBar and FiveMinuteBar are transient: built per decode, handed to
//! subscribers and dropped.

use serde::Serialize;
use std::collections::HashMap;
use time::OffsetDateTime;

/// Depth of each order-book ladder
pub const BOOK_DEPTH: usize = 5;

/// One side of the 5-level order book
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Ladder {
    /// Level prices, best first
    pub prices: [f64; BOOK_DEPTH],
    /// Level volumes, aligned with `prices`
    pub volumes: [f64; BOOK_DEPTH],
}

impl Ladder {
    /// Best (level 1) price
    #[inline]
    pub fn best_price(&self) -> f64 {
        self.prices[0]
    }

    /// Sum of volume across all levels
    #[inline]
    pub fn total_volume(&self) -> f64 {
        self.volumes.iter().sum()
    }
}

/// Bid and ask ladders
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OrderBook {
    pub bids: Ladder,
    pub asks: Ladder,
}

/// Current market snapshot for one stock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    /// Canonical exchange-prefixed code
    pub code: String,
    /// Display name, empty until the symbol table provides one
    pub name: String,
    /// Market type code from the driver
    pub market: u16,
    /// Exchange trade time (epoch seconds, as sent by the driver)
    pub trade_time: i32,
    /// Local receive/update time
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    pub last_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub price: f64,
    /// Cumulative volume
    pub volume: f64,
    /// Cumulative amount
    pub amount: f64,

    pub book: OrderBook,

    change_percent: f64,
    change_amount: f64,
}

impl Quote {
    /// Create an empty quote for `code`; prices and ladders start at zero
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: String::new(),
            market: 0,
            trade_time: 0,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            last_close: 0.0,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            price: 0.0,
            volume: 0.0,
            amount: 0.0,
            book: OrderBook::default(),
            change_percent: 0.0,
            change_amount: 0.0,
        }
    }

    /// Change vs. last close, in percent. Zero when there is no last close.
    #[inline]
    pub fn change_percent(&self) -> f64 {
        self.change_percent
    }

    /// Change vs. last close, absolute
    #[inline]
    pub fn change_amount(&self) -> f64 {
        self.change_amount
    }

    /// Recompute derived change fields from price and last close
    ///
    /// Must run after every mutation of `price` or `last_close`.
    pub fn recompute_derived(&mut self) {
        self.change_percent = if self.last_close > 0.0 {
            (self.price - self.last_close) / self.last_close * 100.0
        } else {
            0.0
        };
        self.change_amount = self.price - self.last_close;
    }

    /// Copy the mutable market fields of `other` into `self`
    ///
    /// Code and name are left alone; the book is copied only when
    /// `with_book` is set. Derived fields are recomputed.
    pub fn merge_from(&mut self, other: &Quote, with_book: bool) {
        self.market = other.market;
        self.trade_time = other.trade_time;
        self.updated_at = other.updated_at;
        self.last_close = other.last_close;
        self.open = other.open;
        self.high = other.high;
        self.low = other.low;
        self.price = other.price;
        self.volume = other.volume;
        self.amount = other.amount;
        if with_book {
            self.book = other.book;
        }
        self.recompute_derived();
    }
}

/// One intraday tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinuteBar {
    pub code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    pub price: f64,
    pub volume: f64,
    pub amount: f64,
}

/// One 5-minute OHLCV bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiveMinuteBar {
    pub code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
    pub active_buy_volume: f64,
}

/// Minute bars accumulated for one code between two stream headers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinuteBarSet {
    pub code: String,
    pub bars: Vec<MinuteBar>,
}

/// 5-minute bars from one packet, tagged with the last code seen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiveMinuteBarSet {
    pub code: String,
    pub bars: Vec<FiveMinuteBar>,
}

/// Decoded symbol table packet
///
/// Keys are the raw codes as sent by the driver; normalization happens when
/// the table is merged into the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolTable {
    pub market: u16,
    pub market_name: String,
    pub entries: HashMap<String, String>,
}

impl SymbolTable {
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
