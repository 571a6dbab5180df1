//! Core types for quote ingestion
//!
//! This module contains the fundamental types used throughout the system:
//! - code: canonical stock code normalization
//! - market_data: Quote, order-book ladders, minute and 5-minute bars
//! - packet: record families and raw/owned packet views

pub mod code;
pub mod market_data;
pub mod packet;

pub use code::{normalize, Exchange};
pub use market_data::{
    FiveMinuteBar, FiveMinuteBarSet, Ladder, MinuteBar, MinuteBarSet, OrderBook, Quote,
    SymbolTable, BOOK_DEPTH,
};
pub use packet::{OwnedPacket, RawPacket, RecordFamily};
