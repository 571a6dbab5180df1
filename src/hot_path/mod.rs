//! Hot path - runs on every decoded packet
//!
//! - cache: authoritative quote and symbol-name store
//! - debounce: coalesced change notification
//! - routing: outbound event fan-out

pub mod cache;
pub mod debounce;
pub mod routing;

pub use cache::{BookUpdate, QuoteUpdate, StockCache};
pub use debounce::ChangeNotifier;
pub use routing::{EventBus, EventKind, MarketEvent};
