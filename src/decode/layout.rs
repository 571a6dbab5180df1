//! Binary layout constants for the quotation driver's record families
//!
//! All records are little-endian and packed (no alignment padding).
//! These values are load-bearing: they must match the driver byte for byte.

/// Quote record stride
pub const QUOTE_RECORD_SIZE: usize = 158;
/// Width of every fixed code field
pub const CODE_WIDTH: usize = 10;
/// Width of every fixed name field
pub const NAME_WIDTH: usize = 32;

/// Quote record field offsets
pub mod quote {
    pub const RECORD_SIZE: usize = 0;
    pub const TRADE_TIME: usize = 2;
    pub const MARKET: usize = 6;
    pub const CODE: usize = 8;
    pub const NAME: usize = 18;
    /// last close, open, high, low, price, volume, amount
    pub const PRICES: usize = 50;
    /// bid price L1..L3
    pub const BID_PRICE_L1: usize = 78;
    /// bid volume L1..L3
    pub const BID_VOLUME_L1: usize = 90;
    /// ask price L1..L3
    pub const ASK_PRICE_L1: usize = 102;
    /// ask volume L1..L3
    pub const ASK_VOLUME_L1: usize = 114;
    /// bid price, bid volume, ask price, ask volume for level 4
    pub const LEVEL_4: usize = 126;
    /// same order for level 5
    pub const LEVEL_5: usize = 142;
}

/// Tag value marking an embedded header inside minute / 5-minute streams
pub const HEADER_SENTINEL: u32 = 0xFFFF_FFFF;

/// Embedded header: tag u32, market u16, code [u8; 10]
pub const FRAME_HEADER_SIZE: usize = 16;
/// Offset of the code inside the embedded header
pub const FRAME_HEADER_CODE: usize = 6;

/// Minute bar: time u32, price f32, volume f32, amount f32
pub const MINUTE_BAR_SIZE: usize = 16;

/// Uniform slot size of the 5-minute stream (headers and bars alike)
pub const FIVE_MINUTE_STRIDE: usize = 32;

/// Symbol table header size; entries start right after it
pub const SYMBOL_TABLE_ENTRIES_OFFSET: usize = 54;
/// Symbol table entry: code [u8; 10], name [u8; 32], price digits u16
pub const SYMBOL_TABLE_ENTRY_SIZE: usize = 44;

/// Symbol table header field offsets
pub mod symbol_table {
    pub const MARKET: usize = 0;
    pub const MARKET_NAME: usize = 2;
    pub const MARKET_NAME_WIDTH: usize = 16;
    pub const ENTRY_COUNT: usize = 52;
}

/// File data-type tags the decoders act on; the driver's other tags
/// (history 2, ex-rights 6) make both bar decoders a no-op
pub mod data_type {
    pub const MINUTE: u16 = 4;
    pub const FIVE_MINUTE: u16 = 81;
}
