//! Inbound packet types
//!
//! A packet is a raw byte region plus a declared record count and the
//! record-family tag it was delivered under. The driver only guarantees the
//! bytes for the duration of the callback, so anything queued is copied into
//! an `OwnedPacket` first.

use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Record family a packet is delivered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordFamily {
    Quote,
    MinuteBar,
    FiveMinuteBar,
    SymbolTable,
}

impl RecordFamily {
    pub const ALL: [RecordFamily; 4] = [
        RecordFamily::Quote,
        RecordFamily::MinuteBar,
        RecordFamily::FiveMinuteBar,
        RecordFamily::SymbolTable,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RecordFamily::Quote => "quote",
            RecordFamily::MinuteBar => "minute",
            RecordFamily::FiveMinuteBar => "five_minute",
            RecordFamily::SymbolTable => "symbol_table",
        }
    }

    /// Realtime quotes are drained ahead of everything else
    #[inline]
    pub fn is_realtime(&self) -> bool {
        matches!(self, RecordFamily::Quote)
    }
}

impl fmt::Display for RecordFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown record family: {0}")]
pub struct UnknownFamily(pub String);

impl FromStr for RecordFamily {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quote" | "report" => Ok(RecordFamily::Quote),
            "minute" => Ok(RecordFamily::MinuteBar),
            "five_minute" | "5min" => Ok(RecordFamily::FiveMinuteBar),
            "symbol_table" | "market_table" => Ok(RecordFamily::SymbolTable),
            other => Err(UnknownFamily(other.to_string())),
        }
    }
}

/// Borrowed view of a packet, valid for the duration of one callback
#[derive(Debug, Clone, Copy)]
pub struct RawPacket<'a> {
    pub family: RecordFamily,
    /// File data-type tag (minute / five-minute framing); zero for families
    /// that do not carry one
    pub data_type: u16,
    /// Declared record count
    pub count: i32,
    /// Record bytes; `None` models a null buffer handle
    pub data: Option<&'a [u8]>,
}

impl<'a> RawPacket<'a> {
    pub fn new(family: RecordFamily, data_type: u16, count: i32, data: &'a [u8]) -> Self {
        Self {
            family,
            data_type,
            count,
            data: Some(data),
        }
    }

    /// Copy the borrowed bytes into an owned packet
    pub fn to_owned_packet(&self) -> OwnedPacket {
        OwnedPacket {
            family: self.family,
            data_type: self.data_type,
            count: self.count,
            data: self.data.map(Bytes::copy_from_slice),
            received_at: Instant::now(),
        }
    }
}

/// Packet whose bytes outlive the driver callback
#[derive(Debug, Clone)]
pub struct OwnedPacket {
    pub family: RecordFamily,
    pub data_type: u16,
    pub count: i32,
    pub data: Option<Bytes>,
    pub received_at: Instant,
}

impl OwnedPacket {
    pub fn new(family: RecordFamily, data_type: u16, count: i32, data: Bytes) -> Self {
        Self {
            family,
            data_type,
            count,
            data: Some(data),
            received_at: Instant::now(),
        }
    }

    /// Borrow as a `RawPacket` for decoding
    pub fn as_raw(&self) -> RawPacket<'_> {
        RawPacket {
            family: self.family,
            data_type: self.data_type,
            count: self.count,
            data: self.data.as_deref(),
        }
    }

    /// Payload length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Bytes::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
