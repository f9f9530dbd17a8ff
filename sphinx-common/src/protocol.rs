// protocol.rs - searchd wire constants and typed enumerations
//
// This module defines the numeric vocabulary of the searchd binary protocol:
// command codes, status codes, query modes, filter kinds and attribute types.
//
// ============================================================================
// FRAMING OVERVIEW
// ============================================================================
//
// Every integer on the wire is big-endian.
//
// Handshake (per connection):
//
//   daemon -> client: 4 bytes, must equal HANDSHAKE_SERVER
//   client -> daemon: 4 bytes, HANDSHAKE_CLIENT
//
// Request frame:
//
//   +------------+------------+-------------+-------------+------------------+
//   | command:2B | version:2B | length:4B   | nqueries:4B | descriptors...   |
//   +------------+------------+-------------+-------------+------------------+
//   `length` counts nqueries plus all descriptors.
//
// Response frame:
//
//   +-----------+------------+-------------+--------------------+
//   | status:2B | version:2B | length:4B   | payload: length B  |
//   +-----------+------------+-------------+--------------------+
//
// Strings are a 4-byte length followed by raw bytes, with no terminator.
// Floats travel as the raw IEEE-754 bit pattern in a 4-byte word.

use crate::error::{SphinxError, SphinxResult};

/// Bytes the daemon must send first on a fresh connection.
pub const HANDSHAKE_SERVER: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Bytes the client answers with once the daemon's marker checks out.
pub const HANDSHAKE_CLIENT: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Default searchd port.
pub const DEFAULT_PORT: u16 = 3312;

// ============================================================================
// COMMANDS
// ============================================================================

/// Search command code.
pub const SEARCHD_COMMAND_SEARCH: u16 = 0;

/// Client-side implementation version of the search command.
pub const VER_COMMAND_SEARCH: u16 = 0x0113;

/// Marker announcing 64-bit id range support in a query descriptor.
pub const ID64_RANGE_MARKER: i32 = 1;

/// Reserved geo-anchor slot; anchoring is not implemented, so always zero.
pub const GEO_ANCHOR_NONE: i32 = 0;

// ============================================================================
// STATUS CODES
// ============================================================================

pub const SEARCHD_OK: u32 = 0;
pub const SEARCHD_ERROR: u32 = 1;
pub const SEARCHD_RETRY: u32 = 2;
pub const SEARCHD_WARNING: u32 = 3;

/// Status reported by the daemon, both per frame (2 bytes) and per result
/// (4 bytes).
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchdStatus {
    Ok = SEARCHD_OK,
    Error = SEARCHD_ERROR,
    Retry = SEARCHD_RETRY,
    Warning = SEARCHD_WARNING,
}

impl SearchdStatus {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Try to create a status from its wire code.
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            SEARCHD_OK => Some(Self::Ok),
            SEARCHD_ERROR => Some(Self::Error),
            SEARCHD_RETRY => Some(Self::Retry),
            SEARCHD_WARNING => Some(Self::Warning),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::Retry => "RETRY",
            Self::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for SearchdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// QUERY MODES
// ============================================================================

/// How query words are matched against documents.
///
/// `FULLSCAN` (5) exists in the daemon but is not accepted by this client.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    All = 0,
    Any = 1,
    Phrase = 2,
    Boolean = 3,
    Extended = 4,
    Extended2 = 6,
}

impl MatchMode {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::All),
            1 => Some(Self::Any),
            2 => Some(Self::Phrase),
            3 => Some(Self::Boolean),
            4 => Some(Self::Extended),
            6 => Some(Self::Extended2),
            _ => None,
        }
    }
}

impl TryFrom<u32> for MatchMode {
    type Error = SphinxError;

    fn try_from(value: u32) -> SphinxResult<Self> {
        Self::from_u32(value).ok_or_else(|| SphinxError::invalid("match_mode", value))
    }
}

/// Relevance ranking function (extended2 matching only).
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankMode {
    #[default]
    ProximityBm25 = 0,
    Bm25 = 1,
    Unranked = 2,
    WordCount = 3,
}

impl RankMode {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::ProximityBm25),
            1 => Some(Self::Bm25),
            2 => Some(Self::Unranked),
            3 => Some(Self::WordCount),
            _ => None,
        }
    }
}

impl TryFrom<u32> for RankMode {
    type Error = SphinxError;

    fn try_from(value: u32) -> SphinxResult<Self> {
        Self::from_u32(value).ok_or_else(|| SphinxError::invalid("ranking_mode", value))
    }
}

/// Result ordering.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Relevance = 0,
    AttrDesc = 1,
    AttrAsc = 2,
    TimeSegments = 3,
    Extended = 4,
    Expr = 5,
}

impl SortMode {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Relevance),
            1 => Some(Self::AttrDesc),
            2 => Some(Self::AttrAsc),
            3 => Some(Self::TimeSegments),
            4 => Some(Self::Extended),
            5 => Some(Self::Expr),
            _ => None,
        }
    }
}

impl TryFrom<u32> for SortMode {
    type Error = SphinxError;

    fn try_from(value: u32) -> SphinxResult<Self> {
        Self::from_u32(value).ok_or_else(|| SphinxError::invalid("sort_mode", value))
    }
}

/// Grouping function applied to the group-by attribute.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupFunc {
    #[default]
    Day = 0,
    Week = 1,
    Month = 2,
    Year = 3,
    Attr = 4,
    AttrPair = 5,
}

impl GroupFunc {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Day),
            1 => Some(Self::Week),
            2 => Some(Self::Month),
            3 => Some(Self::Year),
            4 => Some(Self::Attr),
            5 => Some(Self::AttrPair),
            _ => None,
        }
    }
}

impl TryFrom<u32> for GroupFunc {
    type Error = SphinxError;

    fn try_from(value: u32) -> SphinxResult<Self> {
        Self::from_u32(value).ok_or_else(|| SphinxError::invalid("group_func", value))
    }
}

// ============================================================================
// FILTERS AND ATTRIBUTES
// ============================================================================

pub const SPH_FILTER_VALUES: u32 = 0;
pub const SPH_FILTER_RANGE: u32 = 1;
pub const SPH_FILTER_FLOATRANGE: u32 = 2;

pub const SPH_ATTR_INTEGER: u32 = 1;
pub const SPH_ATTR_TIMESTAMP: u32 = 2;
pub const SPH_ATTR_ORDINAL: u32 = 3;
pub const SPH_ATTR_BOOL: u32 = 4;
pub const SPH_ATTR_FLOAT: u32 = 5;

/// High-order flag marking a multi-valued attribute.
pub const SPH_ATTR_MULTI: u32 = 0x4000_0000;
