//! # Searchd Sync Client
//!
//! Purpose: Provide a lightweight, synchronous client for the searchd binary
//! protocol: handshake, batched search requests, and typed result decoding.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `SphinxClient` hides framing and socket details.
//! 2. **Explicit Batches**: Pending queries live in a `QueryBatch` value, not
//!    on the client, so one client can serve independent callers.
//! 3. **One Connection Per Call**: Every round trip dials, handshakes, sends
//!    and reads on a fresh socket; nothing is pooled.
//! 4. **Protocol Clarity**: Requests and responses are encoded and decoded
//!    field by field, in wire order.

mod client;
mod conn;
mod request;
mod response;

pub use client::{BatchResponse, ClientConfig, SphinxClient};
pub use request::QueryBatch;
pub use sphinx_common::{
    AttrInfo, AttrType, AttrValue, FieldWeight, Filter, GroupFunc, IndexWeight, Match, Matches,
    MatchMode, QueryResult, RankMode, SortMode, SphinxError, SphinxResult, WordStats,
};
