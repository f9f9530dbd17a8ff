//! # Search Request Encoding
//!
//! Purpose: Serialize client settings plus query text into per-query
//! descriptors and wrap a batch of them into one request frame.
//!
//! ## Design Principles
//! 1. **Freeze Early**: A descriptor is encoded the moment a query is added,
//!    so later setter calls do not affect queries already in a batch.
//! 2. **Wire Order Is The Contract**: Fields are written in exactly the order
//!    the daemon parses them; nothing is reordered or skipped.
//! 3. **Buffer Sizing**: The batch frame is allocated once at its final size.

use bytes::{BufMut, Bytes, BytesMut};

use sphinx_common::{
    put_float, put_flag, put_str, Filter, GEO_ANCHOR_NONE, ID64_RANGE_MARKER,
    SEARCHD_COMMAND_SEARCH, VER_COMMAND_SEARCH,
};

use crate::client::ClientConfig;

/// Size of command + version + length + query count.
const FRAME_HEADER_LEN: usize = 2 + 2 + 4 + 4;

/// Queries waiting to be sent together.
///
/// Built with `SphinxClient::add_query` and consumed by
/// `SphinxClient::run_queries`.
#[derive(Debug, Clone, Default)]
pub struct QueryBatch {
    queries: Vec<Bytes>,
}

impl QueryBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub(crate) fn push(&mut self, descriptor: Bytes) {
        self.queries.push(descriptor);
    }

    fn payload_len(&self) -> usize {
        self.queries.iter().map(Bytes::len).sum()
    }
}

/// Encodes one query descriptor from the current settings.
pub fn encode_query(config: &ClientConfig, query: &str, indexes: &str, comment: &str) -> Bytes {
    let mut out = BytesMut::with_capacity(256 + query.len());

    out.put_i32(config.offset as i32);
    out.put_i32(config.limit as i32);
    out.put_i32(config.match_mode.as_u32() as i32);
    out.put_i32(config.rank_mode.as_u32() as i32);
    out.put_i32(config.sort_mode.as_u32() as i32);
    put_str(&mut out, &config.sort_by);
    put_str(&mut out, query);

    out.put_i32(config.weights.len() as i32);
    for weight in &config.weights {
        out.put_i32(*weight);
    }

    put_str(&mut out, indexes);
    out.put_i32(ID64_RANGE_MARKER);
    out.put_i64(config.min_id as i64);
    out.put_i64(config.max_id as i64);

    out.put_i32(config.filters.len() as i32);
    for filter in &config.filters {
        encode_filter(&mut out, filter);
    }

    out.put_i32(config.group_func.as_u32() as i32);
    put_str(&mut out, &config.group_by);
    out.put_i32(config.max_matches as i32);
    put_str(&mut out, &config.group_sort);
    out.put_i32(config.cutoff as i32);
    out.put_i32(config.retry_count as i32);
    out.put_i32(config.retry_delay as i32);
    put_str(&mut out, &config.group_distinct);
    out.put_i32(GEO_ANCHOR_NONE);

    out.put_i32(config.index_weights.len() as i32);
    for entry in &config.index_weights {
        put_str(&mut out, &entry.index);
        out.put_i32(entry.weight);
    }

    out.put_i32(config.max_query_time as i32);

    out.put_i32(config.field_weights.len() as i32);
    for entry in &config.field_weights {
        put_str(&mut out, &entry.field);
        out.put_i32(entry.weight);
    }

    put_str(&mut out, comment);
    out.freeze()
}

// The attribute name goes out as its length only, and set values go out as
// float bit patterns. The targeted daemon build reads exactly this layout.
fn encode_filter(out: &mut BytesMut, filter: &Filter) {
    out.put_i32(filter.attr().len() as i32);
    out.put_i32(filter.kind() as i32);
    match filter {
        Filter::Values { values, .. } => {
            out.put_i32(values.len() as i32);
            for value in values {
                put_float(out, *value as f32);
            }
        }
        Filter::Range { min, max, .. } => {
            out.put_i32(*min as i32);
            out.put_i32(*max as i32);
        }
        Filter::FloatRange { min, max, .. } => {
            put_float(out, *min);
            put_float(out, *max);
        }
    }
    put_flag(out, filter.exclude());
}

/// Builds the request frame for a whole batch.
pub fn encode_batch(batch: &QueryBatch) -> BytesMut {
    let body_len = batch.payload_len();
    let mut out = BytesMut::with_capacity(FRAME_HEADER_LEN + body_len);

    out.put_u16(SEARCHD_COMMAND_SEARCH);
    out.put_u16(VER_COMMAND_SEARCH);
    // Length covers the query count word plus every descriptor.
    out.put_u32((body_len + 4) as u32);
    out.put_u32(batch.len() as u32);
    for descriptor in &batch.queries {
        out.put_slice(descriptor);
    }
    out
}
