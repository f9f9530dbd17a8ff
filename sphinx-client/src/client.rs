//! # Synchronous Client API
//!
//! Purpose: Expose a compact, blocking API for issuing search queries to a
//! searchd daemon over its binary protocol.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `SphinxClient` hides framing, batching and sockets.
//! 2. **Validated Setters**: Illegal configuration is rejected before any
//!    network I/O and leaves the previous state untouched.
//! 3. **Explicit Batches**: `add_query` writes into a caller-owned
//!    `QueryBatch`; `run_queries` consumes it.
//! 4. **Fail Fast**: Protocol violations surface immediately as errors.

use std::time::Duration;

use tracing::{debug, warn};

use sphinx_common::{
    FieldWeight, Filter, GroupFunc, IndexWeight, MatchMode, QueryResult, RankMode, SortMode,
    SphinxError, SphinxResult, DEFAULT_PORT, SEARCHD_OK, SEARCHD_WARNING,
};

use crate::conn::Connection;
use crate::request::{encode_batch, encode_query, QueryBatch};
use crate::response::{check_frame, decode_results};

/// Default group-by sort clause.
pub const DEFAULT_GROUP_SORT: &str = "@group desc";

/// Query and connection settings serialized into every added query.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Daemon host name or address.
    pub host: String,
    /// Daemon port.
    pub port: u16,
    /// Dial timeout. Reads and writes after the handshake are not bounded.
    pub connect_timeout: Duration,
    pub offset: u32,
    pub limit: u32,
    pub max_matches: u32,
    pub cutoff: u32,
    pub match_mode: MatchMode,
    pub rank_mode: RankMode,
    pub sort_mode: SortMode,
    pub sort_by: String,
    /// Positional field weights.
    pub weights: Vec<i32>,
    /// Document id range; `0..0` means unrestricted.
    pub min_id: u64,
    pub max_id: u64,
    pub filters: Vec<Filter>,
    pub group_func: GroupFunc,
    pub group_by: String,
    pub group_sort: String,
    pub group_distinct: String,
    /// Forwarded to the daemon only; the client never retries.
    pub retry_count: u32,
    pub retry_delay: u32,
    pub index_weights: Vec<IndexWeight>,
    pub field_weights: Vec<FieldWeight>,
    /// Per-query time limit in milliseconds, 0 for none.
    pub max_query_time: u32,
    /// Key matches by position instead of by document id.
    pub array_result: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(2),
            offset: 0,
            limit: 20,
            max_matches: 1000,
            cutoff: 0,
            match_mode: MatchMode::All,
            rank_mode: RankMode::ProximityBm25,
            sort_mode: SortMode::Relevance,
            sort_by: String::new(),
            weights: Vec::new(),
            min_id: 0,
            max_id: 0,
            filters: Vec::new(),
            group_func: GroupFunc::Day,
            group_by: String::new(),
            group_sort: DEFAULT_GROUP_SORT.to_string(),
            group_distinct: String::new(),
            retry_count: 0,
            retry_delay: 0,
            index_weights: Vec::new(),
            field_weights: Vec::new(),
            max_query_time: 0,
            array_result: false,
        }
    }
}

impl ClientConfig {
    /// Checks the invariants the setters enforce, for configs built by hand.
    pub fn validate(&self) -> SphinxResult<()> {
        if self.connect_timeout.is_zero() {
            return Err(SphinxError::invalid("connect_timeout", "0s"));
        }
        if self.limit == 0 {
            return Err(SphinxError::invalid("limit", self.limit));
        }
        let unrestricted = self.min_id == 0 && self.max_id == 0;
        if !unrestricted && self.min_id >= self.max_id {
            return Err(SphinxError::invalid(
                "id_range",
                format!("[{} >= {}]", self.min_id, self.max_id),
            ));
        }
        self.filters.iter().try_for_each(Filter::validate)
    }

    /// `host:port` form used in logs and connection errors.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Outcome of one batch round trip.
#[derive(Debug, Clone)]
pub struct BatchResponse {
    /// Frame-level warning that preceded the payload, if any.
    pub warning: Option<String>,
    /// One result per query, in batch order.
    pub results: Vec<QueryResult>,
}

/// Synchronous searchd client.
///
/// Each `query`/`run_queries` call opens its own connection, performs the
/// handshake, sends one request frame and reads one response frame.
#[derive(Debug, Clone, Default)]
pub struct SphinxClient {
    config: ClientConfig,
}

impl SphinxClient {
    /// Creates a client with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client with a custom configuration.
    pub fn with_config(config: ClientConfig) -> SphinxResult<Self> {
        config.validate()?;
        Ok(SphinxClient { config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn set_server(&mut self, host: impl Into<String>, port: u16) {
        self.config.host = host.into();
        self.config.port = port;
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) -> SphinxResult<()> {
        if timeout.is_zero() {
            return Err(SphinxError::invalid("connect_timeout", "0s"));
        }
        self.config.connect_timeout = timeout;
        Ok(())
    }

    /// Sets pagination, the match window and the early-stop cutoff.
    pub fn set_limits(
        &mut self,
        offset: u32,
        limit: u32,
        max_matches: u32,
        cutoff: u32,
    ) -> SphinxResult<()> {
        if limit == 0 {
            return Err(SphinxError::invalid("limit", limit));
        }
        self.config.offset = offset;
        self.config.limit = limit;
        self.config.max_matches = max_matches;
        self.config.cutoff = cutoff;
        Ok(())
    }

    pub fn set_max_query_time(&mut self, millis: u32) {
        self.config.max_query_time = millis;
    }

    pub fn set_match_mode(&mut self, mode: MatchMode) {
        self.config.match_mode = mode;
    }

    pub fn set_ranking_mode(&mut self, ranker: RankMode) {
        self.config.rank_mode = ranker;
    }

    pub fn set_sort_mode(&mut self, mode: SortMode, sort_by: impl Into<String>) {
        self.config.sort_mode = mode;
        self.config.sort_by = sort_by.into();
    }

    pub fn set_weights(&mut self, weights: Vec<i32>) {
        self.config.weights = weights;
    }

    /// Replaces the per-field weights; order is kept on the wire.
    pub fn set_field_weights(&mut self, weights: Vec<FieldWeight>) {
        self.config.field_weights = weights;
    }

    /// Replaces the per-index weights; order is kept on the wire.
    pub fn set_index_weights(&mut self, weights: Vec<IndexWeight>) {
        self.config.index_weights = weights;
    }

    /// Restricts matches to document ids in `[min, max]`.
    ///
    /// # Errors
    /// `InvalidParameter` when `min >= max`; the previous range is kept.
    pub fn set_id_range(&mut self, min: u64, max: u64) -> SphinxResult<()> {
        if min >= max {
            return Err(SphinxError::invalid(
                "id_range",
                format!("[{} >= {}]", min, max),
            ));
        }
        self.config.min_id = min;
        self.config.max_id = max;
        Ok(())
    }

    pub fn set_filter(&mut self, attr: impl Into<String>, values: Vec<i64>, exclude: bool) {
        self.config.filters.push(Filter::values(attr, values, exclude));
    }

    pub fn set_filter_range(
        &mut self,
        attr: impl Into<String>,
        min: u32,
        max: u32,
        exclude: bool,
    ) -> SphinxResult<()> {
        let filter = Filter::range(attr, min, max, exclude)?;
        self.config.filters.push(filter);
        Ok(())
    }

    pub fn set_filter_float_range(
        &mut self,
        attr: impl Into<String>,
        min: f32,
        max: f32,
        exclude: bool,
    ) -> SphinxResult<()> {
        let filter = Filter::float_range(attr, min, max, exclude)?;
        self.config.filters.push(filter);
        Ok(())
    }

    pub fn set_group_by(
        &mut self,
        attr: impl Into<String>,
        func: GroupFunc,
        group_sort: impl Into<String>,
    ) {
        self.config.group_by = attr.into();
        self.config.group_func = func;
        self.config.group_sort = group_sort.into();
    }

    pub fn set_group_distinct(&mut self, attr: impl Into<String>) {
        self.config.group_distinct = attr.into();
    }

    /// Stores retry settings for the daemon; no client-side retry loop exists.
    pub fn set_retries(&mut self, count: u32, delay: u32) {
        self.config.retry_count = count;
        self.config.retry_delay = delay;
    }

    pub fn set_array_result(&mut self, array_result: bool) {
        self.config.array_result = array_result;
    }

    pub fn reset_filters(&mut self) {
        self.config.filters.clear();
    }

    pub fn reset_group_by(&mut self) {
        self.config.group_by.clear();
        self.config.group_func = GroupFunc::Day;
        self.config.group_sort = DEFAULT_GROUP_SORT.to_string();
        self.config.group_distinct.clear();
    }

    /// Serializes the current settings plus `query` into `batch`.
    ///
    /// `indexes` is a space-separated index list. Returns the batch length.
    pub fn add_query(
        &self,
        batch: &mut QueryBatch,
        query: &str,
        indexes: &str,
        comment: &str,
    ) -> usize {
        batch.push(encode_query(&self.config, query, indexes, comment));
        batch.len()
    }

    /// Sends every query in `batch` in one frame and decodes the results.
    pub fn run_queries(&self, batch: QueryBatch) -> SphinxResult<BatchResponse> {
        if batch.is_empty() {
            return Err(SphinxError::invalid("batch", "no queries"));
        }
        let request = encode_batch(&batch);
        debug!(
            addr = %self.config.addr(),
            queries = batch.len(),
            bytes = request.len(),
            "sending search batch"
        );

        let mut conn = Connection::open(&self.config)?;
        conn.send(&request)?;
        let frame = conn.receive_frame()?;

        let (warning, payload) = check_frame(&frame)?;
        let results = decode_results(payload, batch.len(), self.config.array_result)?;
        Ok(BatchResponse { warning, results })
    }

    /// Runs a single query and returns its result.
    ///
    /// A per-result error or retry status becomes `SphinxError::Daemon`;
    /// warnings stay on the returned result.
    pub fn query(&self, query: &str, indexes: &str, comment: &str) -> SphinxResult<QueryResult> {
        let mut batch = QueryBatch::new();
        self.add_query(&mut batch, query, indexes, comment);
        let response = self.run_queries(batch)?;

        let mut result = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| SphinxError::malformed("response carried no result"))?;

        if result.status != SEARCHD_OK && result.status != SEARCHD_WARNING {
            let message = result.error.take().unwrap_or_default();
            return Err(SphinxError::Daemon {
                status: result.status,
                message,
            });
        }
        if result.warning.is_none() {
            result.warning = response.warning;
        }
        if let Some(message) = &result.warning {
            warn!(warning = %message, "query completed with warning");
        }
        Ok(result)
    }
}
