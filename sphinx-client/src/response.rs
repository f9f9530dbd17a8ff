//! # Search Response Decoding
//!
//! Purpose: Turn a searchd response frame into one `QueryResult` per query of
//! the batch that produced it.
//!
//! ## Design Principles
//! 1. **Frame Then Results**: Frame-level status and version are checked
//!    before any per-query parsing starts.
//! 2. **Schema-Driven**: Each match is read attribute by attribute in schema
//!    order; the schema alone decides how many bytes a match occupies.
//! 3. **Fail Fast**: Any read past the payload end aborts decoding with
//!    `SphinxError::Malformed`; no partial result is returned.
//! 4. **Per-Query Isolation**: A query-level error only ends that query's
//!    entry; following entries still decode.
//!
//! ## Per-Query Layout
//!
//! ```text
//! status:4B [message:str]            (message only when status != OK)
//! nfields:4B field:str*
//! nattrs:4B (name:str type:4B)*
//! nmatches:4B id64:4B
//! (id:4B|8B weight:4B value*)*       (one value group per schema attribute)
//! total:4B total_found:4B msecs:4B nwords:4B
//! (word:str docs:4B hits:4B)*
//! ```

use std::collections::BTreeMap;

use tracing::{debug, warn};

use sphinx_common::{
    AttrInfo, AttrType, AttrValue, Match, QueryResult, SearchdStatus, SphinxError, SphinxResult,
    WireReader, WordStats, SEARCHD_OK, SEARCHD_WARNING, VER_COMMAND_SEARCH,
};

use crate::conn::Frame;

/// Validates frame status and version, returning any frame-level warning and
/// the payload left for per-query decoding.
pub fn check_frame(frame: &Frame) -> SphinxResult<(Option<String>, &[u8])> {
    let mut reader = WireReader::new(&frame.payload);

    let warning = match SearchdStatus::from_u32(u32::from(frame.status)) {
        Some(SearchdStatus::Ok) => None,
        Some(SearchdStatus::Warning) => {
            let message = reader.read_string("frame warning")?;
            warn!(warning = %message, "searchd frame warning");
            Some(message)
        }
        Some(SearchdStatus::Error) | Some(SearchdStatus::Retry) => {
            return Err(SphinxError::Daemon {
                status: u32::from(frame.status),
                message: frame_message(&frame.payload),
            });
        }
        None => {
            return Err(SphinxError::Daemon {
                status: u32::from(frame.status),
                message: format!("unknown status code {}", frame.status),
            });
        }
    };

    if frame.version < VER_COMMAND_SEARCH {
        return Err(SphinxError::CommandVersion {
            daemon: frame.version,
            client: VER_COMMAND_SEARCH,
        });
    }

    Ok((warning, reader.rest()))
}

fn frame_message(payload: &[u8]) -> String {
    WireReader::new(payload)
        .read_string("frame message")
        .unwrap_or_else(|_| String::from_utf8_lossy(payload).into_owned())
}

/// Decodes up to `expected` results, stopping early when the payload runs out.
pub fn decode_results(
    payload: &[u8],
    expected: usize,
    array_result: bool,
) -> SphinxResult<Vec<QueryResult>> {
    let mut reader = WireReader::new(payload);
    let mut results = Vec::with_capacity(expected);

    while results.len() < expected && reader.has_remaining() {
        let index = results.len();
        let result = decode_result(&mut reader, array_result)?;
        if let Some(message) = &result.warning {
            warn!(query = index, warning = %message, "searchd query warning");
        }
        if let Some(message) = &result.error {
            debug!(
                query = index,
                status = result.status,
                error = %message,
                "searchd query failed"
            );
        }
        results.push(result);
    }

    if results.len() < expected {
        debug!(
            expected,
            decoded = results.len(),
            "response payload ended before every query was answered"
        );
    }
    Ok(results)
}

fn decode_result(reader: &mut WireReader<'_>, array_result: bool) -> SphinxResult<QueryResult> {
    let status = reader.read_u32("status")?;
    let mut result = QueryResult::new(status, array_result);

    if status != SEARCHD_OK {
        let message = reader.read_string("status message")?;
        if status == SEARCHD_WARNING {
            result.warning = Some(message);
        } else {
            result.error = Some(message);
            return Ok(result);
        }
    }

    let nfields = reader.read_u32("field count")? as usize;
    result.fields.reserve(bounded(nfields, reader, 4));
    for _ in 0..nfields {
        result.fields.push(reader.read_string("field name")?);
    }

    let nattrs = reader.read_u32("attribute count")? as usize;
    result.attrs.reserve(bounded(nattrs, reader, 8));
    for _ in 0..nattrs {
        let name = reader.read_string("attribute name")?;
        let kind = AttrType(reader.read_u32("attribute type")?);
        result.attrs.push(AttrInfo { name, kind });
    }

    let nmatches = reader.read_u32("match count")?;
    let id64 = reader.read_u32("id64 flag")? == 1;
    for _ in 0..nmatches {
        let m = decode_match(reader, &result.attrs, id64)?;
        result.matches.insert(m);
    }

    result.total = reader.read_u32("total")?;
    result.total_found = reader.read_u32("total found")?;
    result.time = reader.read_u32("elapsed time")? as f32 / 1000.0;

    let nwords = reader.read_u32("word count")?;
    for _ in 0..nwords {
        let word = reader.read_string("word")?;
        let docs = reader.read_u32("word docs")?;
        let hits = reader.read_u32("word hits")?;
        result.words.insert(word, WordStats { docs, hits });
    }

    Ok(result)
}

fn decode_match(
    reader: &mut WireReader<'_>,
    schema: &[AttrInfo],
    id64: bool,
) -> SphinxResult<Match> {
    let id = if id64 {
        reader.read_u64("document id")?
    } else {
        u64::from(reader.read_u32("document id")?)
    };
    let weight = reader.read_u32("weight")?;

    let mut attrs = BTreeMap::new();
    for info in schema {
        attrs.insert(info.name.clone(), read_attr_values(reader, info.kind)?);
    }

    Ok(Match { id, weight, attrs })
}

fn read_attr_values(
    reader: &mut WireReader<'_>,
    kind: AttrType,
) -> SphinxResult<Vec<AttrValue>> {
    if kind.is_float() {
        return Ok(vec![AttrValue::Float(reader.read_float("float attribute")?)]);
    }

    let value = reader.read_u32("attribute value")?;
    if !kind.is_multi() {
        return Ok(vec![AttrValue::Int(value)]);
    }

    // Multi-valued: the first word is the element count.
    let count = value as usize;
    let mut values = Vec::with_capacity(bounded(count, reader, 4));
    for _ in 0..count {
        values.push(AttrValue::Int(reader.read_u32("multi-value element")?));
    }
    Ok(values)
}

// Caps a wire-supplied count by what the remaining payload could hold.
fn bounded(count: usize, reader: &WireReader<'_>, min_size: usize) -> usize {
    count.min(reader.remaining() / min_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};
    use sphinx_common::{Matches, SPH_ATTR_FLOAT, SPH_ATTR_INTEGER, SPH_ATTR_MULTI};

    fn put_str(out: &mut BytesMut, value: &str) {
        out.put_u32(value.len() as u32);
        out.put_slice(value.as_bytes());
    }

    /// Writes a successful result body: schema, matches and stats.
    fn put_body(out: &mut BytesMut, ids: &[u64], id64: bool) {
        out.put_u32(1);
        put_str(out, "title");
        out.put_u32(2);
        put_str(out, "group_id");
        out.put_u32(SPH_ATTR_INTEGER);
        put_str(out, "score");
        out.put_u32(SPH_ATTR_FLOAT);

        out.put_u32(ids.len() as u32);
        out.put_u32(u32::from(id64));
        for (idx, id) in ids.iter().enumerate() {
            if id64 {
                out.put_u64(*id);
            } else {
                out.put_u32(*id as u32);
            }
            out.put_u32(100 + idx as u32);
            out.put_u32(7);
            out.put_f32(0.5);
        }

        out.put_u32(ids.len() as u32);
        out.put_u32(42);
        out.put_u32(1500);
        out.put_u32(1);
        put_str(out, "hello");
        out.put_u32(12);
        out.put_u32(30);
    }

    fn frame(status: u16, version: u16, payload: &[u8]) -> Frame {
        Frame {
            status,
            version,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn decodes_ok_result() {
        let mut payload = BytesMut::new();
        payload.put_u32(SEARCHD_OK);
        put_body(&mut payload, &[5, 9], false);

        let results = decode_results(&payload, 1, true).unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.status, SEARCHD_OK);
        assert_eq!(result.fields, vec!["title".to_string()]);
        assert_eq!(result.attrs.len(), 2);
        assert_eq!(result.attrs[0].name, "group_id");
        assert_eq!(result.attrs[1].kind, AttrType(SPH_ATTR_FLOAT));
        assert_eq!(result.total, 2);
        assert_eq!(result.total_found, 42);
        assert!((result.time - 1.5).abs() < f32::EPSILON);
        assert_eq!(result.words["hello"], WordStats { docs: 12, hits: 30 });

        match &result.matches {
            Matches::Indexed(list) => {
                assert_eq!(list.len(), 2);
                assert_eq!(list[0].id, 5);
                assert_eq!(list[1].weight, 101);
                assert_eq!(list[0].attrs["group_id"], vec![AttrValue::Int(7)]);
                assert_eq!(list[0].attrs["score"], vec![AttrValue::Float(0.5)]);
            }
            other => panic!("expected indexed matches, got {:?}", other),
        }
    }

    #[test]
    fn decodes_64_bit_ids_keyed_by_id() {
        let big = (1u64 << 40) + 3;
        let mut payload = BytesMut::new();
        payload.put_u32(SEARCHD_OK);
        put_body(&mut payload, &[big, 2, big], true);

        let results = decode_results(&payload, 1, false).unwrap();
        match &results[0].matches {
            Matches::ById(map) => {
                assert_eq!(map.len(), 2);
                // Later duplicate overwrites the earlier one.
                assert_eq!(map[&big].weight, 102);
                assert_eq!(map[&2].weight, 101);
            }
            other => panic!("expected id-keyed matches, got {:?}", other),
        }
    }

    #[test]
    fn warning_keeps_full_body() {
        let mut payload = BytesMut::new();
        payload.put_u32(SEARCHD_WARNING);
        put_str(&mut payload, "index is stale");
        put_body(&mut payload, &[1, 2, 3], false);

        let results = decode_results(&payload, 1, true).unwrap();
        let result = &results[0];
        assert_eq!(result.warning.as_deref(), Some("index is stale"));
        assert!(result.error.is_none());
        assert_eq!(result.matches.len(), 3);
        assert_eq!(result.total_found, 42);
    }

    #[test]
    fn error_ends_only_its_own_result() {
        let mut payload = BytesMut::new();
        payload.put_u32(1);
        put_str(&mut payload, "unknown index");
        payload.put_u32(SEARCHD_OK);
        put_body(&mut payload, &[8], false);

        let results = decode_results(&payload, 2, true).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].error.as_deref(), Some("unknown index"));
        assert!(results[0].matches.is_empty());
        assert!(results[0].fields.is_empty());
        assert_eq!(results[1].matches.len(), 1);
        assert!(results[1].error.is_none());
    }

    #[test]
    fn multi_value_attribute_consumes_count_plus_values() {
        let mut data = BytesMut::new();
        data.put_u32(3);
        data.put_u32(10);
        data.put_u32(20);
        data.put_u32(30);
        data.put_u32(0xdead);

        let mut reader = WireReader::new(&data);
        let kind = AttrType(SPH_ATTR_MULTI | SPH_ATTR_INTEGER);
        let values = read_attr_values(&mut reader, kind).unwrap();
        assert_eq!(
            values,
            vec![AttrValue::Int(10), AttrValue::Int(20), AttrValue::Int(30)]
        );
        assert_eq!(reader.position(), 4 + 3 * 4);
    }

    #[test]
    fn multi_value_attribute_in_match() {
        let mut payload = BytesMut::new();
        payload.put_u32(SEARCHD_OK);
        payload.put_u32(0);
        payload.put_u32(1);
        put_str(&mut payload, "tags");
        payload.put_u32(SPH_ATTR_MULTI | SPH_ATTR_INTEGER);
        payload.put_u32(1);
        payload.put_u32(0);
        payload.put_u32(77);
        payload.put_u32(1);
        payload.put_u32(2);
        payload.put_u32(4);
        payload.put_u32(6);
        payload.put_u32(1);
        payload.put_u32(1);
        payload.put_u32(0);
        payload.put_u32(0);

        let results = decode_results(&payload, 1, false).unwrap();
        let m = results[0].matches.iter().next().unwrap();
        assert_eq!(m.id, 77);
        assert_eq!(m.attrs["tags"], vec![AttrValue::Int(4), AttrValue::Int(6)]);
        assert_eq!(results[0].total, 1);
    }

    #[test]
    fn truncated_match_is_malformed() {
        let mut payload = BytesMut::new();
        payload.put_u32(SEARCHD_OK);
        put_body(&mut payload, &[1, 2], false);
        // Stats tail is 33 bytes; cutting 41 lands inside the second match.
        let cut = &payload[..payload.len() - 41];

        assert!(matches!(
            decode_results(cut, 1, true),
            Err(SphinxError::Malformed { .. })
        ));
    }

    #[test]
    fn stops_when_payload_is_exhausted() {
        let mut payload = BytesMut::new();
        payload.put_u32(SEARCHD_OK);
        put_body(&mut payload, &[1], false);

        let results = decode_results(&payload, 3, true).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn frame_warning_is_stripped() {
        let mut payload = BytesMut::new();
        put_str(&mut payload, "slow");
        payload.put_u32(SEARCHD_OK);

        let frame = frame(3, VER_COMMAND_SEARCH, &payload);
        let (warning, rest) = check_frame(&frame).unwrap();
        assert_eq!(warning.as_deref(), Some("slow"));
        assert_eq!(rest, &[0, 0, 0, 0]);
    }

    #[test]
    fn frame_error_and_retry_fail() {
        let mut payload = BytesMut::new();
        put_str(&mut payload, "maxed out");

        for status in [1u16, 2] {
            match check_frame(&frame(status, VER_COMMAND_SEARCH, &payload)) {
                Err(SphinxError::Daemon { status: got, message }) => {
                    assert_eq!(got, u32::from(status));
                    assert_eq!(message, "maxed out");
                }
                other => panic!("expected daemon error, got {:?}", other),
            }
        }

        let err = check_frame(&frame(2, VER_COMMAND_SEARCH, &payload)).unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            check_frame(&frame(9, VER_COMMAND_SEARCH, &[])),
            Err(SphinxError::Daemon { status: 9, .. })
        ));
    }

    #[test]
    fn old_command_version_is_rejected() {
        match check_frame(&frame(0, 0x0112, &[])) {
            Err(SphinxError::CommandVersion { daemon, client }) => {
                assert_eq!(daemon, 0x0112);
                assert_eq!(client, VER_COMMAND_SEARCH);
            }
            other => panic!("expected command version error, got {:?}", other),
        }
        assert!(check_frame(&frame(0, 0x0114, &[])).is_ok());
    }
}
