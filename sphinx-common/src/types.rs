//! # Query and Result Type Definitions
//!
//! Core data types for searchd requests and decoded results.
//!
//! ## Design Principles
//!
//! 1. **Validated Construction**: Range filters can only be built through
//!    constructors that enforce `min < max`, so an inverted range never
//!    reaches the encoder.
//!
//! 2. **Order Preservation**: Weight lists and the attribute schema are plain
//!    vectors. Wire order is significant for both.
//!
//! 3. **Tagged Match Collections**: A result is keyed either by position or by
//!    document id, never a loose mix of both (`Matches`).
//!
//! 4. **Serializable Results**: Result types derive `Serialize` so callers can
//!    dump them without an adapter layer.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{SphinxError, SphinxResult};
use crate::protocol::{
    SPH_ATTR_FLOAT, SPH_ATTR_MULTI, SPH_FILTER_FLOATRANGE, SPH_FILTER_RANGE, SPH_FILTER_VALUES,
};

// ============================================================================
// REQUEST-SIDE TYPES
// ============================================================================

/// Attribute filter attached to a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Keep (or exclude) documents whose attribute is one of `values`.
    Values {
        attr: String,
        values: Vec<i64>,
        exclude: bool,
    },
    /// Integer range, `min < max`.
    Range {
        attr: String,
        min: u32,
        max: u32,
        exclude: bool,
    },
    /// Float range, `min < max`.
    FloatRange {
        attr: String,
        min: f32,
        max: f32,
        exclude: bool,
    },
}

impl Filter {
    /// Builds a values-set filter.
    pub fn values(attr: impl Into<String>, values: Vec<i64>, exclude: bool) -> Self {
        Filter::Values {
            attr: attr.into(),
            values,
            exclude,
        }
    }

    /// Builds an integer range filter.
    ///
    /// # Errors
    /// Returns `SphinxError::InvalidParameter` when `min >= max`.
    pub fn range(attr: impl Into<String>, min: u32, max: u32, exclude: bool) -> SphinxResult<Self> {
        if min >= max {
            return Err(SphinxError::invalid(
                "filter_range",
                format!("[{} >= {}]", min, max),
            ));
        }
        Ok(Filter::Range {
            attr: attr.into(),
            min,
            max,
            exclude,
        })
    }

    /// Builds a float range filter.
    ///
    /// # Errors
    /// Returns `SphinxError::InvalidParameter` when `min >= max` or either
    /// bound is NaN.
    pub fn float_range(
        attr: impl Into<String>,
        min: f32,
        max: f32,
        exclude: bool,
    ) -> SphinxResult<Self> {
        // `!(min < max)` also rejects NaN bounds.
        if !(min < max) {
            return Err(SphinxError::invalid(
                "filter_float_range",
                format!("[{} >= {}]", min, max),
            ));
        }
        Ok(Filter::FloatRange {
            attr: attr.into(),
            min,
            max,
            exclude,
        })
    }

    /// Wire code of the filter kind.
    pub const fn kind(&self) -> u32 {
        match self {
            Filter::Values { .. } => SPH_FILTER_VALUES,
            Filter::Range { .. } => SPH_FILTER_RANGE,
            Filter::FloatRange { .. } => SPH_FILTER_FLOATRANGE,
        }
    }

    pub fn attr(&self) -> &str {
        match self {
            Filter::Values { attr, .. }
            | Filter::Range { attr, .. }
            | Filter::FloatRange { attr, .. } => attr,
        }
    }

    pub const fn exclude(&self) -> bool {
        match self {
            Filter::Values { exclude, .. }
            | Filter::Range { exclude, .. }
            | Filter::FloatRange { exclude, .. } => *exclude,
        }
    }

    /// Re-checks the range invariant on a filter built by hand.
    pub fn validate(&self) -> SphinxResult<()> {
        match self {
            Filter::Values { .. } => Ok(()),
            Filter::Range {
                attr,
                min,
                max,
                exclude,
            } => Filter::range(attr.as_str(), *min, *max, *exclude).map(|_| ()),
            Filter::FloatRange {
                attr,
                min,
                max,
                exclude,
            } => Filter::float_range(attr.as_str(), *min, *max, *exclude).map(|_| ()),
        }
    }
}

/// Per-index weight multiplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexWeight {
    pub index: String,
    pub weight: i32,
}

impl IndexWeight {
    pub fn new(index: impl Into<String>, weight: i32) -> Self {
        IndexWeight {
            index: index.into(),
            weight,
        }
    }
}

/// Per-field weight multiplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWeight {
    pub field: String,
    pub weight: i32,
}

impl FieldWeight {
    pub fn new(field: impl Into<String>, weight: i32) -> Self {
        FieldWeight {
            field: field.into(),
            weight,
        }
    }
}

// ============================================================================
// RESULT-SIDE TYPES
// ============================================================================

/// Raw attribute type code as declared in a result schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AttrType(pub u32);

impl AttrType {
    /// Float attributes carry one raw 32-bit float per match.
    #[inline]
    pub const fn is_float(self) -> bool {
        self.0 == SPH_ATTR_FLOAT
    }

    /// Multi-valued attributes carry a count followed by that many words.
    #[inline]
    pub const fn is_multi(self) -> bool {
        self.0 & SPH_ATTR_MULTI != 0
    }
}

/// One entry of a result's attribute schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttrInfo {
    pub name: String,
    pub kind: AttrType,
}

/// Single decoded attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(u32),
    Float(f32),
}

/// One matched document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    /// Document id, widened to 64 bits when the result used 32-bit ids.
    pub id: u64,
    pub weight: u32,
    /// Attribute values; scalar attributes hold a single element.
    pub attrs: BTreeMap<String, Vec<AttrValue>>,
}

/// Match collection of one result, shaped by the array-result setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Matches {
    /// Matches in daemon order.
    Indexed(Vec<Match>),
    /// Matches keyed by document id; a repeated id keeps the last match.
    ById(BTreeMap<u64, Match>),
}

impl Matches {
    pub fn empty(array_result: bool) -> Self {
        if array_result {
            Matches::Indexed(Vec::new())
        } else {
            Matches::ById(BTreeMap::new())
        }
    }

    pub fn insert(&mut self, m: Match) {
        match self {
            Matches::Indexed(list) => list.push(m),
            Matches::ById(map) => {
                map.insert(m.id, m);
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Matches::Indexed(list) => list.len(),
            Matches::ById(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates matches in collection order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Match> + '_> {
        match self {
            Matches::Indexed(list) => Box::new(list.iter()),
            Matches::ById(map) => Box::new(map.values()),
        }
    }
}

/// Per-keyword statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WordStats {
    pub docs: u32,
    pub hits: u32,
}

/// Decoded result of one query in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Per-result status code as sent by the daemon.
    pub status: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub fields: Vec<String>,
    /// Attribute schema in wire order.
    pub attrs: Vec<AttrInfo>,
    pub matches: Matches,
    pub total: u32,
    pub total_found: u32,
    /// Elapsed query time in seconds.
    pub time: f32,
    pub words: BTreeMap<String, WordStats>,
}

impl QueryResult {
    /// Empty result with the given status, shaped for `array_result`.
    pub fn new(status: u32, array_result: bool) -> Self {
        QueryResult {
            status,
            error: None,
            warning: None,
            fields: Vec::new(),
            attrs: Vec::new(),
            matches: Matches::empty(array_result),
            total: 0,
            total_found: 0,
            time: 0.0,
            words: BTreeMap::new(),
        }
    }

    /// Looks up a schema entry by attribute name.
    pub fn attr_type(&self, name: &str) -> Option<AttrType> {
        self.attrs
            .iter()
            .find(|info| info.name == name)
            .map(|info| info.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_filter_rejects_inverted_bounds() {
        assert!(Filter::range("price", 10, 20, false).is_ok());
        for (min, max) in [(20, 10), (5, 5)] {
            match Filter::range("price", min, max, false) {
                Err(SphinxError::InvalidParameter { param, .. }) => {
                    assert_eq!(param, "filter_range")
                }
                other => panic!("expected invalid parameter, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_float_range_filter_rejects_inverted_and_nan() {
        assert!(Filter::float_range("lat", -1.0, 1.0, true).is_ok());
        assert!(Filter::float_range("lat", 1.0, 1.0, false).is_err());
        assert!(Filter::float_range("lat", 2.0, 1.0, false).is_err());
        assert!(Filter::float_range("lat", f32::NAN, 1.0, false).is_err());
    }

    #[test]
    fn test_filter_accessors() {
        let filter = Filter::values("group_id", vec![1, 2], true);
        assert_eq!(filter.kind(), SPH_FILTER_VALUES);
        assert_eq!(filter.attr(), "group_id");
        assert!(filter.exclude());

        let filter = Filter::float_range("score", 0.5, 0.9, false).unwrap();
        assert_eq!(filter.kind(), SPH_FILTER_FLOATRANGE);
        assert!(!filter.exclude());
    }

    #[test]
    fn test_validate_hand_built_filter() {
        let bad = Filter::Range {
            attr: "x".to_string(),
            min: 9,
            max: 3,
            exclude: false,
        };
        assert!(bad.validate().is_err());
        assert!(Filter::values("x", vec![], false).validate().is_ok());
    }

    #[test]
    fn test_attr_type_flags() {
        assert!(AttrType(SPH_ATTR_FLOAT).is_float());
        assert!(!AttrType(SPH_ATTR_FLOAT).is_multi());
        assert!(AttrType(SPH_ATTR_MULTI | 1).is_multi());
        assert!(!AttrType(SPH_ATTR_MULTI | 1).is_float());
        assert!(!AttrType(1).is_multi());
    }

    #[test]
    fn test_matches_by_id_overwrites_duplicates() {
        let mut matches = Matches::empty(false);
        for weight in [1, 2] {
            matches.insert(Match {
                id: 7,
                weight,
                attrs: BTreeMap::new(),
            });
        }
        assert_eq!(matches.len(), 1);
        assert_eq!(matches.iter().next().unwrap().weight, 2);
    }

    #[test]
    fn test_matches_indexed_keeps_order() {
        let mut matches = Matches::empty(true);
        for id in [9, 3, 9] {
            matches.insert(Match {
                id,
                weight: 1,
                attrs: BTreeMap::new(),
            });
        }
        let ids: Vec<u64> = matches.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![9, 3, 9]);
    }

    #[test]
    fn test_query_result_attr_lookup() {
        let mut result = QueryResult::new(0, true);
        result.attrs.push(AttrInfo {
            name: "tags".to_string(),
            kind: AttrType(SPH_ATTR_MULTI | 1),
        });
        assert_eq!(result.attr_type("tags"), Some(AttrType(SPH_ATTR_MULTI | 1)));
        assert_eq!(result.attr_type("missing"), None);
        assert!(result.matches.is_empty());
    }
}
