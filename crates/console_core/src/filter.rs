use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared::domain::{CarrierRecord, NumericField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
}

impl CompareOp {
    fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Ge => lhs >= rhs,
        }
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(CompareOp::Eq),
            "<" => Ok(CompareOp::Lt),
            ">" => Ok(CompareOp::Gt),
            "<=" => Ok(CompareOp::Le),
            ">=" => Ok(CompareOp::Ge),
            other => Err(format!("unknown comparison operator '{other}'")),
        }
    }
}

/// One numeric predicate as the UI holds it: the threshold stays raw text so
/// that an unparsable or empty value neutralizes the predicate instead of
/// erroring out of the whole filter pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericFilter {
    pub op: CompareOp,
    pub value: String,
}

impl NumericFilter {
    pub fn new(op: CompareOp, value: impl Into<String>) -> Self {
        Self {
            op,
            value: value.into(),
        }
    }

    /// Unparsable threshold: predicate passes everything. Unparsable record
    /// field: record fails the predicate.
    fn keeps(&self, record: &CarrierRecord, field: NumericField) -> bool {
        let Ok(threshold) = self.value.trim().parse::<i64>() else {
            return true;
        };
        match record.numeric_value(field).trim().parse::<i64>() {
            Ok(actual) => self.op.holds(actual, threshold),
            Err(_) => false,
        }
    }
}

/// The whole predicate set. Empty set is the identity filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    /// Accepted states, OR semantics; empty means "any state".
    pub states: Vec<String>,
    /// Per-field numeric predicates, ANDed together.
    pub numeric: Vec<(NumericField, NumericFilter)>,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.numeric.is_empty()
    }

    fn keeps(&self, record: &CarrierRecord) -> bool {
        if !self.states.is_empty() && !self.states.iter().any(|s| s == &record.state) {
            return false;
        }
        self.numeric
            .iter()
            .all(|(field, filter)| filter.keeps(record, *field))
    }
}

/// Pure, stable, non-reordering evaluation of the predicate set.
pub fn apply(records: &[CarrierRecord], filters: &FilterSet) -> Vec<CarrierRecord> {
    records
        .iter()
        .filter(|record| filters.keeps(record))
        .cloned()
        .collect()
}

/// Sorted unique non-empty states, for populating a state picker.
pub fn distinct_states(records: &[CarrierRecord]) -> Vec<String> {
    let mut states: Vec<String> = records
        .iter()
        .map(|r| r.state.clone())
        .filter(|s| !s.is_empty())
        .collect();
    states.sort();
    states.dedup();
    states
}
