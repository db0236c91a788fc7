use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dataset::CUSTOMER_ID;

/// Output of a collector run.
///
/// - `Flat`: every normalized candidate row, in strategy order
/// - `Compressed`: one row per target customer, in target order
///
/// DESIGN NOTES:
/// - The item column name is not part of the type; it is applied when
///   rendering records (see `to_records`), so the same output can be
///   written as `article_id`, `product_code`, etc.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectOutput {
    Flat(CandidateTable),
    Compressed(Vec<CompressedRow>),
}

impl CollectOutput {
    pub fn len(&self) -> usize {
        match self {
            CollectOutput::Flat(table) => table.len(),
            CollectOutput::Compressed(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_flat(&self) -> Option<&CandidateTable> {
        match self {
            CollectOutput::Flat(table) => Some(table),
            CollectOutput::Compressed(_) => None,
        }
    }

    pub fn as_compressed(&self) -> Option<&[CompressedRow]> {
        match self {
            CollectOutput::Flat(_) => None,
            CollectOutput::Compressed(rows) => Some(rows),
        }
    }

    /// Render rows as JSON objects keyed by column name.
    ///
    /// Flat:       { customer_id, <item_id>, score, method }
    /// Compressed: { customer_id, <item_id>: [..] }
    pub fn to_records(&self, item_id: &str) -> Vec<Value> {
        match self {
            CollectOutput::Flat(table) => table
                .rows()
                .iter()
                .map(|c| c.to_record(item_id))
                .collect(),
            CollectOutput::Compressed(rows) => rows
                .iter()
                .map(|r| r.to_record(item_id))
                .collect(),
        }
    }
}

// ------------------------------------------------------------
// Candidate row
// ------------------------------------------------------------
//
// Normalized shape shared by every retrieval rule.
//
// `item_id`, `score` and `method` are null only for cohort rules
// whose cohort matched no item rows.
//
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub customer_id: Value,
    pub item_id: Option<Value>,
    pub score: Option<f64>,
    pub method: Option<String>,
}

impl Candidate {
    /// A left-join miss: the customer is known, no item was found.
    pub fn unmatched(customer_id: Value) -> Self {
        Self {
            customer_id,
            item_id: None,
            score: None,
            method: None,
        }
    }

    pub fn is_unmatched(&self) -> bool {
        self.item_id.is_none()
    }

    pub fn to_record(&self, item_id: &str) -> Value {
        let mut record = Map::with_capacity(4);
        record.insert(CUSTOMER_ID.to_string(), self.customer_id.clone());
        record.insert(
            item_id.to_string(),
            self.item_id.clone().unwrap_or(Value::Null),
        );
        record.insert("score".to_string(), self.score.into());
        record.insert(
            "method".to_string(),
            self.method.clone().map_or(Value::Null, Value::String),
        );
        Value::Object(record)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateTable {
    rows: Vec<Candidate>,
}

impl CandidateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, candidate: Candidate) {
        self.rows.push(candidate);
    }

    /// Append all rows of `other`, keeping their order.
    pub fn append(&mut self, other: CandidateTable) {
        self.rows.extend(other.rows);
    }

    pub fn rows(&self) -> &[Candidate] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn unmatched_count(&self) -> usize {
        self.rows.iter().filter(|c| c.is_unmatched()).count()
    }
}

impl From<Vec<Candidate>> for CandidateTable {
    fn from(rows: Vec<Candidate>) -> Self {
        Self { rows }
    }
}

impl Extend<Candidate> for CandidateTable {
    fn extend<I: IntoIterator<Item = Candidate>>(&mut self, iter: I) {
        self.rows.extend(iter);
    }
}

impl IntoIterator for CandidateTable {
    type Item = Candidate;
    type IntoIter = std::vec::IntoIter<Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

// ------------------------------------------------------------
// Compressed row
// ------------------------------------------------------------
//
// One row per target customer. `items` is never null: customers
// without candidates carry an empty list.
//
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedRow {
    pub customer_id: Value,
    pub items: Vec<Value>,
}

impl CompressedRow {
    pub fn to_record(&self, item_id: &str) -> Value {
        let mut record = Map::with_capacity(2);
        record.insert(CUSTOMER_ID.to_string(), self.customer_id.clone());
        record.insert(item_id.to_string(), Value::Array(self.items.clone()));
        Value::Object(record)
    }
}
