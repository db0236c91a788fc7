use std::collections::HashMap;

use serde_json::Value;

use crate::schema::{CandidateTable, CompressedRow};
use crate::util;

/// Collapse the flat table into one item list per target customer.
///
/// GUARANTEES:
/// - One output row per entry of `customers`, in the same order
/// - Items keep their row order (rule order, then intra-rule order)
/// - Customers without candidates get an empty list
///
/// Unmatched cohort rows (null item) are dropped before grouping.
/// Rows for customers outside `customers` do not reach the output.
pub fn compress(flat: CandidateTable, customers: &[Value]) -> Vec<CompressedRow> {
    let mut groups: HashMap<String, Vec<Value>> = HashMap::new();

    for candidate in flat {
        let Some(item) = candidate.item_id else {
            continue;
        };
        groups
            .entry(util::cell_key(&candidate.customer_id))
            .or_default()
            .push(item);
    }

    customers
        .iter()
        .map(|customer| CompressedRow {
            customer_id: customer.clone(),
            items: groups
                .get(&util::cell_key(customer))
                .cloned()
                .unwrap_or_default(),
        })
        .collect()
}
