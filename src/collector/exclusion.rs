use std::collections::HashSet;

use crate::error::CollectError;
use crate::metrics::{METRICS, RuntimeMetrics};
use crate::rules::rule::FilterRule;
use crate::util;

/// Union the items named by every filter into one exclusion set.
///
/// Keys are canonical cell encodings (see `util::cell_key`).
/// No filters yield an empty set.
pub fn build_exclusion_set(filters: &[Box<dyn FilterRule>]) -> Result<HashSet<String>, CollectError> {
    let mut excluded = HashSet::new();

    for filter in filters {
        let items = filter.retrieve().map_err(|source| CollectError::Retrieve {
            name: filter.name().to_string(),
            source,
        })?;

        log::debug!("filter `{}` excludes {} items", filter.name(), items.len());
        excluded.extend(items.iter().map(util::cell_key));
        RuntimeMetrics::add(&METRICS.filters_evaluated, 1);
    }

    RuntimeMetrics::add(&METRICS.items_excluded, excluded.len());
    Ok(excluded)
}
