use serde_json::Value;

use crate::{
    config::default_item_id,
    dataset::Dataset,
    error::CollectError,
    metrics::{METRICS, RuntimeMetrics},
    rules::rule::{FilterRule, RetrieveRule, RuleKind},
    schema::{CandidateTable, CollectOutput},
};

use super::{
    compress::compress,
    exclusion::build_exclusion_set,
    normalize::{NormalizeContext, normalize},
};

/// Output settings for one collector run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOptions {
    /// Item id column in rule tables (default `article_id`)
    pub item_id: String,

    /// Collapse the result into one item list per customer (default `true`)
    pub compress: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            item_id: default_item_id(),
            compress: true,
        }
    }
}

/// Collects retrieval candidates from a list of rules.
///
/// This type is responsible for:
/// - Validating every rule and filter before any work starts
/// - Building the exclusion set
/// - Normalizing and concatenating rule outputs, in list order
/// - Optionally compressing into one row per customer
///
/// This type does NOT:
/// - Score, rank, sort or deduplicate candidates
/// - Decide which items a rule proposes
///
/// Each call is independent; the collector holds no state between runs.
/// The `METRICS` counters it bumps are process-wide and keep
/// accumulating across calls.
#[derive(Debug, Clone, Default)]
pub struct RuleCollector {
    options: CollectOptions,
}

impl RuleCollector {
    pub fn new(options: CollectOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CollectOptions {
        &self.options
    }

    /// Collect candidates for `customers`.
    ///
    /// FAILURES (all before any `retrieve()` call):
    /// - `UnsupportedStrategy` for a structurally invalid rule
    /// - `UnsupportedFilter` for a structurally invalid filter
    /// - `Dataset` if a cohort rule is present and `user` is missing
    ///
    /// Any later failure aborts the run; there is no partial output.
    pub fn collect(
        &self,
        data: &Dataset,
        customers: &[Value],
        rules: &[Box<dyn RetrieveRule>],
        filters: Option<&[Box<dyn FilterRule>]>,
    ) -> Result<CollectOutput, CollectError> {
        let filters = filters.unwrap_or_default();

        // --------------------------------------------------------
        // Validation: nothing is evaluated until every rule and
        // filter has been checked
        // --------------------------------------------------------
        let kinds = check_rules(rules)?;
        check_filters(filters)?;

        let user = if kinds.iter().any(RuleKind::needs_user_table) {
            Some(data.user()?)
        } else {
            None
        };

        let excluded = build_exclusion_set(filters)?;

        let ctx = NormalizeContext {
            customers,
            user,
            item_id: &self.options.item_id,
        };

        // --------------------------------------------------------
        // Retrieval, in rule order
        // --------------------------------------------------------
        let total = rules.len();
        let mut merged = CandidateTable::new();

        for (idx, (rule, kind)) in rules.iter().zip(&kinds).enumerate() {
            log::info!("[{}/{}] retrieving {} ({})", idx + 1, total, rule.name(), kind.label());

            let normalized = normalize(rule.as_ref(), kind, &excluded, &ctx)?;

            log::debug!(
                "rule `{}`: {} rows, {} excluded, {} unmatched",
                rule.name(),
                normalized.candidates.len(),
                normalized.excluded_rows,
                normalized.candidates.unmatched_count(),
            );

            RuntimeMetrics::add(&METRICS.rules_evaluated, 1);
            RuntimeMetrics::add(&METRICS.rows_excluded, normalized.excluded_rows);
            RuntimeMetrics::add(&METRICS.unmatched_rows, normalized.candidates.unmatched_count());

            merged.append(normalized.candidates);
        }

        RuntimeMetrics::add(&METRICS.candidate_rows, merged.len());

        if !self.options.compress {
            return Ok(CollectOutput::Flat(merged));
        }

        let rows = compress(merged, customers);
        let empty = rows.iter().filter(|r| r.items.is_empty()).count();
        RuntimeMetrics::add(&METRICS.empty_customers, empty);
        if empty > 0 {
            log::debug!("{} of {} customers have no candidates", empty, rows.len());
        }

        Ok(CollectOutput::Compressed(rows))
    }
}

/// Validate every rule and capture its kind for dispatch.
fn check_rules(rules: &[Box<dyn RetrieveRule>]) -> Result<Vec<RuleKind>, CollectError> {
    rules
        .iter()
        .enumerate()
        .map(|(index, rule)| -> Result<RuleKind, CollectError> {
            let kind = rule.kind();
            kind.validate()
                .map_err(|reason| CollectError::unsupported_strategy(index, rule.name(), reason))?;
            Ok(kind)
        })
        .collect()
}

fn check_filters(filters: &[Box<dyn FilterRule>]) -> Result<(), CollectError> {
    for (index, filter) in filters.iter().enumerate() {
        if filter.name().trim().is_empty() {
            return Err(CollectError::unsupported_filter(index, filter.name(), "filter has no name"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Rule {
        name: &'static str,
        kind: RuleKind,
        rows: Vec<Value>,
        calls: Rc<Cell<usize>>,
    }

    impl RetrieveRule for Rule {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> RuleKind {
            self.kind.clone()
        }

        fn retrieve(&self) -> anyhow::Result<Table> {
            self.calls.set(self.calls.get() + 1);
            Ok(Table::from_values(self.rows.clone())?)
        }
    }

    struct Filter {
        name: &'static str,
        items: Vec<Value>,
        calls: Rc<Cell<usize>>,
    }

    impl FilterRule for Filter {
        fn name(&self) -> &str {
            self.name
        }

        fn retrieve(&self) -> anyhow::Result<Vec<Value>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.items.clone())
        }
    }

    fn rule(kind: RuleKind, rows: Vec<Value>, calls: &Rc<Cell<usize>>) -> Box<dyn RetrieveRule> {
        Box::new(Rule {
            name: "rule",
            kind,
            rows,
            calls: calls.clone(),
        })
    }

    fn personal(customer: &str, items: &[&str]) -> Vec<Value> {
        items
            .iter()
            .map(|i| json!({"customer_id": customer, "article_id": i, "score": 1.0, "method": "p"}))
            .collect()
    }

    fn dataset() -> Dataset {
        Dataset::new().with_table(
            "user",
            Table::from_values(vec![
                json!({"customer_id": "u1", "age_band": "young"}),
                json!({"customer_id": "u2", "age_band": "old"}),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn rules_are_merged_in_order() {
        let calls = Rc::new(Cell::new(0));
        let rules = vec![
            rule(RuleKind::Personal, personal("u1", &["i1", "i2"]), &calls),
            rule(RuleKind::Personal, personal("u1", &["i3"]), &calls),
        ];

        let out = RuleCollector::default()
            .collect(&dataset(), &[json!("u1")], &rules, None)
            .unwrap();

        let rows = out.as_compressed().unwrap();
        assert_eq!(rows[0].items, vec![json!("i1"), json!("i2"), json!("i3")]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn flat_output_keeps_duplicates_and_unmatched_rows() {
        let calls = Rc::new(Cell::new(0));
        let rules = vec![
            rule(RuleKind::Personal, personal("u1", &["i1"]), &calls),
            rule(RuleKind::Personal, personal("u1", &["i1"]), &calls),
            rule(
                RuleKind::UserGroup {
                    cat_cols: vec!["age_band".into()],
                },
                vec![json!({"age_band": "young", "article_id": "i7", "score": 1.0, "method": "g"})],
                &calls,
            ),
        ];

        let collector = RuleCollector::new(CollectOptions {
            compress: false,
            ..Default::default()
        });
        let out = collector
            .collect(&dataset(), &[json!("u1"), json!("u2")], &rules, None)
            .unwrap();

        let flat = out.as_flat().unwrap();
        let items: Vec<Option<Value>> = flat.rows().iter().map(|c| c.item_id.clone()).collect();
        assert_eq!(
            items,
            vec![Some(json!("i1")), Some(json!("i1")), Some(json!("i7")), None]
        );
    }

    #[test]
    fn invalid_rule_aborts_before_any_retrieval() {
        let calls = Rc::new(Cell::new(0));
        let filter_calls = Rc::new(Cell::new(0));
        let rules = vec![
            rule(RuleKind::Global, vec![], &calls),
            rule(RuleKind::UserGroup { cat_cols: vec![] }, vec![], &calls),
        ];
        let filters: Vec<Box<dyn FilterRule>> = vec![Box::new(Filter {
            name: "sold_out",
            items: vec![json!("i1")],
            calls: filter_calls.clone(),
        })];

        let err = RuleCollector::default()
            .collect(&dataset(), &[json!("u1")], &rules, Some(filters.as_slice()))
            .unwrap_err();

        assert!(matches!(err, CollectError::UnsupportedStrategy { index: 1, .. }));
        assert_eq!(calls.get(), 0);
        assert_eq!(filter_calls.get(), 0);
    }

    #[test]
    fn invalid_filter_aborts_before_any_retrieval() {
        let calls = Rc::new(Cell::new(0));
        let filter_calls = Rc::new(Cell::new(0));
        let rules = vec![rule(RuleKind::Global, vec![], &calls)];
        let filters: Vec<Box<dyn FilterRule>> = vec![
            Box::new(Filter {
                name: "sold_out",
                items: vec![],
                calls: filter_calls.clone(),
            }),
            Box::new(Filter {
                name: " ",
                items: vec![],
                calls: filter_calls.clone(),
            }),
        ];

        let err = RuleCollector::default()
            .collect(&dataset(), &[json!("u1")], &rules, Some(filters.as_slice()))
            .unwrap_err();

        assert!(matches!(err, CollectError::UnsupportedFilter { index: 1, .. }));
        assert_eq!(calls.get(), 0);
        assert_eq!(filter_calls.get(), 0);
    }

    #[test]
    fn cohort_rule_requires_user_table_up_front() {
        let calls = Rc::new(Cell::new(0));
        let rules = vec![
            rule(RuleKind::Global, vec![], &calls),
            rule(
                RuleKind::UserGroup {
                    cat_cols: vec!["age_band".into()],
                },
                vec![],
                &calls,
            ),
        ];

        let err = RuleCollector::default()
            .collect(&Dataset::new(), &[json!("u1")], &rules, None)
            .unwrap_err();

        assert!(matches!(err, CollectError::Dataset(_)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn excluded_items_never_reach_output() {
        let calls = Rc::new(Cell::new(0));
        let rules = vec![
            rule(RuleKind::Personal, personal("u1", &["i1", "i2"]), &calls),
            rule(
                RuleKind::Global,
                vec![
                    json!({"article_id": "i1", "score": 1.0, "method": "pop"}),
                    json!({"article_id": "i3", "score": 1.0, "method": "pop"}),
                ],
                &calls,
            ),
        ];
        let filters: Vec<Box<dyn FilterRule>> = vec![Box::new(Filter {
            name: "sold_out",
            items: vec![json!("i1")],
            calls: Rc::new(Cell::new(0)),
        })];

        let out = RuleCollector::default()
            .collect(&dataset(), &[json!("u1"), json!("u2")], &rules, Some(filters.as_slice()))
            .unwrap();

        let rows = out.as_compressed().unwrap();
        assert_eq!(rows[0].items, vec![json!("i2"), json!("i3")]);
        assert_eq!(rows[1].items, vec![json!("i3")]);
    }

    #[test]
    fn no_rules_yield_empty_lists() {
        let out = RuleCollector::default()
            .collect(&Dataset::new(), &[json!("u1"), json!("u2")], &[], None)
            .unwrap();

        let rows = out.as_compressed().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.items.is_empty()));
    }
}
