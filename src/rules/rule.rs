use serde_json::Value;

use crate::dataset::CUSTOMER_ID;
use crate::table::Table;

/// Logical shape of a rule's output.
///
/// The collector dispatches on this with a single exhaustive `match`,
/// so adding a variant forces every consumer to handle it.
///
/// OUTPUT COLUMNS (besides the item column, `score` and `method`):
/// - `Personal`:  `customer_id`
/// - `Global`:    none, rows are broadcast to every target customer
/// - `UserGroup`: every column in `cat_cols`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// One row per (customer, item)
    Personal,

    /// One row per item, shared by all customers
    Global,

    /// One row per (cohort, item); cohorts are keyed by `cat_cols`
    UserGroup { cat_cols: Vec<String> },
}

impl RuleKind {
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::Personal => "personal",
            RuleKind::Global => "global",
            RuleKind::UserGroup { .. } => "user_group",
        }
    }

    /// Structural check run before any rule is evaluated.
    ///
    /// Returns the reason a kind cannot be handled by the collector.
    pub fn validate(&self) -> Result<(), String> {
        let RuleKind::UserGroup { cat_cols } = self else {
            return Ok(());
        };

        if cat_cols.is_empty() {
            return Err("user_group rule needs at least one cat_cols entry".into());
        }

        for (idx, col) in cat_cols.iter().enumerate() {
            if col == CUSTOMER_ID {
                return Err(format!("`{CUSTOMER_ID}` cannot be a cohort column"));
            }
            if cat_cols[..idx].contains(col) {
                return Err(format!("duplicate cohort column `{col}`"));
            }
        }

        Ok(())
    }

    pub fn needs_user_table(&self) -> bool {
        matches!(self, RuleKind::UserGroup { .. })
    }
}

/// A retrieval rule proposes candidate items.
///
/// Implementations decide *which* items to propose; the collector
/// decides how their output is joined to customers.
///
/// CONTRACT:
/// - `kind()` must be stable for the lifetime of the rule
/// - `retrieve()` returns rows carrying the item column, `score`,
///   `method` and the kind-specific columns listed on `RuleKind`
pub trait RetrieveRule {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    fn kind(&self) -> RuleKind;

    fn retrieve(&self) -> anyhow::Result<Table>;
}

/// A filter names items that must never be proposed.
pub trait FilterRule {
    fn name(&self) -> &str;

    /// Item ids to exclude, compared against the item column.
    fn retrieve(&self) -> anyhow::Result<Vec<Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(cols: &[&str]) -> RuleKind {
        RuleKind::UserGroup {
            cat_cols: cols.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn personal_and_global_are_always_valid() {
        assert!(RuleKind::Personal.validate().is_ok());
        assert!(RuleKind::Global.validate().is_ok());
    }

    #[test]
    fn user_group_needs_distinct_cohort_columns() {
        assert!(group(&["age_band", "club_member_status"]).validate().is_ok());
        assert!(group(&[]).validate().is_err());
        assert!(group(&["age_band", "age_band"]).validate().is_err());
        assert!(group(&["customer_id"]).validate().is_err());
    }

    #[test]
    fn labels_match_registry_keys() {
        assert_eq!(RuleKind::Personal.label(), "personal");
        assert_eq!(RuleKind::Global.label(), "global");
        assert_eq!(group(&["x"]).label(), "user_group");
    }
}
