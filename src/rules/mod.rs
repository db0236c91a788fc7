//! Retrieval rule and filter registry
//!
//! This module provides:
//! - The `RetrieveRule` / `FilterRule` traits the collector consumes
//! - Table-backed implementations of both
//! - Factory functions resolving config entries by `type`
//!
//! The collector only ever interacts with the traits; concrete rule
//! types stay private to this module tree.

pub mod rule;
pub mod table_rule;
pub mod item_list;

use crate::config::{FilterConfig, RuleConfig};
use crate::dataset::Dataset;
use crate::error::CollectError;

use item_list::{ItemListFilter, ItemSource};
use rule::{FilterRule, RetrieveRule, RuleKind};
use table_rule::{TableRule, TableSource};

pub const RULE_TYPES: [&str; 3] = ["personal", "global", "user_group"];
pub const FILTER_TYPES: [&str; 1] = ["item_list"];

const RULE_SOURCE: &str = "rule needs exactly one of `path` or `table`";
const FILTER_SOURCE: &str = "item_list filter needs exactly one of `items`, `path` or `table`";

/// Resolve the declared kind of a rule config entry.
///
/// RETURNS:
/// - `Some(RuleKind)` if `type` is a registered rule type
/// - `None` otherwise
pub fn rule_kind(cfg: &RuleConfig) -> Option<RuleKind> {
    match cfg.kind.as_str() {
        "personal" => Some(RuleKind::Personal),
        "global" => Some(RuleKind::Global),
        "user_group" => Some(RuleKind::UserGroup {
            cat_cols: cfg.cat_cols.clone(),
        }),
        _ => None,
    }
}

/// Check every rule config entry without touching any data.
///
/// Returns the declared kinds, in order.
pub fn check_rule_configs(cfgs: &[RuleConfig]) -> Result<Vec<RuleKind>, CollectError> {
    let mut kinds = Vec::with_capacity(cfgs.len());

    for (index, cfg) in cfgs.iter().enumerate() {
        let name = cfg.display_name();
        let Some(kind) = rule_kind(cfg) else {
            return Err(CollectError::unsupported_strategy(
                index,
                name,
                format!("unknown rule type `{}` (expected one of {:?})", cfg.kind, RULE_TYPES),
            ));
        };
        kind.validate()
            .map_err(|reason| CollectError::unsupported_strategy(index, name, reason))?;
        if cfg.path.is_some() == cfg.table.is_some() {
            return Err(CollectError::unsupported_strategy(index, name, RULE_SOURCE));
        }
        kinds.push(kind);
    }

    Ok(kinds)
}

/// Build every configured rule, in order.
///
/// All entries are checked before anything is built, so one bad entry
/// rejects the whole list.
pub fn build_rules(
    cfgs: &[RuleConfig],
    dataset: &Dataset,
) -> Result<Vec<Box<dyn RetrieveRule>>, CollectError> {
    let kinds = check_rule_configs(cfgs)?;

    cfgs.iter()
        .zip(kinds)
        .enumerate()
        .map(|(index, (cfg, kind))| -> Result<Box<dyn RetrieveRule>, CollectError> {
            let source = table_source(cfg.path.as_ref(), cfg.table.as_deref(), dataset)?
                .ok_or_else(|| CollectError::unsupported_strategy(index, cfg.display_name(), RULE_SOURCE))?;
            Ok(Box::new(TableRule::new(cfg.display_name(), kind, source)))
        })
        .collect()
}

/// Check every filter config entry without touching any data.
pub fn check_filter_configs(cfgs: &[FilterConfig]) -> Result<(), CollectError> {
    for (index, cfg) in cfgs.iter().enumerate() {
        let name = cfg.display_name();
        if !FILTER_TYPES.contains(&cfg.kind.as_str()) {
            return Err(CollectError::unsupported_filter(
                index,
                name,
                format!("unknown filter type `{}` (expected one of {:?})", cfg.kind, FILTER_TYPES),
            ));
        }
        let sources = [cfg.items.is_some(), cfg.path.is_some(), cfg.table.is_some()];
        if sources.iter().filter(|s| **s).count() != 1 {
            return Err(CollectError::unsupported_filter(index, name, FILTER_SOURCE));
        }
    }

    Ok(())
}

/// Build every configured filter, in order.
///
/// `item_id` is the default column read from table-backed filters.
pub fn build_filters(
    cfgs: &[FilterConfig],
    dataset: &Dataset,
    item_id: &str,
) -> Result<Vec<Box<dyn FilterRule>>, CollectError> {
    check_filter_configs(cfgs)?;

    cfgs.iter()
        .enumerate()
        .map(|(index, cfg)| -> Result<Box<dyn FilterRule>, CollectError> {
            let items = match &cfg.items {
                Some(items) => ItemSource::Inline(items.clone()),
                None => ItemSource::Column {
                    source: table_source(cfg.path.as_ref(), cfg.table.as_deref(), dataset)?
                        .ok_or_else(|| {
                            CollectError::unsupported_filter(index, cfg.display_name(), FILTER_SOURCE)
                        })?,
                    column: cfg.column.clone().unwrap_or_else(|| item_id.to_string()),
                },
            };
            Ok(Box::new(ItemListFilter::new(cfg.display_name(), items)))
        })
        .collect()
}

/// Resolve the table behind a rule or filter entry.
///
/// Returns `None` unless exactly one of `path` / `table` is set.
fn table_source(
    path: Option<&std::path::PathBuf>,
    table: Option<&str>,
    dataset: &Dataset,
) -> Result<Option<TableSource>, CollectError> {
    match (path, table) {
        (Some(path), None) => Ok(Some(TableSource::File(path.clone()))),
        (None, Some(name)) => Ok(Some(TableSource::Loaded(dataset.table(name)?.clone()))),
        _ => Ok(None),
    }
}
