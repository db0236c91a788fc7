use std::collections::HashSet;
use std::iter;

use serde_json::Value;

use crate::dataset::{CUSTOMER_ID, DatasetError, USER_TABLE};
use crate::error::CollectError;
use crate::rules::rule::{RetrieveRule, RuleKind};
use crate::schema::{Candidate, CandidateTable};
use crate::table::{Table, TableError};
use crate::util;

const SCORE: &str = "score";
const METHOD: &str = "method";

/// Inputs shared by every rule of one collector run.
pub struct NormalizeContext<'a> {
    /// Target customers, in caller order
    pub customers: &'a [Value],

    /// Dataset `user` table; present whenever a cohort rule is configured
    pub user: Option<&'a Table>,

    /// Item id column name in rule tables
    pub item_id: &'a str,
}

/// Result of normalizing one rule.
pub struct Normalized {
    pub candidates: CandidateTable,

    /// Rows dropped by the exclusion set, before any broadcast or join
    pub excluded_rows: usize,
}

/// Retrieve, clean and normalize one rule into the candidate shape.
///
/// STEPS:
/// 1. `retrieve()` the raw table
/// 2. drop rows whose item is excluded
/// 3. join the rows to customers according to `kind`
///
/// `kind` is the value validated up front for this rule.
pub fn normalize(
    rule: &dyn RetrieveRule,
    kind: &RuleKind,
    excluded: &HashSet<String>,
    ctx: &NormalizeContext<'_>,
) -> Result<Normalized, CollectError> {
    let mut items = rule.retrieve().map_err(|source| CollectError::Retrieve {
        name: rule.name().to_string(),
        source,
    })?;

    let excluded_rows = items.retain_not_in(ctx.item_id, excluded)?;

    let candidates = match kind {
        RuleKind::Global => broadcast(&items, ctx.customers, ctx.item_id)?,
        RuleKind::Personal => passthrough(&items, ctx.item_id)?,
        RuleKind::UserGroup { cat_cols } => {
            let user = ctx.user.ok_or_else(|| DatasetError::MissingTable {
                name: USER_TABLE.to_string(),
            })?;
            join_cohorts(&items, user, ctx.customers, cat_cols, ctx.item_id)?
        }
    };

    Ok(Normalized {
        candidates,
        excluded_rows,
    })
}

/// Item-side fields of a candidate row.
#[derive(Clone)]
struct ItemFields {
    item_id: Option<Value>,
    score: Option<f64>,
    method: Option<String>,
}

impl ItemFields {
    fn read(items: &Table, row: usize, item_id: &str) -> Result<Self, TableError> {
        let item = items.cell(row, item_id)?;
        Ok(Self {
            item_id: (!item.is_null()).then(|| item.clone()),
            score: items.number(row, SCORE)?,
            method: items.text(row, METHOD)?,
        })
    }

    fn read_all(items: &Table, item_id: &str) -> Result<Vec<Self>, TableError> {
        (0..items.len())
            .map(|row| Self::read(items, row, item_id))
            .collect()
    }

    fn for_customer(&self, customer_id: &Value) -> Candidate {
        Candidate {
            customer_id: customer_id.clone(),
            item_id: self.item_id.clone(),
            score: self.score,
            method: self.method.clone(),
        }
    }
}

/// Cross join every item row with every customer.
///
/// Customers are repeated `k` times and the item rows tiled `n` times,
/// giving exactly `n * k` rows ordered customer-major.
fn broadcast(items: &Table, customers: &[Value], item_id: &str) -> Result<CandidateTable, TableError> {
    let fields = ItemFields::read_all(items, item_id)?;
    let k = fields.len();

    let repeated = customers.iter().flat_map(|c| iter::repeat_n(c, k));
    let tiled = fields.iter().cycle().take(k * customers.len());

    Ok(repeated
        .zip(tiled)
        .map(|(customer, item)| item.for_customer(customer))
        .collect::<Vec<_>>()
        .into())
}

/// Rows already carry `customer_id`; keep them as they are.
fn passthrough(items: &Table, item_id: &str) -> Result<CandidateTable, TableError> {
    let mut out = CandidateTable::with_capacity(items.len());

    for row in 0..items.len() {
        let customer = items.cell(row, CUSTOMER_ID)?;
        out.push(ItemFields::read(items, row, item_id)?.for_customer(customer));
    }

    Ok(out)
}

/// customers ⟕ user ON customer_id ⟕ items ON cat_cols
///
/// Both joins are left joins with relational multiplicity: a customer
/// listed twice in the user table, or a cohort with several item rows,
/// produces one output row per match. Customers unknown to the user
/// table, or whose cohort has no item rows, produce one unmatched row.
fn join_cohorts(
    items: &Table,
    user: &Table,
    customers: &[Value],
    cat_cols: &[String],
    item_id: &str,
) -> Result<CandidateTable, TableError> {
    let fields = ItemFields::read_all(items, item_id)?;
    let cohorts = items.index_by(cat_cols)?;
    let users = user.index_by(&[CUSTOMER_ID.to_string()])?;

    let mut out = CandidateTable::with_capacity(customers.len());

    for customer in customers {
        let user_rows = util::join_key(&[customer])
            .and_then(|key| users.get(&key))
            .map(Vec::as_slice)
            .unwrap_or_default();

        if user_rows.is_empty() {
            out.push(Candidate::unmatched(customer.clone()));
            continue;
        }

        for &urow in user_rows {
            let attrs = cat_cols
                .iter()
                .map(|c| user.cell(urow, c))
                .collect::<Result<Vec<_>, _>>()?;

            let matched = util::join_key(&attrs).and_then(|key| cohorts.get(&key));

            match matched {
                Some(rows) => {
                    out.extend(rows.iter().map(|&r| fields[r].for_customer(customer)));
                }
                None => out.push(Candidate::unmatched(customer.clone())),
            }
        }
    }

    Ok(out)
}
