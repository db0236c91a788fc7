use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::dataset::{CUSTOMER_ID, USER_TABLE};

// ------------------------------------------------------------
// Root configuration
// ------------------------------------------------------------
//
// This is the top-level configuration structure loaded from
// `config.json`.
//
// It defines:
// - Dataset tables to load
// - Target customers
// - Retrieval rules and filters, in evaluation order
// - Output settings
// - Optional debug configuration
//
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Tables making up the dataset handle
    pub dataset: DatasetConfig,

    /// Customers to produce candidates for
    pub customers: CustomersConfig,

    /// Retrieval rules, evaluated in list order
    pub rules: Vec<RuleConfig>,

    /// Filters removing items before merging
    #[serde(default)]
    pub filters: Vec<FilterConfig>,

    /// Output settings
    pub output: OutputConfig,

    /// Optional debug configuration
    pub debug: Option<DebugConfig>,
}

// ------------------------------------------------------------
// Dataset configuration
// ------------------------------------------------------------
//
// Maps table names to files. A `user` table is required as soon as
// any `user_group` rule is configured.
//
// Supported formats: .json, .jsonl, .ndjson (optionally .gz).
//
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatasetConfig {
    pub tables: BTreeMap<String, PathBuf>,
}

// ------------------------------------------------------------
// Target customers
// ------------------------------------------------------------
//
// Either an inline list:
//     "customers": ["u1", "u2"]
// or a column of a dataset table:
//     "customers": { "table": "user", "column": "customer_id" }
//
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum CustomersConfig {
    List(Vec<Value>),
    Table {
        #[serde(default = "default_user_table")]
        table: String,
        #[serde(default = "default_customer_column")]
        column: String,
    },
}

// ------------------------------------------------------------
// Rule configuration
// ------------------------------------------------------------
//
// One entry per retrieval rule. `type` selects the implementation
// through the rule registry (see `rules::build_rule`).
//
// Candidate rows come from either:
// - `path`:  a table file loaded for this rule only
// - `table`: a table already present in the dataset
//
#[derive(Debug, Deserialize, Clone)]
pub struct RuleConfig {
    /// Registry key: "personal", "global" or "user_group"
    #[serde(rename = "type")]
    pub kind: String,

    /// Display name used in logs and errors (defaults to `type`)
    pub name: Option<String>,

    pub path: Option<PathBuf>,

    pub table: Option<String>,

    /// Cohort columns, only meaningful for `user_group`
    #[serde(default)]
    pub cat_cols: Vec<String>,
}

impl RuleConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }
}

// ------------------------------------------------------------
// Filter configuration
// ------------------------------------------------------------
//
// `item_list` filters exclude either inline `items` or every value of
// `column` (default: the output item column) in a table file / dataset
// table.
//
#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    #[serde(rename = "type")]
    pub kind: String,

    pub name: Option<String>,

    pub items: Option<Vec<Value>>,

    pub path: Option<PathBuf>,

    pub table: Option<String>,

    pub column: Option<String>,
}

impl FilterConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }
}

// ------------------------------------------------------------
// Output configuration
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Destination file; a trailing `.gz` enables compression
    pub path: PathBuf,

    /// Item id column name in rule tables and in the output
    #[serde(default = "default_item_id")]
    pub item_id: String,

    /// Collapse candidates into one item list per customer
    #[serde(default = "default_compress")]
    pub compress: bool,

    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Single JSON array
    #[default]
    Json,

    /// One JSON object per line
    Jsonl,
}

// ------------------------------------------------------------
// Debug configuration
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    /// Raises the default log level to `debug`
    pub log: Option<bool>,
}

pub fn default_item_id() -> String {
    "article_id".to_string()
}

fn default_compress() -> bool {
    true
}

fn default_user_table() -> String {
    USER_TABLE.to_string()
}

fn default_customer_column() -> String {
    CUSTOMER_ID.to_string()
}
