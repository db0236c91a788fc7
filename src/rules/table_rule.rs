use std::path::PathBuf;

use anyhow::Context;

use crate::dataset;
use crate::table::Table;

use super::rule::{RetrieveRule, RuleKind};

/// Where a rule's or filter's rows come from.
///
/// File sources are read lazily on `retrieve()`, so building and
/// validating rules never touches the filesystem.
#[derive(Debug, Clone)]
pub enum TableSource {
    /// Table file loaded on demand
    File(PathBuf),

    /// Table already held by the dataset
    Loaded(Table),
}

impl TableSource {
    pub fn load(&self) -> anyhow::Result<Table> {
        match self {
            TableSource::File(path) => dataset::load_table(path)
                .with_context(|| format!("failed to read {}", path.display())),
            TableSource::Loaded(table) => Ok(table.clone()),
        }
    }
}

/// Rule serving precomputed candidates from a table.
///
/// This is the bridge for candidates produced by offline jobs
/// (popularity counts, purchase history, cohort top-k, ...): the job
/// writes a table, the rule hands it to the collector unchanged.
///
/// DESIGN PRINCIPLES:
/// - No candidate selection logic
/// - No filtering
/// - The declared kind tells the collector how to join the rows
pub struct TableRule {
    name: String,
    kind: RuleKind,
    source: TableSource,
}

impl TableRule {
    pub fn new(name: impl Into<String>, kind: RuleKind, source: TableSource) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
        }
    }
}

impl RetrieveRule for TableRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> RuleKind {
        self.kind.clone()
    }

    fn retrieve(&self) -> anyhow::Result<Table> {
        self.source.load()
    }
}
