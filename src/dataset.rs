//! Dataset handle consumed by the collector.
//!
//! A dataset is a set of named tables. The collector itself only ever
//! reads the `user` table (cohort attributes keyed by `customer_id`);
//! other tables are available to rules and filters built by the runner.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use crate::config::DatasetConfig;
use crate::table::Table;
use crate::util;

pub const USER_TABLE: &str = "user";
pub const CUSTOMER_ID: &str = "customer_id";

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset has no `{name}` table")]
    MissingTable { name: String },
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    tables: HashMap<String, Table>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for tests and programmatic callers.
    pub fn with_table(mut self, name: impl Into<String>, table: Table) -> Self {
        self.insert(name, table);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), table);
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table(&self, name: &str) -> Result<&Table, DatasetError> {
        self.tables
            .get(name)
            .ok_or_else(|| DatasetError::MissingTable { name: name.to_string() })
    }

    pub fn user(&self) -> Result<&Table, DatasetError> {
        self.table(USER_TABLE)
    }

    /// Load every table listed in the dataset configuration.
    pub fn load(cfg: &DatasetConfig) -> anyhow::Result<Self> {
        let mut dataset = Self::new();

        for (name, path) in &cfg.tables {
            let table = load_table(path)
                .with_context(|| format!("failed to load table `{name}`"))?;
            log::info!("loaded table `{}` ({} rows) from {}", name, table.len(), path.display());
            dataset.insert(name.clone(), table);
        }

        Ok(dataset)
    }
}

/// Load a single table file.
///
/// FORMATS:
/// - `.json`            JSON array of objects
/// - `.jsonl`/`.ndjson` one object per line
/// - any of the above with a trailing `.gz`
pub fn load_table(path: &Path) -> anyhow::Result<Table> {
    let reader = util::open_reader(path)?;

    let table = match util::payload_extension(path).as_deref() {
        Some("json") => Table::from_json_reader(reader)?,
        Some("jsonl") | Some("ndjson") => Table::from_json_lines(reader)?,
        other => anyhow::bail!(
            "unsupported table format {:?} for {}",
            other.unwrap_or(""),
            path.display()
        ),
    };

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn user_table_must_exist() {
        let ds = Dataset::new();
        assert!(matches!(ds.user(), Err(DatasetError::MissingTable { .. })));
        let ds = ds.with_table(USER_TABLE, Table::default());
        assert!(ds.user().is_ok());
    }

    #[test]
    fn loads_json_lines_and_gzip_json() {
        let dir = tempfile::tempdir().unwrap();

        let jsonl = dir.path().join("user.jsonl");
        std::fs::write(&jsonl, "{\"customer_id\":\"u1\"}\n{\"customer_id\":\"u2\"}\n").unwrap();
        assert_eq!(load_table(&jsonl).unwrap().len(), 2);

        let gz = dir.path().join("items.json.gz");
        util::with_writer(&gz, |w| {
            w.write_all(br#"[{"article_id":1}]"#)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(load_table(&gz).unwrap().len(), 1);
    }

    #[test]
    fn rejects_unknown_formats() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("user.csv");
        std::fs::write(&csv, "customer_id\nu1\n").unwrap();
        assert!(load_table(&csv).is_err());
    }
}
