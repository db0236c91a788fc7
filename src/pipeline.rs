//! File-driven runner around the collector.
//!
//! Everything with side effects lives here: loading tables, resolving
//! customers and writing the output file. The collector itself only
//! sees materialized inputs.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::collector::{CollectOptions, RuleCollector};
use crate::config::{Config, CustomersConfig, OutputConfig, OutputFormat};
use crate::dataset::Dataset;
use crate::rules;
use crate::schema::CollectOutput;
use crate::util;

/// Summary of one run, logged once the output is written.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub customers: usize,
    pub rules: usize,
    pub filters: usize,
    pub rows: usize,
    pub empty_customers: usize,
    pub compressed: bool,
    pub elapsed_ms: u128,
    pub output: PathBuf,
}

/// Resolve the target customer list.
///
/// Order is kept as configured (or as stored in the table); the list is
/// not deduplicated.
pub fn resolve_customers(cfg: &CustomersConfig, dataset: &Dataset) -> anyhow::Result<Vec<Value>> {
    match cfg {
        CustomersConfig::List(ids) => Ok(ids.clone()),
        CustomersConfig::Table { table, column } => {
            let t = dataset.table(table)?;
            let ids = (0..t.len())
                .map(|row| t.cell(row, column).cloned())
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("failed to read customers from `{table}.{column}`"))?;
            Ok(ids)
        }
    }
}

/// Run the whole pipeline described by `cfg`.
///
/// ORDER:
/// 1. check rule / filter entries (no I/O)
/// 2. load dataset tables
/// 3. build rules / filters, resolve customers
/// 4. collect
/// 5. write output
pub fn run(cfg: &Config) -> anyhow::Result<(CollectOutput, RunReport)> {
    let started = Instant::now();

    rules::check_rule_configs(&cfg.rules)?;
    rules::check_filter_configs(&cfg.filters)?;

    let dataset = Dataset::load(&cfg.dataset)?;
    let retrieve_rules = rules::build_rules(&cfg.rules, &dataset)?;
    let filter_rules = rules::build_filters(&cfg.filters, &dataset, &cfg.output.item_id)?;
    let customers = resolve_customers(&cfg.customers, &dataset)?;

    log::info!(
        "collecting for {} customers from {} rules ({} filters)",
        customers.len(),
        retrieve_rules.len(),
        filter_rules.len()
    );

    let collector = RuleCollector::new(CollectOptions {
        item_id: cfg.output.item_id.clone(),
        compress: cfg.output.compress,
    });
    let output = collector.collect(&dataset, &customers, &retrieve_rules, Some(filter_rules.as_slice()))?;

    write_output(&output, &cfg.output)?;

    let empty_customers = output
        .as_compressed()
        .map_or(0, |rows| rows.iter().filter(|r| r.items.is_empty()).count());

    let report = RunReport {
        generated_at: Utc::now(),
        customers: customers.len(),
        rules: retrieve_rules.len(),
        filters: filter_rules.len(),
        rows: output.len(),
        empty_customers,
        compressed: cfg.output.compress,
        elapsed_ms: started.elapsed().as_millis(),
        output: cfg.output.path.clone(),
    };

    Ok((output, report))
}

/// Write the collector output as a JSON array or JSON lines.
pub fn write_output(output: &CollectOutput, cfg: &OutputConfig) -> anyhow::Result<()> {
    let records = output.to_records(&cfg.item_id);

    util::with_writer(&cfg.path, |w| {
        match cfg.format {
            OutputFormat::Json => serde_json::to_writer(&mut *w, &records)?,
            OutputFormat::Jsonl => {
                for record in &records {
                    serde_json::to_writer(&mut *w, record)?;
                    w.write_all(b"\n")?;
                }
            }
        }
        Ok(())
    })
    .with_context(|| format!("failed to write output to {}", cfg.path.display()))?;

    log::info!("wrote {} rows to {}", records.len(), cfg.path.display());
    Ok(())
}
