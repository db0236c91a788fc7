use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::Lazy;

/// Global runtime metrics for the collector.
///
/// Purpose:
/// - Track how many rules / filters ran
/// - Track how many rows exclusion removed
/// - Track output volume and empty customers
///
/// Design:
/// - Lock-free (Atomics)
/// - Observational only: nothing reads these to make decisions
#[derive(Default)]
pub struct RuntimeMetrics {
    // Evaluation
    pub rules_evaluated: AtomicUsize,
    pub filters_evaluated: AtomicUsize,

    // Exclusion
    pub items_excluded: AtomicUsize,
    pub rows_excluded: AtomicUsize,

    // Output
    pub candidate_rows: AtomicUsize,
    pub unmatched_rows: AtomicUsize,
    pub empty_customers: AtomicUsize,
}

impl RuntimeMetrics {
    pub fn add(counter: &AtomicUsize, n: usize) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// One-line summary in the `[METRICS] key=value ...` format.
    pub fn summary(&self) -> String {
        format!(
            "[METRICS] rules={} filters={} excluded_items={} excluded_rows={} rows={} unmatched={} empty_customers={}",
            self.rules_evaluated.load(Ordering::Relaxed),
            self.filters_evaluated.load(Ordering::Relaxed),
            self.items_excluded.load(Ordering::Relaxed),
            self.rows_excluded.load(Ordering::Relaxed),
            self.candidate_rows.load(Ordering::Relaxed),
            self.unmatched_rows.load(Ordering::Relaxed),
            self.empty_customers.load(Ordering::Relaxed),
        )
    }
}

/// Global metrics registry (singleton)
pub static METRICS: Lazy<Arc<RuntimeMetrics>> =
    Lazy::new(|| Arc::new(RuntimeMetrics::default()));
