// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// Each module represents a well-defined responsibility:
//
// - config:    Configuration structs loaded from JSON
// - table:     Row-oriented table exchanged with rules
// - dataset:   Named tables, including the `user` table
// - schema:    Normalized candidate and output types
// - rules:     Rule / filter traits and the config registry
// - collector: Exclusion, normalization, merge and compression
// - pipeline:  File-driven runner (load, collect, write)
// - metrics:   Process-wide counters
// - util:      Key encoding and gzip-aware I/O helpers
//
pub mod config;
pub mod table;
pub mod dataset;
pub mod schema;
pub mod rules;
pub mod collector;
pub mod pipeline;
pub mod metrics;
pub mod error;
pub mod util;

pub use collector::{CollectOptions, RuleCollector};
pub use dataset::Dataset;
pub use error::CollectError;
pub use rules::rule::{FilterRule, RetrieveRule, RuleKind};
pub use schema::{Candidate, CandidateTable, CollectOutput, CompressedRow};
pub use table::{Record, Table, TableError};
