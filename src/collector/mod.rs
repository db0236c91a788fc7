/// Collector module
///
/// This module groups all logic responsible for:
/// - Building the exclusion set from filters
/// - Normalizing each rule's output into the candidate schema
/// - Merging rules in order and compressing per customer
///
/// The collector layer sits between:
/// - Retrieval rules and filters (input side, see `rules`)
/// - The downstream ranking stage (output side, see `schema`)
///
/// Design notes:
/// - Rule-specific selection logic MUST NOT live here
/// - No deduplication or sorting: ranking happens downstream
/// - No I/O: inputs arrive already materialized
pub mod exclusion;
pub mod normalize;
pub mod compress;
pub mod runner;

pub use runner::{CollectOptions, RuleCollector};
