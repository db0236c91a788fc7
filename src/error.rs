use crate::dataset::DatasetError;
use crate::table::TableError;

/// Errors raised by the candidate collector.
///
/// Validation failures (`UnsupportedStrategy`, `UnsupportedFilter`,
/// `MissingTable`) are raised before any rule or filter is evaluated.
/// Everything else aborts the run with no partial output.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("unsupported strategy #{index} `{name}`: {reason}")]
    UnsupportedStrategy {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("unsupported filter #{index} `{name}`: {reason}")]
    UnsupportedFilter {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("retrieval failed for `{name}`: {source}")]
    Retrieve {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Table(#[from] TableError),
}

impl CollectError {
    pub(crate) fn unsupported_strategy(index: usize, name: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedStrategy {
            index,
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported_filter(index: usize, name: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedFilter {
            index,
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
