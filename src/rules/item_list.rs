use serde_json::Value;

use super::rule::FilterRule;
use super::table_rule::TableSource;

/// Filter excluding a fixed list of items.
///
/// Items come either inline from the configuration or from one column
/// of a table (e.g. out-of-stock articles exported by another job).
pub struct ItemListFilter {
    name: String,
    items: ItemSource,
}

pub enum ItemSource {
    Inline(Vec<Value>),
    Column { source: TableSource, column: String },
}

impl ItemListFilter {
    pub fn new(name: impl Into<String>, items: ItemSource) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }
}

impl FilterRule for ItemListFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn retrieve(&self) -> anyhow::Result<Vec<Value>> {
        match &self.items {
            ItemSource::Inline(items) => Ok(items.clone()),
            ItemSource::Column { source, column } => {
                let table = source.load()?;
                let items = (0..table.len())
                    .map(|row| table.cell(row, column).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            }
        }
    }
}
