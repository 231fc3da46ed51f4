use crate::QaItem;

/// Maximum number of exchanges kept in the history.
pub const HISTORY_LIMIT: usize = 10;

/// Question/answer history, newest first, never longer than [`HISTORY_LIMIT`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct History {
    items: Vec<QaItem>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from persisted items that are already newest first.
    pub fn from_items(mut items: Vec<QaItem>) -> Self {
        items.truncate(HISTORY_LIMIT);
        Self { items }
    }

    pub fn record(&mut self, item: QaItem) {
        self.items.insert(0, item);
        self.items.truncate(HISTORY_LIMIT);
    }

    pub fn items(&self) -> &[QaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
