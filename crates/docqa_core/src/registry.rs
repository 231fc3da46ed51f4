use std::collections::BTreeSet;

use crate::RemoteDocument;

/// Cached registry listing plus the user's document filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryState {
    documents: Vec<RemoteDocument>,
    loading: bool,
    error: Option<String>,
    selected: Vec<String>,
    deleting: BTreeSet<String>,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[RemoteDocument] {
        &self.documents
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, filename: &str) -> bool {
        self.selected.iter().any(|name| name == filename)
    }

    pub fn is_deleting(&self, filename: &str) -> bool {
        self.deleting.contains(filename)
    }

    /// Flips selection of `filename`; returns whether it is now selected.
    pub fn toggle_selected(&mut self, filename: &str) -> bool {
        if self.is_selected(filename) {
            self.deselect(filename);
            false
        } else {
            self.selected.push(filename.to_string());
            true
        }
    }

    pub fn deselect(&mut self, filename: &str) {
        self.selected.retain(|name| name != filename);
    }

    pub fn begin_fetch(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Replaces the cache on success; on failure keeps the stale listing.
    pub fn finish_fetch(&mut self, result: Result<Vec<RemoteDocument>, String>) {
        self.loading = false;
        match result {
            Ok(documents) => {
                self.selected
                    .retain(|name| documents.iter().any(|doc| &doc.filename == name));
                self.documents = documents;
            }
            Err(message) => self.error = Some(message),
        }
    }

    /// Returns false when a delete for `filename` is already outstanding.
    pub fn begin_delete(&mut self, filename: &str) -> bool {
        self.deleting.insert(filename.to_string())
    }

    pub fn finish_delete(&mut self, filename: &str, deleted: bool) {
        self.deleting.remove(filename);
        if deleted {
            self.deselect(filename);
        }
    }
}
