use serde::{Deserialize, Serialize};

/// One page of a list endpoint, normalized from whatever shape the server sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Whether a later page exists.
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn next_page(&self) -> Option<u32> {
        self.has_more().then(|| self.page + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
