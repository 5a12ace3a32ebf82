use serde::Serialize;

/// One page of a listing plus the counts a client needs to page through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub total_docs: u64,
    pub total_page: u64,
    pub current_page: u64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total_docs: u64, current_page: u64, limit: u64) -> Self {
        Self {
            total_docs,
            total_page: total_docs.div_ceil(limit.max(1)),
            current_page,
            data,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total_docs: self.total_docs,
            total_page: self.total_page,
            current_page: self.current_page,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}
