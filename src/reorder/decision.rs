//! Order decision: compare fetched manual order against filename order.

use crate::types::PageRecord;

/// What to do with a folder's pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderDecision {
    /// Nothing to act on. Not a terminal state.
    Empty,
    AlreadyOrdered,
    /// Pages in the sequence they must be reattached.
    Reorder(Vec<PageRecord>),
}

/// Decide whether `pages`, in their fetched order, need reordering.
///
/// Comparison is byte-wise on `original_file_name`, case-sensitive. The
/// target order is a stable sort, so pages with equal names keep their
/// relative fetched order.
pub fn decide(pages: &[PageRecord]) -> OrderDecision {
    if pages.is_empty() {
        return OrderDecision::Empty;
    }

    let sorted = pages
        .windows(2)
        .all(|pair| pair[0].original_file_name <= pair[1].original_file_name);
    if sorted {
        return OrderDecision::AlreadyOrdered;
    }

    let mut target = pages.to_vec();
    target.sort_by(|a, b| a.original_file_name.cmp(&b.original_file_name));
    OrderDecision::Reorder(target)
}
