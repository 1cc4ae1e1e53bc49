///
/// PageWindow
///
/// Canonical pagination window sizing. `keep_count` is `offset + limit`;
/// `fetch_count` adds one probe row when the caller needs to know whether
/// more rows exist past the page boundary.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(in crate::db) struct PageWindow {
    pub(in crate::db) fetch_count: usize,
    pub(in crate::db) keep_count: usize,
}

/// Compute window counts from logical pagination inputs.
#[must_use]
pub(in crate::db) fn compute_page_window(offset: u64, limit: u64, needs_extra: bool) -> PageWindow {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let keep_count = offset.saturating_add(limit);
    let fetch_count = keep_count.saturating_add(usize::from(needs_extra));

    PageWindow {
        fetch_count,
        keep_count,
    }
}

///
/// TESTS
///
