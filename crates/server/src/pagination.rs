//! Cursor pagination over the launch catalog.

use launchpad_core::{Launch, Page};

/// Slice one page out of `results` (already in display order).
///
/// The page starts right after the item whose cursor is `after`. An unknown
/// or missing cursor starts from the beginning; the cursor of the last item
/// yields an empty page. `cursor` is the last item's cursor, and `has_more`
/// is true unless the page ends on the last result.
#[must_use]
pub fn paginate(results: &[Launch], after: Option<&str>, page_size: usize) -> Page<Launch> {
    if page_size == 0 {
        return Page::empty();
    }

    let start = after
        .and_then(|cursor| results.iter().position(|l| l.cursor().as_str() == cursor))
        .map_or(0, |i| i + 1);

    let items: Vec<Launch> = results.iter().skip(start).take(page_size).cloned().collect();

    let cursor = items.last().map(Launch::cursor);
    let has_more = match (&cursor, results.last()) {
        (Some(page_tail), Some(last)) => *page_tail != last.cursor(),
        _ => false,
    };

    Page {
        items,
        cursor,
        has_more,
    }
}
