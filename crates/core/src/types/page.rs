//! Cursor-paginated result pages.

use serde::{Deserialize, Serialize};

use crate::define_key;

define_key!(Cursor);

/// One page of a cursor-paginated list.
///
/// `cursor` marks the tail of this page and is the `after` argument for the
/// next fetch. `has_more == false` means there is nothing after `cursor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Option<Cursor>,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// A page with no items and nothing after it.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
            has_more: false,
        }
    }

    /// Convert the items while keeping the cursor and `has_more` flag.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            cursor: self.cursor,
            has_more: self.has_more,
        }
    }

    /// Number of items in the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_pagination_state() {
        let page = Page {
            items: vec![1, 2],
            cursor: Some(Cursor::from("2")),
            has_more: true,
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.cursor, Some(Cursor::from("2")));
        assert!(mapped.has_more);
    }

    #[test]
    fn test_wire_field_names() {
        let page: Page<u8> = Page::empty();
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["hasMore"], false);
        assert!(json["cursor"].is_null());
    }
}
