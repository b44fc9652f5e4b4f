//! Merging "load more" pages into a cached list.

use launchpad_core::{Cursor, Page};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{EntityCache, FetchSeq, StoredValue};
use crate::query::{PlannedField, PlannedKind};

/// Misuse of the pagination contract. Business-level absence (a failed or
/// empty fetch) is not an error; these are.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    /// The page was fetched after a cursor that is no longer the cached tail,
    /// e.g. the list was refreshed while the fetch was in flight.
    #[error("page fetched after {requested:?} but the cached list ends at {cached:?}")]
    StaleCursor {
        requested: Option<Cursor>,
        cached: Option<Cursor>,
    },

    /// The cached list already reported `hasMore: false`.
    #[error("list `{0}` has no more pages")]
    Exhausted(String),

    /// The list was rewritten by a fetch issued after this page's fetch.
    #[error("list `{0}` was refreshed after this page was requested")]
    Superseded(String),

    /// Nothing is cached for the list yet; fetch the first page instead.
    #[error("list `{0}` has no cached first page")]
    NotCached(String),

    /// The field is not a paginated list.
    #[error("field `{0}` is not a paginated list")]
    NotPaginated(String),
}

/// What "load more" should do for a cached list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMore {
    /// No first page cached yet.
    NotLoaded,
    /// `hasMore` is false; don't offer "load more".
    Exhausted,
    /// Fetch the next page after this cursor.
    Next { after: Option<Cursor> },
}

/// Merge a fetched page onto the previous one.
///
/// `None` (the fetch failed or produced nothing) returns `previous`
/// unchanged. Otherwise items are concatenated in order, with no
/// de-duplication since pages fetched by cursor are disjoint, and the cursor
/// and `has_more` come from the fetched page.
#[must_use]
pub fn merge<T>(previous: Page<T>, fetched: Option<Page<T>>) -> Page<T> {
    let Some(fetched) = fetched else {
        return previous;
    };

    let mut items = previous.items;
    items.extend(fetched.items);
    Page {
        items,
        cursor: fetched.cursor,
        has_more: fetched.has_more,
    }
}

impl EntityCache {
    /// Whether and from where the list under `field` can load more.
    #[must_use]
    pub fn load_more(&self, field: &PlannedField) -> LoadMore {
        let Some(page) = field.storage_key().and_then(|key| self.page(key)) else {
            return LoadMore::NotLoaded;
        };
        if page.has_more {
            LoadMore::Next {
                after: page.cursor.clone(),
            }
        } else {
            LoadMore::Exhausted
        }
    }

    /// Merge the next page of `field` from a response fetched with
    /// `requested_after` as its cursor.
    ///
    /// `fetched` is the response data, or `None` if the fetch produced
    /// nothing; that is a no-op. The cursor check runs before anything is
    /// written, so a rejected page leaves the cache untouched.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] if the field is not paginated, has no cached
    /// first page, is exhausted, if `requested_after` is not the cached tail
    /// cursor, or if the list was rewritten by a fetch issued after `seq`.
    pub fn merge_page(
        &mut self,
        field: &PlannedField,
        requested_after: Option<&Cursor>,
        fetched: Option<&Value>,
        seq: FetchSeq,
    ) -> Result<(), MergeError> {
        let PlannedKind::Remote { storage_key, shape } = &field.kind else {
            return Err(MergeError::NotPaginated(field.name.clone()));
        };
        if !field.is_connection() {
            return Err(MergeError::NotPaginated(field.name.clone()));
        }

        let previous = self
            .page(storage_key)
            .ok_or_else(|| MergeError::NotCached(field.name.clone()))?;

        let Some(value) = fetched.and_then(|data| data.get(&field.name)).filter(|v| !v.is_null())
        else {
            debug!(field = %field.name, "load more produced nothing, keeping cached page");
            return Ok(());
        };

        if !previous.has_more {
            return Err(MergeError::Exhausted(field.name.clone()));
        }

        if previous.cursor.as_ref() != requested_after {
            warn!(
                field = %field.name,
                requested = ?requested_after,
                cached = ?previous.cursor,
                "rejecting page fetched with a stale cursor"
            );
            return Err(MergeError::StaleCursor {
                requested: requested_after.cloned(),
                cached: previous.cursor.clone(),
            });
        }

        if self.is_discarded(seq) {
            return Ok(());
        }

        if self.root_written_by(storage_key).is_some_and(|last| last > seq) {
            debug!(
                field = %field.name,
                seq = seq.as_u64(),
                "rejecting page superseded by a newer fetch of the list"
            );
            return Err(MergeError::Superseded(field.name.clone()));
        }

        let previous = previous.clone();
        let StoredValue::Connection(next) = self.normalize_value(value, Some(shape), seq) else {
            return Err(MergeError::NotPaginated(field.name.clone()));
        };

        debug!(
            field = %field.name,
            added = next.len(),
            has_more = next.has_more,
            "merged next page"
        );
        let merged = merge(previous, Some(next));
        self.write_root(storage_key, StoredValue::Connection(merged), seq);
        Ok(())
    }
}
