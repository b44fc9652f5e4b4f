//! Normalized in-memory entity cache.
//!
//! Server responses are decomposed into flat entities keyed by
//! `(__typename, id)` ([`EntityKey`]); root query results hold references to
//! them. Root-level session flags (`isLoggedIn`, `cartItems`) live next to the
//! entities and are never fetched remotely.
//!
//! Every remote write carries the [`FetchSeq`] of the fetch that produced it.
//! A field written by a later-issued fetch is never overwritten by an
//! earlier-issued one, whatever order the responses arrive in.

mod normalize;
mod read;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use launchpad_core::{LaunchId, Page};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of a normalized entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    typename: String,
    id: String,
}

impl EntityKey {
    #[must_use]
    pub fn new(typename: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            typename: typename.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn typename(&self) -> &str {
        &self.typename
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.typename, self.id)
    }
}

/// Issue order of a remote fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchSeq(u64);

impl FetchSeq {
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// A normalized value as held by the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// A JSON scalar, including `null`.
    Scalar(Value),
    /// Reference to a normalized entity.
    Ref(EntityKey),
    List(Vec<StoredValue>),
    /// An object without identity, stored inline.
    Object(BTreeMap<String, StoredValue>),
    /// A cursor-paginated list.
    Connection(Page<StoredValue>),
}

impl StoredValue {
    /// Plain JSON rendering. References render as their `Type:id` key.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(v) => v.clone(),
            Self::Ref(key) => Value::String(key.to_string()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Connection(page) => serde_json::json!({
                "cursor": page.cursor,
                "hasMore": page.has_more,
                "items": page.items.iter().map(Self::to_json).collect::<Vec<_>>(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StoredField {
    pub(crate) value: StoredValue,
    pub(crate) written_by: FetchSeq,
}

/// A normalized entity.
#[derive(Debug, Clone)]
pub struct Entity {
    key: EntityKey,
    fields: BTreeMap<String, StoredField>,
}

impl Entity {
    fn new(key: EntityKey) -> Self {
        Self {
            key,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Stored value of a remote field, by storage key.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&StoredValue> {
        self.fields.get(field).map(|f| &f.value)
    }

    /// JSON rendering of a remote field, `None` if never fetched.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<Value> {
        self.get(field).map(StoredValue::to_json)
    }

    /// Names of every stored remote field.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Ordered set of launch ids in the cart.
///
/// Keeps insertion order for display and never holds duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LaunchId>", into = "Vec<LaunchId>")]
pub struct CartItems(Vec<LaunchId>);

impl CartItems {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn contains(&self, id: &LaunchId) -> bool {
        self.0.contains(id)
    }

    /// A new set with `id` removed if present, appended otherwise.
    #[must_use]
    pub fn toggled(&self, id: &LaunchId) -> Self {
        if self.contains(id) {
            Self(self.0.iter().filter(|i| *i != id).cloned().collect())
        } else {
            let mut items = self.0.clone();
            items.push(id.clone());
            Self(items)
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[LaunchId] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &LaunchId> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<LaunchId>> for CartItems {
    fn from(ids: Vec<LaunchId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<CartItems> for Vec<LaunchId> {
    fn from(items: CartItems) -> Self {
        items.0
    }
}

impl FromIterator<LaunchId> for CartItems {
    fn from_iter<I: IntoIterator<Item = LaunchId>>(iter: I) -> Self {
        let mut items: Vec<LaunchId> = Vec::new();
        for id in iter {
            if !items.contains(&id) {
                items.push(id);
            }
        }
        Self(items)
    }
}

/// Root-level local state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFlags {
    pub is_logged_in: bool,
    pub cart_items: CartItems,
}

/// Partial update of [`SessionFlags`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagsPatch {
    pub is_logged_in: Option<bool>,
    pub cart_items: Option<CartItems>,
}

impl FlagsPatch {
    #[must_use]
    pub const fn logged_in(mut self, value: bool) -> Self {
        self.is_logged_in = Some(value);
        self
    }

    #[must_use]
    pub fn cart_items(mut self, items: CartItems) -> Self {
        self.cart_items = Some(items);
        self
    }
}

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum Readout<T> {
    /// Every requested field was available.
    Ready(T),
    /// Some requested remote fields have never been fetched. `missing` lists
    /// their storage paths.
    NotYetAvailable { missing: Vec<String> },
}

impl<T> Readout<T> {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The value, if the read was complete.
    #[must_use]
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::NotYetAvailable { .. } => None,
        }
    }
}

/// The normalized store for one session.
#[derive(Debug, Default)]
pub struct EntityCache {
    entities: HashMap<EntityKey, Entity>,
    root: BTreeMap<String, StoredField>,
    flags: SessionFlags,
    next_seq: AtomicU64,
    /// Fetches issued before the last `clear` are discarded.
    floor: u64,
}

impl EntityCache {
    /// An empty cache with the given initial flags.
    #[must_use]
    pub fn new(flags: SessionFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    /// Current session flags. Always available, no fetch involved.
    #[must_use]
    pub const fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    /// Merge the named flags, leaving the others untouched.
    pub fn write_flags(&mut self, patch: FlagsPatch) {
        if let Some(is_logged_in) = patch.is_logged_in {
            self.flags.is_logged_in = is_logged_in;
        }
        if let Some(cart_items) = patch.cart_items {
            self.flags.cart_items = cart_items;
        }
    }

    /// Reserve the sequence number for a fetch about to be issued.
    pub fn begin_fetch(&self) -> FetchSeq {
        FetchSeq(self.next_seq.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn entity(&self, key: &EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Root query result stored under `storage_key`.
    #[must_use]
    pub fn root_value(&self, storage_key: &str) -> Option<&StoredValue> {
        self.root.get(storage_key).map(|f| &f.value)
    }

    /// Sequence of the fetch that last wrote `storage_key`.
    pub(crate) fn root_written_by(&self, storage_key: &str) -> Option<FetchSeq> {
        self.root.get(storage_key).map(|f| f.written_by)
    }

    /// Cached page for a paginated root field.
    #[must_use]
    pub fn page(&self, storage_key: &str) -> Option<&Page<StoredValue>> {
        match self.root_value(storage_key) {
            Some(StoredValue::Connection(page)) => Some(page),
            _ => None,
        }
    }

    /// Drop every entity and root result and reset the flags.
    ///
    /// Responses to fetches issued before the clear are ignored afterwards.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.root.clear();
        self.flags = SessionFlags::default();
        self.floor = self.next_seq.load(Ordering::Relaxed);
    }

    pub(crate) const fn is_discarded(&self, seq: FetchSeq) -> bool {
        seq.0 < self.floor
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(items: &CartItems) -> Vec<&str> {
        items.iter().map(LaunchId::as_str).collect()
    }

    #[test]
    fn test_write_flags_is_partial() {
        let mut cache = EntityCache::new(SessionFlags {
            is_logged_in: false,
            cart_items: CartItems::from(vec![LaunchId::from("L1")]),
        });

        cache.write_flags(FlagsPatch::default().logged_in(true));

        assert!(cache.flags().is_logged_in);
        assert_eq!(ids(&cache.flags().cart_items), vec!["L1"]);
    }

    #[test]
    fn test_cart_items_dedup_keeps_first_position() {
        let items: CartItems = ["b", "a", "b", "c", "a"]
            .into_iter()
            .map(LaunchId::from)
            .collect();
        assert_eq!(ids(&items), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_cart_items_toggle_appends_and_removes() {
        let items = CartItems::new()
            .toggled(&LaunchId::from("L1"))
            .toggled(&LaunchId::from("L2"));
        assert_eq!(ids(&items), vec!["L1", "L2"]);
        assert_eq!(ids(&items.toggled(&LaunchId::from("L1"))), vec!["L2"]);
    }

    #[test]
    fn test_cart_items_deserialize_dedups() {
        let items: CartItems = serde_json::from_str(r#"["L1","L1","L2"]"#).unwrap();
        assert_eq!(ids(&items), vec!["L1", "L2"]);
    }

    #[test]
    fn test_fetch_seq_is_monotonic() {
        let cache = EntityCache::default();
        let first = cache.begin_fetch();
        let second = cache.begin_fetch();
        assert!(first < second);
    }

    #[test]
    fn test_clear_resets_flags() {
        let mut cache = EntityCache::default();
        cache.write_flags(
            FlagsPatch::default()
                .logged_in(true)
                .cart_items(CartItems::from(vec![LaunchId::from("L1")])),
        );
        cache.clear();
        assert_eq!(cache.flags(), &SessionFlags::default());
    }

    #[test]
    fn test_readout_ready() {
        assert_eq!(Readout::Ready(1).ready(), Some(1));
        let pending: Readout<i32> = Readout::NotYetAvailable {
            missing: vec!["launches".to_string()],
        };
        assert!(!pending.is_ready());
        assert_eq!(pending.ready(), None);
    }
}
