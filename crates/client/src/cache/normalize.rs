//! Writing server responses into the cache.

use std::collections::BTreeMap;

use launchpad_core::{Cursor, Page};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::{Entity, EntityCache, EntityKey, FetchSeq, StoredField, StoredValue};
use crate::query::{PlannedField, PlannedKind, PlannedShape, QueryPlan};

impl EntityCache {
    /// Normalize a response for `plan` into the cache.
    ///
    /// Root fields absent from `data` are left as they were. Nested objects
    /// carrying `__typename` and `id` become entities; writing the same
    /// identity again merges into the existing record field by field.
    pub fn normalize(&mut self, plan: &QueryPlan, data: &Value, seq: FetchSeq) {
        if self.is_discarded(seq) {
            debug!(
                seq = seq.as_u64(),
                operation = plan.operation(),
                "discarding response issued before cache clear"
            );
            return;
        }

        for field in plan.fields() {
            let PlannedKind::Remote { storage_key, shape } = &field.kind else {
                continue;
            };
            let Some(value) = data.get(&field.name) else {
                continue;
            };

            let stored = self.normalize_value(value, Some(shape), seq);
            self.write_root(storage_key, stored, seq);
        }
    }

    pub(crate) fn write_root(&mut self, storage_key: &str, value: StoredValue, seq: FetchSeq) {
        match self.root.get(storage_key) {
            Some(existing) if existing.written_by > seq => {
                trace!(storage_key, "skipping stale root write");
            }
            _ => {
                self.root.insert(
                    storage_key.to_owned(),
                    StoredField {
                        value,
                        written_by: seq,
                    },
                );
            }
        }
    }

    pub(crate) fn normalize_value(
        &mut self,
        value: &Value,
        shape: Option<&PlannedShape>,
        seq: FetchSeq,
    ) -> StoredValue {
        match value {
            Value::Array(items) => StoredValue::List(
                items
                    .iter()
                    .map(|item| self.normalize_value(item, shape, seq))
                    .collect(),
            ),
            Value::Object(map) => self.normalize_object(map, shape, seq),
            scalar => StoredValue::Scalar(scalar.clone()),
        }
    }

    fn normalize_object(
        &mut self,
        map: &Map<String, Value>,
        shape: Option<&PlannedShape>,
        seq: FetchSeq,
    ) -> StoredValue {
        let key = entity_key(map);

        if key.is_none()
            && let Some(PlannedShape::Connection { items, item }) = shape
        {
            let page_items = match map.get(items) {
                Some(Value::Array(values)) => values
                    .iter()
                    .map(|v| self.normalize_value(v, Some(item.as_ref()), seq))
                    .collect(),
                _ => Vec::new(),
            };
            return StoredValue::Connection(Page {
                items: page_items,
                cursor: map
                    .get("cursor")
                    .and_then(Value::as_str)
                    .map(Cursor::from),
                has_more: map.get("hasMore").and_then(Value::as_bool).unwrap_or(false),
            });
        }

        let children = match shape {
            Some(PlannedShape::Object(children)) => children.as_slice(),
            _ => &[],
        };

        let fields: Vec<(String, StoredValue)> = map
            .iter()
            .filter(|(name, _)| name.as_str() != "__typename")
            .map(|(name, v)| {
                let planned = find_planned(children, name);
                let storage_key = planned
                    .and_then(PlannedField::storage_key)
                    .map_or_else(|| name.clone(), str::to_owned);
                let child_shape = planned.and_then(|p| match &p.kind {
                    PlannedKind::Remote { shape, .. } => Some(shape),
                    _ => None,
                });
                (storage_key, self.normalize_value(v, child_shape, seq))
            })
            .collect();

        match key {
            Some(key) => {
                self.merge_entity(&key, fields, seq);
                StoredValue::Ref(key)
            }
            None => StoredValue::Object(fields.into_iter().collect::<BTreeMap<_, _>>()),
        }
    }

    fn merge_entity(&mut self, key: &EntityKey, fields: Vec<(String, StoredValue)>, seq: FetchSeq) {
        let entity = self
            .entities
            .entry(key.clone())
            .or_insert_with(|| Entity::new(key.clone()));

        for (name, value) in fields {
            match entity.fields.get(&name) {
                Some(existing) if existing.written_by > seq => {
                    trace!(entity = %key, field = %name, "skipping stale field write");
                }
                _ => {
                    entity.fields.insert(
                        name,
                        StoredField {
                            value,
                            written_by: seq,
                        },
                    );
                }
            }
        }
    }
}

fn find_planned<'a>(children: &'a [PlannedField], name: &str) -> Option<&'a PlannedField> {
    children.iter().find(|c| !c.is_local() && c.name == name)
}

/// `(__typename, id)` of an object, if it has both.
fn entity_key(map: &Map<String, Value>) -> Option<EntityKey> {
    let typename = map.get("__typename")?.as_str()?;
    let id = match map.get("id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(EntityKey::new(typename, id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::local::LocalFieldRegistry;
    use crate::query::{Query, Selection};

    fn launch_plan() -> QueryPlan {
        let query = Query::new(
            "LaunchDetails",
            vec![
                Selection::entity(
                    "launch",
                    "Launch",
                    vec![
                        Selection::field("id"),
                        Selection::field("site"),
                        Selection::object(
                            "rocket",
                            vec![Selection::field("id"), Selection::field("name")],
                        ),
                    ],
                )
                .arg("id", "1"),
            ],
        );
        QueryPlan::compile(&query, &LocalFieldRegistry::default()).unwrap()
    }

    fn launch_data(site: &str) -> Value {
        json!({
            "launch": {
                "__typename": "Launch",
                "id": "1",
                "site": site,
                "rocket": { "__typename": "Rocket", "id": "falcon9", "name": "Falcon 9" }
            }
        })
    }

    #[test]
    fn test_normalize_flattens_entities() {
        let mut cache = EntityCache::default();
        let seq = cache.begin_fetch();
        cache.normalize(&launch_plan(), &launch_data("KSC LC 39A"), seq);

        assert_eq!(cache.entity_count(), 2);
        let launch = cache.entity(&EntityKey::new("Launch", "1")).unwrap();
        assert_eq!(
            launch.get("rocket"),
            Some(&StoredValue::Ref(EntityKey::new("Rocket", "falcon9")))
        );
        assert_eq!(
            cache.root_value(r#"launch({"id":"1"})"#),
            Some(&StoredValue::Ref(EntityKey::new("Launch", "1")))
        );
    }

    #[test]
    fn test_repeated_identity_merges_into_one_record() {
        let mut cache = EntityCache::default();
        let plan = launch_plan();

        let first = cache.begin_fetch();
        cache.normalize(&plan, &launch_data("KSC LC 39A"), first);
        let second = cache.begin_fetch();
        cache.normalize(&plan, &launch_data("CCAFS SLC 40"), second);

        assert_eq!(cache.entity_count(), 2);
        let launch = cache.entity(&EntityKey::new("Launch", "1")).unwrap();
        assert_eq!(launch.field("site"), Some(json!("CCAFS SLC 40")));
    }

    #[test]
    fn test_stale_fetch_does_not_overwrite_newer_fields() {
        let mut cache = EntityCache::default();
        let plan = launch_plan();

        let older = cache.begin_fetch();
        let newer = cache.begin_fetch();
        cache.normalize(&plan, &launch_data("newer site"), newer);
        cache.normalize(&plan, &launch_data("older site"), older);

        let launch = cache.entity(&EntityKey::new("Launch", "1")).unwrap();
        assert_eq!(launch.field("site"), Some(json!("newer site")));
    }

    #[test]
    fn test_numeric_ids_are_keyed_as_strings() {
        let mut cache = EntityCache::default();
        let seq = cache.begin_fetch();
        let data = json!({ "launch": { "__typename": "Launch", "id": 7, "site": null } });
        cache.normalize(&launch_plan(), &data, seq);

        let launch = cache.entity(&EntityKey::new("Launch", "7")).unwrap();
        assert_eq!(launch.field("site"), Some(Value::Null));
    }

    #[test]
    fn test_objects_without_identity_are_embedded() {
        let mut cache = EntityCache::default();
        let seq = cache.begin_fetch();
        let data = json!({
            "launch": {
                "__typename": "Launch",
                "id": "1",
                "rocket": { "__typename": "Rocket", "name": "anonymous" }
            }
        });
        cache.normalize(&launch_plan(), &data, seq);

        assert_eq!(cache.entity_count(), 1);
        let launch = cache.entity(&EntityKey::new("Launch", "1")).unwrap();
        assert!(matches!(launch.get("rocket"), Some(StoredValue::Object(_))));
    }

    #[test]
    fn test_responses_from_before_clear_are_discarded() {
        let mut cache = EntityCache::default();
        let seq = cache.begin_fetch();
        cache.clear();
        cache.normalize(&launch_plan(), &launch_data("KSC LC 39A"), seq);
        assert_eq!(cache.entity_count(), 0);
    }
}
