//! Reading query plans out of the cache.

use serde_json::{Map, Value};

use super::{Entity, EntityCache, Readout, StoredValue};
use crate::query::{PlannedField, PlannedKind, PlannedShape, QueryPlan};

/// What a selection set is being read from.
#[derive(Clone, Copy)]
enum Source<'a> {
    Entity(&'a Entity),
    Embedded(&'a std::collections::BTreeMap<String, StoredValue>),
}

impl<'a> Source<'a> {
    fn get(self, storage_key: &str) -> Option<&'a StoredValue> {
        match self {
            Self::Entity(entity) => entity.get(storage_key),
            Self::Embedded(fields) => fields.get(storage_key),
        }
    }
}

impl EntityCache {
    /// Read the current snapshot for `plan`.
    ///
    /// Local fields are computed from the current flags and entities on every
    /// call. If any remote field in the plan has never been fetched, the read
    /// is [`Readout::NotYetAvailable`]; a field fetched as `null` reads as
    /// `null`.
    #[must_use]
    pub fn read(&self, plan: &QueryPlan) -> Readout<Value> {
        let mut missing = Vec::new();
        let mut out = Map::new();

        for field in plan.fields() {
            match &field.kind {
                PlannedKind::RootLocal(resolver) => {
                    out.insert(field.name.clone(), resolver(&self.flags));
                }
                PlannedKind::Local(_) => {}
                PlannedKind::Remote { storage_key, shape } => match self.root_value(storage_key) {
                    Some(stored) => {
                        if let Some(value) =
                            self.materialize(stored, shape, storage_key, &mut missing)
                        {
                            out.insert(field.name.clone(), value);
                        }
                    }
                    None => missing.push(storage_key.clone()),
                },
            }
        }

        if missing.is_empty() {
            Readout::Ready(Value::Object(out))
        } else {
            Readout::NotYetAvailable { missing }
        }
    }

    fn materialize(
        &self,
        stored: &StoredValue,
        shape: &PlannedShape,
        path: &str,
        missing: &mut Vec<String>,
    ) -> Option<Value> {
        match (stored, shape) {
            (StoredValue::List(items), _) => Some(Value::Array(
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| {
                        self.materialize(item, shape, &format!("{path}.{i}"), missing)
                    })
                    .collect(),
            )),
            (StoredValue::Ref(key), PlannedShape::Object(children)) => {
                let Some(entity) = self.entity(key) else {
                    missing.push(format!("{path}<{key}>"));
                    return None;
                };
                self.select(Source::Entity(entity), children, path, missing)
            }
            (StoredValue::Object(fields), PlannedShape::Object(children)) => {
                self.select(Source::Embedded(fields), children, path, missing)
            }
            (StoredValue::Connection(page), PlannedShape::Connection { items, item }) => {
                let values: Vec<Value> = page
                    .items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, entry)| {
                        self.materialize(entry, item, &format!("{path}.{items}.{i}"), missing)
                    })
                    .collect();
                let mut out = Map::new();
                out.insert(
                    "cursor".to_owned(),
                    page.cursor
                        .as_ref()
                        .map_or(Value::Null, |c| Value::String(c.as_str().to_owned())),
                );
                out.insert("hasMore".to_owned(), Value::Bool(page.has_more));
                out.insert(items.clone(), Value::Array(values));
                Some(Value::Object(out))
            }
            (other, _) => Some(other.to_json()),
        }
    }

    fn select(
        &self,
        source: Source<'_>,
        children: &[PlannedField],
        path: &str,
        missing: &mut Vec<String>,
    ) -> Option<Value> {
        let mut out = Map::new();
        let before = missing.len();

        for child in children {
            let child_path = format!("{path}.{}", child.name);
            match &child.kind {
                PlannedKind::Local(resolver) => match source {
                    Source::Entity(entity) => {
                        out.insert(child.name.clone(), resolver(entity, &self.flags));
                    }
                    Source::Embedded(_) => missing.push(child_path),
                },
                PlannedKind::RootLocal(resolver) => {
                    out.insert(child.name.clone(), resolver(&self.flags));
                }
                PlannedKind::Remote { storage_key, shape } => match source.get(storage_key) {
                    Some(stored) => {
                        if let Some(value) = self.materialize(stored, shape, &child_path, missing) {
                            out.insert(child.name.clone(), value);
                        }
                    }
                    None => missing.push(child_path),
                },
            }
        }

        (missing.len() == before).then_some(Value::Object(out))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use launchpad_core::LaunchId;
    use serde_json::json;

    use super::*;
    use crate::cache::{CartItems, FlagsPatch};
    use crate::local::LocalFieldRegistry;
    use crate::query::{Query, Selection};

    fn plan(selections: Vec<Selection>) -> QueryPlan {
        QueryPlan::compile(&Query::new("Test", selections), &LocalFieldRegistry::default())
            .unwrap()
    }

    fn launch_selection() -> Selection {
        Selection::entity(
            "launch",
            "Launch",
            vec![
                Selection::field("id"),
                Selection::local("isInCart"),
                Selection::object("rocket", vec![Selection::field("name")]),
            ],
        )
        .arg("id", "1")
    }

    fn seed(cache: &mut EntityCache) {
        let seq = cache.begin_fetch();
        cache.normalize(
            &plan(vec![launch_selection()]),
            &json!({
                "launch": {
                    "__typename": "Launch",
                    "id": "1",
                    "rocket": { "__typename": "Rocket", "id": "falcon9", "name": "Falcon 9" }
                }
            }),
            seq,
        );
    }

    #[test]
    fn test_root_flags_read_without_fetch() {
        let cache = EntityCache::default();
        let readout = cache.read(&plan(vec![
            Selection::local("isLoggedIn"),
            Selection::local("cartItems"),
        ]));
        assert_eq!(
            readout,
            Readout::Ready(json!({ "isLoggedIn": false, "cartItems": [] }))
        );
    }

    #[test]
    fn test_unfetched_remote_field_is_not_yet_available() {
        let cache = EntityCache::default();
        let readout = cache.read(&plan(vec![
            Selection::local("isLoggedIn"),
            launch_selection(),
        ]));
        assert_eq!(
            readout,
            Readout::NotYetAvailable {
                missing: vec![r#"launch({"id":"1"})"#.to_string()]
            }
        );
    }

    #[test]
    fn test_null_is_distinct_from_missing() {
        let mut cache = EntityCache::default();
        let p = plan(vec![launch_selection()]);
        let seq = cache.begin_fetch();
        cache.normalize(&p, &json!({ "launch": null }), seq);

        assert_eq!(cache.read(&p), Readout::Ready(json!({ "launch": null })));
    }

    #[test]
    fn test_unfetched_entity_field_is_reported_by_path() {
        let mut cache = EntityCache::default();
        seed(&mut cache);

        let wider = plan(vec![
            Selection::entity(
                "launch",
                "Launch",
                vec![Selection::field("id"), Selection::field("site")],
            )
            .arg("id", "1"),
        ]);
        assert_eq!(
            cache.read(&wider),
            Readout::NotYetAvailable {
                missing: vec![r#"launch({"id":"1"}).site"#.to_string()]
            }
        );
    }

    #[test]
    fn test_virtual_field_follows_cart() {
        let mut cache = EntityCache::default();
        seed(&mut cache);
        let p = plan(vec![launch_selection()]);

        cache.write_flags(
            FlagsPatch::default().cart_items(CartItems::from(vec![LaunchId::from("1")])),
        );
        assert_eq!(
            cache.read(&p).ready().unwrap(),
            json!({ "launch": { "id": "1", "isInCart": true, "rocket": { "name": "Falcon 9" } } })
        );

        cache.write_flags(FlagsPatch::default().cart_items(CartItems::new()));
        assert_eq!(
            cache.read(&p).ready().unwrap()["launch"]["isInCart"],
            json!(false)
        );
    }
}
