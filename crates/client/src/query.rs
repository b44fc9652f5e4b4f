//! Query shapes and compiled query plans.
//!
//! A [`Query`] is the selection tree a caller wants back. Each field is marked
//! [`Origin::Remote`] (answered by the server, cached after normalization) or
//! [`Origin::Local`] (computed from cache state, never sent). Compiling a query
//! into a [`QueryPlan`] binds every local field to its registered resolver and
//! precomputes the cache storage key of every remote field, so reads never
//! dispatch on field names at runtime.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::local::{FieldResolver, LocalFieldRegistry, RootResolver};

/// Errors from compiling a query plan. These are programming errors: the
/// query asks for a local field nobody declared.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("no local field `{field}` is declared on `{typename}`")]
    UnknownLocalField { typename: String, field: String },

    #[error("local field `{field}` selected on an object with no declared type")]
    UntypedLocalField { field: String },
}

/// Where a field's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Leaf,
    Object {
        typename: Option<String>,
        children: Vec<Selection>,
    },
    Connection {
        items: String,
        typename: String,
        children: Vec<Selection>,
    },
}

/// One field in a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    name: String,
    origin: Origin,
    args: Map<String, Value>,
    shape: Shape,
}

impl Selection {
    /// A remote scalar field.
    #[must_use]
    pub fn field(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            origin: Origin::Remote,
            args: Map::new(),
            shape: Shape::Leaf,
        }
    }

    /// A local field (the `@client` marker).
    #[must_use]
    pub fn local(name: &str) -> Self {
        Self {
            origin: Origin::Local,
            ..Self::field(name)
        }
    }

    /// A remote object field with no declared type.
    #[must_use]
    pub fn object(name: &str, children: Vec<Self>) -> Self {
        Self {
            shape: Shape::Object {
                typename: None,
                children,
            },
            ..Self::field(name)
        }
    }

    /// A remote object field of a known type. Required when `children`
    /// includes local fields.
    #[must_use]
    pub fn entity(name: &str, typename: &str, children: Vec<Self>) -> Self {
        Self {
            shape: Shape::Object {
                typename: Some(typename.to_owned()),
                children,
            },
            ..Self::field(name)
        }
    }

    /// A cursor-paginated list. The server returns
    /// `{ cursor, hasMore, <items>: [...] }`, each item of type `typename`.
    #[must_use]
    pub fn connection(name: &str, items: &str, typename: &str, children: Vec<Self>) -> Self {
        Self {
            shape: Shape::Connection {
                items: items.to_owned(),
                typename: typename.to_owned(),
                children,
            },
            ..Self::field(name)
        }
    }

    /// Add an argument. Arguments are part of the storage key, except the
    /// `after` cursor of a connection.
    #[must_use]
    pub fn arg(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.args.insert(name.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }
}

/// A named query: operation name plus root selections.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    operation: String,
    selections: Vec<Selection>,
}

impl Query {
    #[must_use]
    pub fn new(operation: &str, selections: Vec<Selection>) -> Self {
        Self {
            operation: operation.to_owned(),
            selections,
        }
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }
}

#[derive(Debug, Clone)]
pub(crate) enum PlannedShape {
    Leaf,
    Object(Vec<PlannedField>),
    Connection {
        items: String,
        item: Box<PlannedShape>,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum PlannedKind {
    RootLocal(RootResolver),
    Local(FieldResolver),
    Remote {
        storage_key: String,
        shape: PlannedShape,
    },
}

/// A compiled field.
#[derive(Debug, Clone)]
pub struct PlannedField {
    pub(crate) name: String,
    pub(crate) kind: PlannedKind,
}

impl PlannedField {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cache storage key, `None` for local fields.
    #[must_use]
    pub fn storage_key(&self) -> Option<&str> {
        match &self.kind {
            PlannedKind::Remote { storage_key, .. } => Some(storage_key),
            PlannedKind::RootLocal(_) | PlannedKind::Local(_) => None,
        }
    }

    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self.kind, PlannedKind::RootLocal(_) | PlannedKind::Local(_))
    }

    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(
            self.kind,
            PlannedKind::Remote {
                shape: PlannedShape::Connection { .. },
                ..
            }
        )
    }
}

/// A query compiled against a [`LocalFieldRegistry`].
#[derive(Debug, Clone)]
pub struct QueryPlan {
    operation: String,
    fields: Vec<PlannedField>,
}

impl QueryPlan {
    /// Compile `query`, binding its local fields.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if a local field is not declared in `registry`
    /// for the type it is selected on.
    pub fn compile(query: &Query, registry: &LocalFieldRegistry) -> Result<Self, PlanError> {
        let fields = query
            .selections
            .iter()
            .map(|selection| match selection.origin {
                Origin::Local => registry
                    .root(&selection.name)
                    .map(|resolver| PlannedField {
                        name: selection.name.clone(),
                        kind: PlannedKind::RootLocal(resolver),
                    })
                    .ok_or_else(|| PlanError::UnknownLocalField {
                        typename: "Query".to_owned(),
                        field: selection.name.clone(),
                    }),
                Origin::Remote => plan_remote(selection, registry),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            operation: query.operation.clone(),
            fields,
        })
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn fields(&self) -> &[PlannedField] {
        &self.fields
    }

    /// Root field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&PlannedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn plan_children(
    children: &[Selection],
    typename: Option<&str>,
    registry: &LocalFieldRegistry,
) -> Result<Vec<PlannedField>, PlanError> {
    children
        .iter()
        .map(|child| match child.origin {
            Origin::Local => {
                let typename = typename.ok_or_else(|| PlanError::UntypedLocalField {
                    field: child.name.clone(),
                })?;
                let resolver = registry.field(typename, &child.name).ok_or_else(|| {
                    PlanError::UnknownLocalField {
                        typename: typename.to_owned(),
                        field: child.name.clone(),
                    }
                })?;
                Ok(PlannedField {
                    name: child.name.clone(),
                    kind: PlannedKind::Local(resolver),
                })
            }
            Origin::Remote => plan_remote(child, registry),
        })
        .collect()
}

fn plan_remote(
    selection: &Selection,
    registry: &LocalFieldRegistry,
) -> Result<PlannedField, PlanError> {
    let (shape, is_connection) = match &selection.shape {
        Shape::Leaf => (PlannedShape::Leaf, false),
        Shape::Object { typename, children } => (
            PlannedShape::Object(plan_children(children, typename.as_deref(), registry)?),
            false,
        ),
        Shape::Connection {
            items,
            typename,
            children,
        } => (
            PlannedShape::Connection {
                items: items.clone(),
                item: Box::new(PlannedShape::Object(plan_children(
                    children,
                    Some(typename.as_str()),
                    registry,
                )?)),
            },
            true,
        ),
    };

    Ok(PlannedField {
        name: selection.name.clone(),
        kind: PlannedKind::Remote {
            storage_key: storage_key(&selection.name, &selection.args, is_connection),
            shape,
        },
    })
}

/// `name` or `name({"arg":value,...})` with arguments in key order.
///
/// A connection's `after` cursor is left out so every page of the list lands
/// under the same key.
pub(crate) fn storage_key(name: &str, args: &Map<String, Value>, is_connection: bool) -> String {
    let sorted: BTreeMap<&String, &Value> = args
        .iter()
        .filter(|(k, _)| !(is_connection && k.as_str() == "after"))
        .collect();
    let keyed: Map<String, Value> = sorted
        .into_iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if keyed.is_empty() {
        name.to_owned()
    } else {
        format!("{name}({})", Value::Object(keyed))
    }
}
