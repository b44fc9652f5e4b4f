//! Local (virtual) fields.
//!
//! A local field is queryable like any remote field but is never sent to the
//! server. Each one is a pure function of cache state, registered statically
//! per `(type, field)` and bound when a [`QueryPlan`](crate::QueryPlan) is
//! compiled. Values are recomputed on every read, so a mutation that changes
//! their inputs is reflected on the next read without any push.

use std::collections::HashMap;

use launchpad_core::LaunchId;
use serde_json::Value;

use crate::cache::{Entity, SessionFlags};

/// Resolver for a root-level local field.
pub type RootResolver = fn(&SessionFlags) -> Value;

/// Resolver for a local field on an entity type.
pub type FieldResolver = fn(&Entity, &SessionFlags) -> Value;

/// Static `(type, field) -> resolver` mapping.
#[derive(Debug, Clone)]
pub struct LocalFieldRegistry {
    root: HashMap<String, RootResolver>,
    fields: HashMap<String, HashMap<String, FieldResolver>>,
}

impl LocalFieldRegistry {
    /// A registry with no local fields.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            root: HashMap::new(),
            fields: HashMap::new(),
        }
    }

    /// Register a root-level local field.
    #[must_use]
    pub fn with_root(mut self, field: &str, resolver: RootResolver) -> Self {
        self.root.insert(field.to_owned(), resolver);
        self
    }

    /// Register a local field on `typename`.
    #[must_use]
    pub fn with_field(mut self, typename: &str, field: &str, resolver: FieldResolver) -> Self {
        self.fields
            .entry(typename.to_owned())
            .or_default()
            .insert(field.to_owned(), resolver);
        self
    }

    #[must_use]
    pub fn root(&self, field: &str) -> Option<RootResolver> {
        self.root.get(field).copied()
    }

    #[must_use]
    pub fn field(&self, typename: &str, field: &str) -> Option<FieldResolver> {
        self.fields.get(typename)?.get(field).copied()
    }
}

impl Default for LocalFieldRegistry {
    /// `Query.isLoggedIn`, `Query.cartItems` and `Launch.isInCart`.
    fn default() -> Self {
        Self::empty()
            .with_root("isLoggedIn", is_logged_in)
            .with_root("cartItems", cart_items)
            .with_field("Launch", "isInCart", is_in_cart)
    }
}

/// `Query.isLoggedIn`
#[must_use]
pub fn is_logged_in(flags: &SessionFlags) -> Value {
    Value::Bool(flags.is_logged_in)
}

/// `Query.cartItems`
#[must_use]
pub fn cart_items(flags: &SessionFlags) -> Value {
    Value::Array(
        flags
            .cart_items
            .iter()
            .map(|id| Value::String(id.as_str().to_owned()))
            .collect(),
    )
}

/// `Launch.isInCart`
#[must_use]
pub fn is_in_cart(launch: &Entity, flags: &SessionFlags) -> Value {
    let id = LaunchId::from(launch.key().id());
    Value::Bool(flags.cart_items.contains(&id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CartItems;

    #[test]
    fn test_default_registry_declares_session_fields() {
        let registry = LocalFieldRegistry::default();
        assert!(registry.root("isLoggedIn").is_some());
        assert!(registry.root("cartItems").is_some());
        assert!(registry.field("Launch", "isInCart").is_some());
        assert!(registry.field("Rocket", "isInCart").is_none());
        assert!(registry.root("launches").is_none());
    }

    #[test]
    fn test_cart_items_renders_in_order() {
        let flags = SessionFlags {
            is_logged_in: true,
            cart_items: CartItems::from(vec![LaunchId::from("2"), LaunchId::from("1")]),
        };
        assert_eq!(cart_items(&flags), serde_json::json!(["2", "1"]));
        assert_eq!(is_logged_in(&flags), Value::Bool(true));
    }
}
