//! Cart membership toggling.

use launchpad_core::LaunchId;
use tracing::debug;

use crate::cache::{CartItems, EntityCache, FlagsPatch};

/// Add `id` to the cart if absent, remove it if present.
///
/// The read of `cartItems` and the write of the new set happen under one
/// exclusive borrow of the cache, so no reader can observe a half-applied
/// toggle and toggles of different ids all land. Returns the new set.
pub fn toggle(cache: &mut EntityCache, id: &LaunchId) -> CartItems {
    let next = cache.flags().cart_items.toggled(id);
    debug!(launch_id = %id, in_cart = next.contains(id), "toggled cart item");
    cache.write_flags(FlagsPatch::default().cart_items(next.clone()));
    next
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;
    use crate::cache::SessionFlags;

    fn ids(items: &CartItems) -> Vec<&str> {
        items.iter().map(LaunchId::as_str).collect()
    }

    #[test]
    fn test_toggle_sequence() {
        let mut cache = EntityCache::default();
        cache.write_flags(
            FlagsPatch::default()
                .cart_items(CartItems::new())
                .logged_in(false),
        );

        assert_eq!(ids(&toggle(&mut cache, &LaunchId::from("L1"))), vec!["L1"]);
        assert_eq!(
            ids(&toggle(&mut cache, &LaunchId::from("L2"))),
            vec!["L1", "L2"]
        );
        assert_eq!(ids(&toggle(&mut cache, &LaunchId::from("L1"))), vec!["L2"]);
        assert_eq!(ids(&cache.flags().cart_items), vec!["L2"]);
    }

    #[test]
    fn test_toggle_leaves_login_flag_alone() {
        let mut cache = EntityCache::new(SessionFlags {
            is_logged_in: true,
            cart_items: CartItems::new(),
        });
        toggle(&mut cache, &LaunchId::from("L1"));
        assert!(cache.flags().is_logged_in);
    }

    proptest! {
        #[test]
        fn test_toggles_fold_to_symmetric_difference(seq in prop::collection::vec(0u8..6, 0..40)) {
            let mut cache = EntityCache::default();
            let mut expected: BTreeSet<String> = BTreeSet::new();

            for n in &seq {
                let id = format!("L{n}");
                toggle(&mut cache, &LaunchId::from(id.as_str()));
                if !expected.remove(&id) {
                    expected.insert(id);
                }
            }

            let actual: BTreeSet<String> = cache
                .flags()
                .cart_items
                .iter()
                .map(|id| id.as_str().to_owned())
                .collect();
            prop_assert_eq!(actual, expected);
            prop_assert_eq!(cache.flags().cart_items.len(), cache.flags().cart_items.iter().collect::<BTreeSet<_>>().len());
        }

        #[test]
        fn test_double_toggle_restores_set(start in prop::collection::vec(0u8..6, 0..10), n in 0u8..6) {
            let initial: CartItems = start.iter().map(|n| LaunchId::from(format!("L{n}"))).collect();
            let mut cache = EntityCache::new(SessionFlags { is_logged_in: false, cart_items: initial.clone() });
            let id = LaunchId::from(format!("L{n}"));

            toggle(&mut cache, &id);
            toggle(&mut cache, &id);

            let restored: BTreeSet<_> = cache.flags().cart_items.iter().cloned().collect();
            let original: BTreeSet<_> = initial.iter().cloned().collect();
            prop_assert_eq!(restored, original);
        }
    }
}
