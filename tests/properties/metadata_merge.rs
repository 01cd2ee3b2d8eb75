//! Property tests for metadata deep-merging.

use proptest::prelude::*;
use serde_json::{Map, Value};

use sitemill::sitemap::deep_merge;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

fn json_map() -> impl Strategy<Value = Map<String, Value>> {
    let value = leaf().prop_recursive(2, 16, 4, |inner| {
        proptest::collection::btree_map("[a-d]{1,2}", inner, 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    });
    proptest::collection::btree_map("[a-d]{1,2}", value, 0..6)
        .prop_map(|m| m.into_iter().collect())
}

proptest! {
    /// PROPERTY: After a merge, every key of the source is present in the
    /// destination, and scalar conflicts resolve to the source's value.
    #[test]
    fn property_last_write_wins_on_scalars(dest in json_map(), src in json_map()) {
        let mut merged = dest;
        deep_merge(&mut merged, &src);

        for (key, value) in &src {
            prop_assert!(merged.contains_key(key));
            if !value.is_object() {
                prop_assert_eq!(&merged[key], value);
            }
        }
    }

    /// PROPERTY: Merging the same source twice changes nothing the second
    /// time.
    #[test]
    fn property_merge_is_idempotent(dest in json_map(), src in json_map()) {
        let mut once = dest;
        deep_merge(&mut once, &src);

        let mut twice = once.clone();
        deep_merge(&mut twice, &src);

        prop_assert_eq!(once, twice);
    }

    /// PROPERTY: Keys only in the destination survive a merge untouched.
    #[test]
    fn property_merge_preserves_unrelated_keys(dest in json_map(), src in json_map()) {
        let mut merged = dest.clone();
        deep_merge(&mut merged, &src);

        for (key, value) in &dest {
            if !src.contains_key(key) {
                prop_assert_eq!(&merged[key], value);
            }
        }
    }
}
