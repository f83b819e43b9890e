//! Tree Codec: nested locale trees <-> flat key paths.
//!
//! Locale files hold one nested JSON object per locale whose leaves are
//! strings. Entries address the same strings by dot-delimited key path.
//! Both directions are pure functions over owned maps.
//!
//! Content that cannot be a translation is skipped with a warning:
//! non-string leaves (arrays, numbers, booleans, null) and object keys that
//! are empty, padded with whitespace or contain `.`. Those are exactly the
//! segments the write-time validator rejects.

use crate::i18n::entry::LocaleValues;
use crate::i18n::validator::EntryValidator;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// key path -> value, for a single locale.
pub type FlatTree = BTreeMap<String, String>;

/// key path -> (locale -> value).
pub type FlatEntries = BTreeMap<String, LocaleValues>;

/// Flatten one locale tree into `key.path -> value`.
pub fn flatten(tree: &Value, locale: &str) -> FlatTree {
    let mut flat = FlatTree::new();
    match tree {
        Value::Object(map) => flatten_into(map, "", locale, &mut flat),
        other => warn!(
            "Locale '{}' root is {} rather than an object; nothing to flatten",
            locale,
            kind(other)
        ),
    }
    flat
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, locale: &str, out: &mut FlatTree) {
    for (key, value) in map {
        if !EntryValidator::is_valid_segment(key) {
            warn!(
                "Skipping key '{}' under '{}' in '{}': not a valid key segment",
                key, prefix, locale
            );
            continue;
        }

        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::String(s) => {
                out.insert(path, s.clone());
            }
            Value::Object(child) => flatten_into(child, &path, locale, out),
            other => warn!(
                "Skipping non-string leaf '{}' in '{}' ({})",
                path,
                locale,
                kind(other)
            ),
        }
    }
}

/// Flatten every locale tree and merge per key across locales.
pub fn flatten_all(trees: &BTreeMap<String, Value>) -> FlatEntries {
    let mut merged = FlatEntries::new();
    for (locale, tree) in trees {
        merge_flat(&mut merged, locale, flatten(tree, locale));
    }
    merged
}

/// Fold one locale's flat tree into the cross-locale map.
pub fn merge_flat(merged: &mut FlatEntries, locale: &str, flat: FlatTree) {
    for (key_path, value) in flat {
        merged
            .entry(key_path)
            .or_default()
            .insert(locale.to_string(), value);
    }
}

/// Rebuild one tree per locale from flat entries.
///
/// Paths are applied in sorted order. When a path needs an object where a
/// string already sits (`a` and `a.b` both present), the object wins.
pub fn unflatten(entries: &FlatEntries) -> BTreeMap<String, Value> {
    let mut trees: BTreeMap<String, Value> = BTreeMap::new();
    for (key_path, values) in entries {
        for (locale, value) in values {
            let tree = trees
                .entry(locale.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            set_path(tree, key_path, Value::String(value.clone()));
        }
    }
    trees
}

/// Set `key_path` in `tree`, creating intermediate objects as needed and
/// overwriting only the final leaf. Existing siblings are left untouched.
pub fn set_path(tree: &mut Value, key_path: &str, leaf: Value) {
    let segments: Vec<&str> = key_path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = tree;
    for segment in parents {
        let map = as_object_mut(node, key_path);
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let map = as_object_mut(node, key_path);
    if let Some(Value::Object(_)) = map.get(*last) {
        warn!("Replacing nested object at '{}' with a string leaf", key_path);
    }
    map.insert(last.to_string(), leaf);
}

fn as_object_mut<'a>(node: &'a mut Value, key_path: &str) -> &'a mut Map<String, Value> {
    if !node.is_object() {
        warn!(
            "Replacing {} with an object while setting '{}'",
            kind(node),
            key_path
        );
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}

/// Read the string leaf at `key_path`, if any.
pub fn get_path<'a>(tree: &'a Value, key_path: &str) -> Option<&'a str> {
    key_path
        .split('.')
        .try_fold(tree, |node, segment| node.get(segment))
        .and_then(Value::as_str)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_tree() {
        let tree = json!({
            "buttons": { "save": "Save", "signOut": "Sign out" },
            "title": "Dashboard",
            "pos": { "receipt": { "total": "Total" } }
        });

        let flat = flatten(&tree, "en");
        assert_eq!(flat.len(), 4);
        assert_eq!(flat["buttons.save"], "Save");
        assert_eq!(flat["buttons.signOut"], "Sign out");
        assert_eq!(flat["title"], "Dashboard");
        assert_eq!(flat["pos.receipt.total"], "Total");
    }

    #[test]
    fn test_flatten_skips_non_string_leaves() {
        let tree = json!({
            "list": ["a", "b"],
            "count": 3,
            "flag": true,
            "nothing": null,
            "ok": "fine"
        });

        let flat = flatten(&tree, "en");
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["ok"], "fine");
    }

    #[test]
    fn test_flatten_skips_dotted_and_empty_keys() {
        let tree = json!({ "a.b": "dotted", "": "empty", "c": "kept" });
        let flat = flatten(&tree, "en");
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn test_flatten_keeps_keys_the_validator_accepts() {
        let tree = json!({
            "errors": { "Not found": "Missing", " padded": "x", "a:b": "colon" },
            "straße": "Street"
        });
        let flat = flatten(&tree, "en");
        assert_eq!(
            flat.keys().collect::<Vec<_>>(),
            vec!["errors.Not found", "errors.a:b", "straße"]
        );
        assert!(flat.keys().all(|k| EntryValidator::is_valid_key_path(k)));
    }

    #[test]
    fn test_flatten_non_object_root_is_empty() {
        assert!(flatten(&json!(["x"]), "en").is_empty());
        assert!(flatten(&json!("x"), "en").is_empty());
    }

    #[test]
    fn test_flatten_all_merges_locales_per_key() {
        let mut trees = BTreeMap::new();
        trees.insert("en".to_string(), json!({ "buttons": { "save": "Save", "close": "Close" } }));
        trees.insert("nl".to_string(), json!({ "buttons": { "save": "Opslaan" } }));

        let merged = flatten_all(&trees);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["buttons.save"]["en"], "Save");
        assert_eq!(merged["buttons.save"]["nl"], "Opslaan");
        assert!(!merged["buttons.close"].contains_key("nl"));
    }

    #[test]
    fn test_unflatten_builds_one_tree_per_locale() {
        let mut entries = FlatEntries::new();
        entries.insert(
            "buttons.save".to_string(),
            [("en", "Save"), ("nl", "Opslaan")]
                .into_iter()
                .map(|(l, v)| (l.to_string(), v.to_string()))
                .collect(),
        );
        entries.insert(
            "title".to_string(),
            [("en".to_string(), "Home".to_string())].into_iter().collect(),
        );

        let trees = unflatten(&entries);
        assert_eq!(trees["en"], json!({ "buttons": { "save": "Save" }, "title": "Home" }));
        assert_eq!(trees["nl"], json!({ "buttons": { "save": "Opslaan" } }));
    }

    #[test]
    fn test_unflatten_colliding_prefix_prefers_object() {
        let mut entries = FlatEntries::new();
        entries.insert("a".to_string(), [("en".to_string(), "leaf".to_string())].into());
        entries.insert("a.b".to_string(), [("en".to_string(), "nested".to_string())].into());

        let trees = unflatten(&entries);
        assert_eq!(trees["en"], json!({ "a": { "b": "nested" } }));
    }

    #[test]
    fn test_set_path_preserves_siblings() {
        let mut tree = json!({ "buttons": { "save": "Save", "manual": "Kept" }, "other": "x" });
        set_path(&mut tree, "buttons.save", json!("Store"));
        set_path(&mut tree, "nav.home", json!("Home"));

        assert_eq!(
            tree,
            json!({
                "buttons": { "save": "Store", "manual": "Kept" },
                "other": "x",
                "nav": { "home": "Home" }
            })
        );
    }

    #[test]
    fn test_get_path() {
        let tree = json!({ "a": { "b": "c" }, "n": 1 });
        assert_eq!(get_path(&tree, "a.b"), Some("c"));
        assert_eq!(get_path(&tree, "a"), None);
        assert_eq!(get_path(&tree, "n"), None);
        assert_eq!(get_path(&tree, "missing.path"), None);
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9_]{0,6}"
    }

    /// Nested string-leaf trees without empty objects.
    fn tree_strategy() -> impl Strategy<Value = Value> {
        let leaf = "[a-zA-Z0-9 ,.!?]{0,12}".prop_map(Value::String);
        leaf.prop_recursive(4, 32, 5, |inner| {
            prop::collection::btree_map(segment(), inner, 1..5)
                .prop_map(|m| Value::Object(m.into_iter().collect()))
        })
        .prop_map(|v| match v {
            Value::Object(_) => v,
            other => json!({ "root": other }),
        })
    }

    proptest! {
        #[test]
        fn prop_unflatten_inverts_flatten(tree in tree_strategy()) {
            let flat = flatten(&tree, "en");
            let mut entries = FlatEntries::new();
            merge_flat(&mut entries, "en", flat);

            let trees = unflatten(&entries);
            prop_assert_eq!(&trees["en"], &tree);
        }

        #[test]
        fn prop_flatten_inverts_unflatten(
            keys in prop::collection::btree_set(
                prop::collection::vec(segment(), 1..4).prop_map(|s| s.join(".")),
                1..12,
            ),
            value in "[a-zA-Z ]{1,10}",
        ) {
            // Drop keys that are a strict prefix of another key.
            let keys: Vec<String> = keys
                .iter()
                .filter(|k| !keys.iter().any(|o| o.starts_with(&format!("{}.", k))))
                .cloned()
                .collect();

            let mut entries = FlatEntries::new();
            for key in &keys {
                entries.insert(
                    key.clone(),
                    [("en".to_string(), format!("{} {}", value, key))].into(),
                );
            }

            let trees = unflatten(&entries);
            let round_trip = flatten_all(&trees);
            prop_assert_eq!(round_trip, entries);
        }
    }
}
