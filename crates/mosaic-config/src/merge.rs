//! TOML tree merging.

use std::collections::BTreeSet;

/// Recursively deep-merge `overlay` into `base`.
///
/// Tables merge per key; scalars and arrays from the overlay replace the
/// base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Dotted paths of every leaf value in `value` (`manifest.cache_ttl_secs`).
#[must_use]
pub fn leaf_paths(value: &toml::Value) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    collect_leaves(value, "", &mut paths);
    paths
}

fn collect_leaves(value: &toml::Value, prefix: &str, paths: &mut BTreeSet<String>) {
    match value {
        toml::Value::Table(table) => {
            for (key, child) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_leaves(child, &path, paths);
            }
        },
        _ => {
            paths.insert(prefix.to_owned());
        },
    }
}
