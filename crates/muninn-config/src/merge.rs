/// Deep merge two TOML values. Overlay wins for non-table values; tables
/// are merged recursively (project-level keys override built-in defaults).
/// Mirrors the teacher's `csa-config::config_merge::merge_toml_values`.
pub(crate) fn merge_toml_values(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_map), toml::Value::Table(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged_val = match base_map.remove(&key) {
                    Some(base_val) => merge_toml_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged_val);
            }
            toml::Value::Table(base_map)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Value;

    #[test]
    fn test_merge_overlay_scalar_wins() {
        let base: Value = toml::from_str("x = 1").unwrap();
        let overlay: Value = toml::from_str("x = 2").unwrap();
        let merged = merge_toml_values(base, overlay);
        assert_eq!(merged.get("x").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn test_merge_recurses_into_tables() {
        let base: Value = toml::from_str("[cache]\ncapacity = 1000\nttl_secs = 300").unwrap();
        let overlay: Value = toml::from_str("[cache]\ncapacity = 2000").unwrap();
        let merged = merge_toml_values(base, overlay);
        let cache = merged.get("cache").unwrap();
        assert_eq!(cache.get("capacity").unwrap().as_integer(), Some(2000));
        assert_eq!(cache.get("ttl_secs").unwrap().as_integer(), Some(300));
    }
}
