use serde_json::{Map, Value};

/// Diagram configuration overrides, addressed by dotted paths such as `layout.tileWidth`.
///
/// Consumers read typed values with their own fallbacks, so an empty config is always valid.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramConfig(Value);

impl Default for DiagramConfig {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl DiagramConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn lookup(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.lookup(dotted_path)?.as_str()
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.lookup(dotted_path)?.as_bool()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        let v = self.lookup(dotted_path)?;
        v.as_f64()
            .or_else(|| v.as_i64().map(|n| n as f64))
            .or_else(|| v.as_u64().map(|n| n as f64))
            .filter(|n| n.is_finite())
    }

    pub fn get_usize(&self, dotted_path: &str) -> Option<usize> {
        let v = self.lookup(dotted_path)?;
        v.as_u64()
            .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n as usize)
    }

    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        // Configs built through `from_value` may hold a non-object root; coerce instead of panicking.
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }

        let Value::Object(ref mut root) = self.0 else {
            return;
        };
        let mut cur: &mut Map<String, Value> = root;
        let mut segments = dotted_path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                cur.insert(seg.to_string(), value);
                return;
            }
            let slot = cur.entry(seg).or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            cur = next;
        }
    }

    pub fn deep_merge(&mut self, other: &Value) {
        deep_merge_value(&mut self.0, other);
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_getters_coerce_numbers() {
        let cfg = DiagramConfig::from_value(json!({
            "layout": { "tileWidth": 60, "laneStep": 7.5, "maxTilesPerGroup": 6 },
            "theme": "dark"
        }));
        assert_eq!(cfg.get_f64("layout.tileWidth"), Some(60.0));
        assert_eq!(cfg.get_f64("layout.laneStep"), Some(7.5));
        assert_eq!(cfg.get_usize("layout.maxTilesPerGroup"), Some(6));
        assert_eq!(cfg.get_str("theme"), Some("dark"));
        assert_eq!(cfg.get_f64("layout.missing"), None);
        assert_eq!(cfg.get_str("layout.tileWidth"), None);
    }

    #[test]
    fn deep_merge_keeps_siblings() {
        let mut cfg = DiagramConfig::from_value(json!({ "layout": { "tileWidth": 56, "tileGap": 8 } }));
        cfg.deep_merge(&json!({ "layout": { "tileGap": 12 }, "theme": "light" }));
        assert_eq!(cfg.get_f64("layout.tileWidth"), Some(56.0));
        assert_eq!(cfg.get_f64("layout.tileGap"), Some(12.0));
        assert_eq!(cfg.get_str("theme"), Some("light"));
    }

    #[test]
    fn set_value_recovers_from_non_object_root() {
        let mut cfg = DiagramConfig::from_value(json!(3));
        cfg.set_value("layout.laneStep", json!(4));
        assert_eq!(cfg.get_f64("layout.laneStep"), Some(4.0));
    }
}
