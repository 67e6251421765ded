use serde_json::Value;

/// Normalize a collection value into an ordered `(key, value)` list.
///
/// Collections may be stored either as a map or, when the keys happen
/// to be dense integers, as an array; in the latter case the index is
/// the key and null holes are skipped.  Map entries come out in
/// ascending key order.  Any other non-null value is not
/// a collection and yields nothing.
pub fn normalize(value: Option<Value>) -> Vec<(String, Value)> {
    match value {
        Some(Value::Array(items)) => items.into_iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        Some(Value::Object(map)) => {
            let mut entries = map.into_iter()
                .filter(|(_, item)| !item.is_null())
                .collect::<Vec<_>>();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            entries
        }
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            log::warn!("expected a collection, got a scalar value: {other}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    #[test]
    fn array_form() {
        let result = normalize(Some(json!([{"a": 1}, null, {"a": 3}])));
        assert_eq!(result, vec![
            ("0".to_string(), json!({"a": 1})),
            ("2".to_string(), json!({"a": 3})),
        ]);
    }

    #[test]
    fn map_form() {
        let result = normalize(Some(json!({"t2": true, "t1": true})));
        let keys = result.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, ["t1", "t2"]);
    }

    #[test]
    fn absent_and_scalar() {
        assert!(normalize(None).is_empty());
        assert!(normalize(Some(Value::Null)).is_empty());
        assert!(normalize(Some(json!(true))).is_empty());
    }
}
