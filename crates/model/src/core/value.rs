use serde_json::Value;

/// Separator used when a multi-valued field is flattened into one cell.
pub const MULTI_VALUE_SEPARATOR: &str = ", ";

/// Renders a single field value the way it is shown in a result cell.
///
/// Strings are emitted without quotes, nulls as an empty string and
/// structured values as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Joins a field's value list into one display string.
///
/// Backends return projected fields as arrays; a scalar is treated as a
/// one-element list.
pub fn join_values(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(MULTI_VALUE_SEPARATOR),
        other => display_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_multi_valued_fields() {
        assert_eq!(join_values(&json!(["a", "b", 3])), "a, b, 3");
        assert_eq!(join_values(&json!([true])), "true");
        assert_eq!(join_values(&json!([])), "");
    }

    #[test]
    fn scalar_is_a_single_value() {
        assert_eq!(join_values(&json!("solo")), "solo");
        assert_eq!(join_values(&json!(1.5)), "1.5");
        assert_eq!(join_values(&Value::Null), "");
    }

    #[test]
    fn nested_objects_render_as_json() {
        assert_eq!(join_values(&json!([{"k": 1}])), r#"{"k":1}"#);
    }
}
