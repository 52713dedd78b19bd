use serde_json::Value;

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", render_minimal(value));
}

/// Heuristic: look for well-known result fields in order of priority,
/// then fall back to the first field in the result object.
fn render_minimal(value: &Value) -> String {
    // Try to extract the "result" envelope
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    // Priority list of key output fields
    let priority_keys = ["total_present_value", "base_case_value", "remaining_years"];

    if let Value::Object(map) = result_obj {
        // An empty projection or a null base case is an undefined valuation,
        // not a zero price
        if let Some(Value::Array(periods)) = map.get("periods") {
            if periods.is_empty() {
                return "undefined".to_string();
            }
        }
        if map.get("base_case_value").is_some_and(Value::is_null) {
            return "undefined".to_string();
        }

        // Try priority keys first (skip null values)
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    return format_minimal(val);
                }
            }
        }

        // Fall back to first field
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_minimal(val));
        }
    }

    // Not an object, just print directly
    format_minimal(result_obj)
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_projection_prints_total() {
        let out = json!({
            "result": {
                "remaining_years": "2",
                "periods": [{ "period_index": 0 }],
                "total_present_value": "405771.74"
            }
        });
        assert_eq!(render_minimal(&out), "405771.74");
    }

    #[test]
    fn test_empty_projection_is_undefined() {
        let out = json!({
            "result": {
                "remaining_years": "-1",
                "periods": [],
                "total_present_value": "0"
            }
        });
        assert_eq!(render_minimal(&out), "undefined");
    }

    #[test]
    fn test_null_base_case_is_undefined() {
        let out = json!({
            "result": {
                "discount_rate_values": ["-100"],
                "matrix": [[null]],
                "base_case_value": null,
                "base_case_position": [0, 0]
            }
        });
        assert_eq!(render_minimal(&out), "undefined");
    }

    #[test]
    fn test_base_case_value_printed() {
        let out = json!({ "result": { "base_case_value": "1250000.5" } });
        assert_eq!(render_minimal(&out), "1250000.5");
    }
}
