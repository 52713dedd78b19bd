use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Scalar fields go into a Field/Value table; arrays of objects (projection
/// periods, yearly entries) get a table of their own with one row per item.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object(res_map),
        _ => println!("{}", format_value(result)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_object(map: &Map<String, Value>) {
    let mut scalars = Vec::new();
    let mut sections = Vec::new();

    for (key, val) in map {
        match val {
            Value::Array(items) if items.iter().all(Value::is_object) && !items.is_empty() => {
                sections.push((key.as_str(), items.as_slice()));
            }
            Value::Object(inner) => {
                for (inner_key, inner_val) in flatten(inner) {
                    scalars.push((format!("{key}.{inner_key}"), format_value(&inner_val)));
                }
            }
            _ => scalars.push((key.clone(), format_value(val))),
        }
    }

    if !scalars.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in &scalars {
            builder.push_record([key.as_str(), val.as_str()]);
        }
        println!("{}", Table::from(builder));
    }

    for (key, items) in sections {
        println!("\n{key}:");
        print_array_table(items);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    let rows: Vec<Vec<(String, Value)>> = arr
        .iter()
        .map(|item| match item {
            Value::Object(map) => flatten(map),
            other => vec![("value".to_string(), other.clone())],
        })
        .collect();

    let headers: Vec<String> = rows
        .first()
        .map(|r| r.iter().map(|(k, _)| k.clone()).collect())
        .unwrap_or_default();

    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in &rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| {
                row.iter()
                    .find(|(k, _)| k == h)
                    .map(|(_, v)| format_value(v))
                    .unwrap_or_default()
            })
            .collect();
        builder.push_record(cells);
    }

    println!("{}", Table::from(builder));
}

/// Flatten one level of nested objects into dotted keys, dropping the
/// parent prefix for the resolved entry so its columns read naturally.
fn flatten(map: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    for (key, val) in map {
        match val {
            Value::Object(inner) => {
                for (inner_key, inner_val) in inner {
                    let name = if key == "resolved_entry" {
                        inner_key.clone()
                    } else {
                        format!("{key}.{inner_key}")
                    };
                    out.push((name, inner_val.clone()));
                }
            }
            _ => out.push((key.clone(), val.clone())),
        }
    }
    out
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "—".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
