use serde_json::{Map, Value};
use std::io;

/// Write output as CSV to stdout.
///
/// Projections are written one row per period; the sensitivity grid one row
/// per discount rate; anything else as field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let body = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match body {
        Value::Object(map) => {
            if let Some(Value::Array(periods)) = map.get("periods") {
                write_rows(&mut wtr, periods);
            } else if let Some(Value::Array(matrix)) = map.get("matrix") {
                write_grid(&mut wtr, map, matrix);
            } else if let Some(Value::Array(entries)) = map.get("entries") {
                write_rows(&mut wtr, entries);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        }
        Value::Array(arr) => write_rows(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(body)]);
        }
    }

    let _ = wtr.flush();
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    let rows: Vec<Map<String, Value>> = arr
        .iter()
        .filter_map(|v| v.as_object().map(flatten_entry))
        .collect();

    let Some(first) = rows.first() else {
        return;
    };
    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);

    for row in &rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| row.get(*h).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&cells);
    }
}

fn write_grid(
    wtr: &mut csv::Writer<io::StdoutLock<'_>>,
    map: &Map<String, Value>,
    matrix: &[Value],
) {
    let cols: Vec<String> = map
        .get("sales_growth_rate_values")
        .and_then(Value::as_array)
        .map(|vals| vals.iter().map(format_csv_value).collect())
        .unwrap_or_default();
    let rows: Vec<String> = map
        .get("discount_rate_values")
        .and_then(Value::as_array)
        .map(|vals| vals.iter().map(format_csv_value).collect())
        .unwrap_or_default();

    let mut header = vec!["discount_rate \\ sales_growth".to_string()];
    header.extend(cols);
    let _ = wtr.write_record(&header);

    for (label, row) in rows.iter().zip(matrix) {
        let mut record = vec![label.clone()];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

/// Lift the resolved entry's fields next to the period's own columns.
fn flatten_entry(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, val) in map {
        match val {
            Value::Object(inner) => {
                for (inner_key, inner_val) in inner {
                    out.insert(inner_key.clone(), inner_val.clone());
                }
            }
            _ => {
                out.insert(key.clone(), val.clone());
            }
        }
    }
    out
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
