//! Result-set serialization for downloads.

use adhoc_core::ExecutionError;

/// MIME type for a supported download format.
pub(crate) fn content_type_for(format: &str) -> Option<&'static str> {
    match format {
        "csv" => Some("text/csv"),
        "tsv" => Some("text/tab-separated-values"),
        "json" => Some("application/json"),
        _ => None,
    }
}

/// Serialize `columns` + `rows` into the requested format.
pub(crate) fn serialize_rows(
    columns: &[String],
    rows: &[Vec<String>],
    format: &str,
) -> Result<Vec<u8>, ExecutionError> {
    match format {
        "csv" => Ok(to_delimited(columns, rows, ',').into_bytes()),
        "tsv" => Ok(to_delimited(columns, rows, '\t').into_bytes()),
        "json" => to_json(columns, rows),
        other => Err(ExecutionError::InvalidParameter(format!(
            "unsupported download format '{}'",
            other
        ))),
    }
}

fn to_delimited(columns: &[String], rows: &[Vec<String>], delimiter: char) -> String {
    let mut out = String::new();
    push_record(&mut out, columns.iter().map(String::as_str), delimiter);
    for row in rows {
        push_record(&mut out, row.iter().map(String::as_str), delimiter);
    }
    out
}

fn push_record<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, delimiter: char) {
    let mut first = true;
    for cell in cells {
        if !first {
            out.push(delimiter);
        }
        first = false;
        out.push_str(&escape_cell(cell, delimiter));
    }
    out.push('\n');
}

/// RFC 4180-style quoting: wrap cells containing the delimiter, a quote, or
/// a line break, doubling embedded quotes.
fn escape_cell(cell: &str, delimiter: char) -> String {
    if cell.contains(delimiter) || cell.contains('"') || cell.contains('\n') || cell.contains('\r')
    {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// JSON array of objects, column name → cell value.
fn to_json(columns: &[String], rows: &[Vec<String>]) -> Result<Vec<u8>, ExecutionError> {
    let objects: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            let map: serde_json::Map<String, serde_json::Value> = columns
                .iter()
                .zip(row.iter())
                .map(|(c, v)| (c.clone(), serde_json::Value::String(v.clone())))
                .collect();
            serde_json::Value::Object(map)
        })
        .collect();

    serde_json::to_vec(&objects).map_err(|e| ExecutionError::Internal(e.to_string()))
}
