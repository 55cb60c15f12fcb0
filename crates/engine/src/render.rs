//! SQL template rendering with parameter substitution.
//!
//! This is a pass-through substitution, not a templating language: `{name}`
//! placeholders are replaced with caller-supplied values, everything else is
//! copied verbatim. Deterministic, so dry-run and real execution share the
//! exact same rendered SQL.

use std::collections::HashMap;

/// Substitute `{name}` placeholders in `template` with parameter values.
///
/// Values that parse as numbers or booleans are inserted unquoted; all other
/// values become single-quoted SQL string literals with embedded quotes
/// doubled. Placeholders with no matching parameter are left verbatim.
pub fn render(template: &str, parameters: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = find_placeholder_end(bytes, i) {
                let name = &template[i + 1..end];
                if let Some(value) = parameters.get(name) {
                    out.push_str(&quote_value(value));
                } else {
                    // Unknown placeholder: keep it visible, never drop it.
                    out.push_str(&template[i..=end]);
                }
                i = end + 1;
                continue;
            }
        }
        let ch = template[i..].chars().next().expect("in-bounds char");
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}

/// Find the index of the closing `}` for a placeholder starting at `start`,
/// requiring a non-empty identifier name between the braces.
fn find_placeholder_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'}' => return if j > start + 1 { Some(j) } else { None },
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' => j += 1,
            _ => return None,
        }
    }
    None
}

/// Quote a parameter value as a SQL literal unless it is numeric or boolean.
fn quote_value(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.parse::<i64>().is_ok() || trimmed.parse::<f64>().is_ok() {
        return trimmed.to_string();
    }
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return trimmed.to_ascii_lowercase();
    }
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_string_parameter_is_quoted() {
        let sql = render(
            "SELECT * FROM t WHERE d = {date}",
            &params(&[("date", "2026-01-01")]),
        );
        assert_eq!(sql, "SELECT * FROM t WHERE d = '2026-01-01'");
    }

    #[test]
    fn test_numeric_parameter_is_unquoted() {
        let sql = render("SELECT * FROM t LIMIT {limit}", &params(&[("limit", "10")]));
        assert_eq!(sql, "SELECT * FROM t LIMIT 10");

        let sql = render("WHERE score > {min}", &params(&[("min", "0.75")]));
        assert_eq!(sql, "WHERE score > 0.75");
    }

    #[test]
    fn test_boolean_parameter_is_unquoted() {
        let sql = render("WHERE active = {flag}", &params(&[("flag", "TRUE")]));
        assert_eq!(sql, "WHERE active = true");
    }

    #[test]
    fn test_embedded_quote_is_doubled() {
        let sql = render("WHERE name = {n}", &params(&[("n", "O'Brien")]));
        assert_eq!(sql, "WHERE name = 'O''Brien'");
    }

    #[test]
    fn test_unresolved_placeholder_left_verbatim() {
        let sql = render("WHERE a = {known} AND b = {unknown}", &params(&[("known", "1")]));
        assert_eq!(sql, "WHERE a = 1 AND b = {unknown}");
    }

    #[test]
    fn test_braces_without_identifier_untouched() {
        let sql = render("SELECT '{}' AS x, '{not valid}' AS y", &params(&[]));
        assert_eq!(sql, "SELECT '{}' AS x, '{not valid}' AS y");
    }

    #[test]
    fn test_multiple_occurrences_of_same_placeholder() {
        let sql = render(
            "WHERE a = {v} OR b = {v}",
            &params(&[("v", "x")]),
        );
        assert_eq!(sql, "WHERE a = 'x' OR b = 'x'");
    }

    #[test]
    fn test_determinism() {
        let p = params(&[("date", "2026-01-01"), ("limit", "5")]);
        let a = render("SELECT 1 WHERE d={date} LIMIT {limit}", &p);
        let b = render("SELECT 1 WHERE d={date} LIMIT {limit}", &p);
        assert_eq!(a, b);
    }
}
