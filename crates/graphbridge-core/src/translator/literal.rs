//! Literal and identifier rendering.
//!
//! Every value interpolated into query text goes through [`render_literal`],
//! and every label, field or relationship name through [`identifier`].

use serde_json::Value;

/// Target query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// PGQL / SQL as accepted by the REST graph service.
    Pgql,
    /// Cypher as accepted by the native store.
    Cypher,
}

/// Quote a string literal for the dialect.
///
/// PGQL/SQL double embedded single quotes; Cypher uses backslash escapes.
pub fn quote(dialect: Dialect, s: &str) -> String {
    match dialect {
        Dialect::Pgql => format!("'{}'", s.replace('\'', "''")),
        Dialect::Cypher => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('\'');
            for c in s.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '\'' => out.push_str("\\'"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    other => out.push(other),
                }
            }
            out.push('\'');
            out
        }
    }
}

/// Render a JSON value as a literal. Arrays render as the dialect's list form.
pub fn render_literal(dialect: Dialect, value: &Value) -> String {
    match value {
        Value::String(s) => quote(dialect, s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => match dialect {
            Dialect::Pgql => "NULL".to_string(),
            Dialect::Cypher => "null".to_string(),
        },
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(|v| render_literal(dialect, v)).collect();
            match dialect {
                Dialect::Pgql => format!("({})", rendered.join(", ")),
                Dialect::Cypher => format!("[{}]", rendered.join(", ")),
            }
        }
        Value::Object(_) => quote(dialect, &value.to_string()),
    }
}

/// Reduce a label, field or relationship name to `[A-Za-z0-9_]`.
pub fn identifier(name: &str) -> String {
    let safe: String = name
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if safe.is_empty() {
        "_".to_string()
    } else {
        safe
    }
}

/// Text of a value used inside a pattern predicate.
pub fn pattern_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert an SQL `LIKE` pattern to an anchored regular expression.
pub fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_escapes_embedded_quotes() {
        assert_eq!(quote(Dialect::Pgql, "O'Brien"), "'O''Brien'");
        assert_eq!(quote(Dialect::Cypher, "O'Brien"), "'O\\'Brien'");
        assert_eq!(quote(Dialect::Cypher, "a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_injection_attempt_stays_inside_literal() {
        let hostile = "x' OR 1=1 --";
        assert_eq!(quote(Dialect::Pgql, hostile), "'x'' OR 1=1 --'");
        assert_eq!(quote(Dialect::Cypher, hostile), "'x\\' OR 1=1 --'");
    }

    #[test]
    fn test_render_lists() {
        let list = json!(["a", 1, true]);
        assert_eq!(render_literal(Dialect::Pgql, &list), "('a', 1, true)");
        assert_eq!(render_literal(Dialect::Cypher, &list), "['a', 1, true]");
        assert_eq!(render_literal(Dialect::Pgql, &Value::Null), "NULL");
    }

    #[test]
    fn test_identifier_strips_punctuation() {
        assert_eq!(identifier("WORKS_IN"), "WORKS_IN");
        assert_eq!(identifier("name) DETACH DELETE (n"), "nameDETACHDELETEn");
        assert_eq!(identifier("  "), "_");
    }

    #[test]
    fn test_like_to_regex() {
        assert_eq!(like_to_regex("Al%n_"), "Al.*n.");
        assert_eq!(like_to_regex("a.b%"), "a\\.b.*");
    }
}
