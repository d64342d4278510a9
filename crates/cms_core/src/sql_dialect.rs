use crate::value::Value;

/// Placeholder syntax a dialect expects bound parameters to use in emitted SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`, used by both MySQL and SQLite.
    QuestionMark,
}

/// Per-backend rules for quoting identifiers, escaping inline literals and
/// reading back the last generated id.
///
/// Bound parameters are the primary defense against injection (see
/// [`crate::query_safety`]); the literal/escaping methods here exist only for the
/// narrow set of call sites that cannot bind (e.g. a dialect-specific `LIMIT`
/// clause folded into static SQL text).
pub trait SqlDialect: Send + Sync {
    fn quote_identifier(&self, name: &str) -> String;

    fn value_to_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(s) => format!("'{}'", self.escape_string(s)),
        }
    }

    fn escape_string(&self, s: &str) -> String;

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    /// Whether `INSERT ... RETURNING id` can be used to fetch a generated key,
    /// as opposed to a follow-up `last_insert_id()`-style call.
    fn supports_returning(&self) -> bool;
}

pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn escape_string(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for ch in s.chars() {
            match ch {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                '\0' => out.push_str("\\0"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                _ => out.push(ch),
            }
        }
        out
    }

    fn supports_returning(&self) -> bool {
        false
    }
}

pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn escape_string(&self, s: &str) -> String {
        s.replace('\'', "''")
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_quotes_with_backticks() {
        assert_eq!(MySqlDialect.quote_identifier("users"), "`users`");
        assert_eq!(MySqlDialect.quote_identifier("weird`name"), "`weird``name`");
    }

    #[test]
    fn sqlite_quotes_with_double_quotes() {
        assert_eq!(SqliteDialect.quote_identifier("users"), "\"users\"");
    }

    #[test]
    fn escaping_doubles_quotes() {
        assert_eq!(MySqlDialect.escape_string("o'brien"), "o''brien");
        assert_eq!(SqliteDialect.escape_string("o'brien"), "o''brien");
    }

    #[test]
    fn returning_support_differs_per_backend() {
        assert!(!MySqlDialect.supports_returning());
        assert!(SqliteDialect.supports_returning());
    }
}
