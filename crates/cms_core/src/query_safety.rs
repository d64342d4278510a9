/// Returns true iff `name` is safe to interpolate as a quoted SQL identifier:
/// `[A-Za-z_][A-Za-z0-9_]*`. Every builder method that accepts a table or column
/// name validates through this before emitting SQL.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    Normal,
    LineComment,
    BlockComment,
    SingleQuote,
    DoubleQuote,
}

/// Strips `--` and `/* */` comments from `sql`, respecting quoted strings, so that
/// downstream keyword/statement-count checks cannot be defeated by a comment.
pub fn strip_comments(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut result = String::with_capacity(sql.len());
    let mut index = 0;
    let mut state = ScanState::Normal;

    while index < chars.len() {
        let current = chars[index];
        let next = chars.get(index + 1).copied();

        match state {
            ScanState::Normal => {
                if current == '-' && next == Some('-') {
                    state = ScanState::LineComment;
                    index += 2;
                    continue;
                }
                if current == '/' && next == Some('*') {
                    state = ScanState::BlockComment;
                    index += 2;
                    continue;
                }
                if current == '\'' {
                    state = ScanState::SingleQuote;
                } else if current == '"' {
                    state = ScanState::DoubleQuote;
                }
                result.push(current);
                index += 1;
            }
            ScanState::LineComment => {
                if current == '\n' {
                    result.push('\n');
                    state = ScanState::Normal;
                }
                index += 1;
            }
            ScanState::BlockComment => {
                if current == '*' && next == Some('/') {
                    state = ScanState::Normal;
                    index += 2;
                } else {
                    index += 1;
                }
            }
            ScanState::SingleQuote => {
                result.push(current);
                if current == '\'' {
                    if next == Some('\'') {
                        result.push('\'');
                        index += 2;
                        continue;
                    }
                    state = ScanState::Normal;
                }
                index += 1;
            }
            ScanState::DoubleQuote => {
                result.push(current);
                if current == '"' {
                    if next == Some('"') {
                        result.push('"');
                        index += 2;
                        continue;
                    }
                    state = ScanState::Normal;
                }
                index += 1;
            }
        }
    }

    result
}

/// Returns true if `sql` (already comment-stripped) contains more than one statement.
pub fn has_multiple_statements(sql: &str) -> bool {
    let mut state = ScanState::Normal;
    let mut seen_semicolon = false;
    let chars: Vec<char> = sql.chars().collect();
    let mut index = 0;

    while index < chars.len() {
        let current = chars[index];
        let next = chars.get(index + 1).copied();

        match state {
            ScanState::Normal => {
                if current == '\'' {
                    state = ScanState::SingleQuote;
                } else if current == '"' {
                    state = ScanState::DoubleQuote;
                } else if current == ';' {
                    seen_semicolon = true;
                } else if seen_semicolon && !current.is_whitespace() {
                    return true;
                }
            }
            ScanState::SingleQuote => {
                if current == '\'' {
                    if next == Some('\'') {
                        index += 1;
                    } else {
                        state = ScanState::Normal;
                    }
                }
            }
            ScanState::DoubleQuote => {
                if current == '"' {
                    if next == Some('"') {
                        index += 1;
                    } else {
                        state = ScanState::Normal;
                    }
                }
            }
            ScanState::LineComment | ScanState::BlockComment => {}
        }
        index += 1;
    }

    false
}

fn first_keyword(sql: &str) -> Option<String> {
    sql.split_whitespace()
        .map(|part| part.trim_start_matches(|c: char| !c.is_ascii_alphabetic()))
        .find(|part| !part.is_empty())
        .map(|part| {
            part.chars()
                .take_while(|ch| ch.is_ascii_alphabetic())
                .collect::<String>()
                .to_ascii_uppercase()
        })
        .filter(|word| !word.is_empty())
}

/// Returns true iff `sql` is a single read-only statement: no trailing statements
/// after comment stripping, and its leading keyword is one of the read-only forms.
pub fn is_safe_read_query(sql: &str) -> bool {
    let stripped = strip_comments(sql);
    let trimmed = stripped.trim();

    if trimmed.is_empty() || has_multiple_statements(trimmed) {
        return false;
    }

    let Some(keyword) = first_keyword(trimmed) else {
        return false;
    };

    matches!(keyword.as_str(), "SELECT" | "SHOW" | "EXPLAIN" | "WITH" | "DESC" | "DESCRIBE")
}
