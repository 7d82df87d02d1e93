use std::collections::HashMap;
use std::ops::Range;
use std::str::FromStr;

/// Split a player line into arguments, keeping double-quoted runs together.
///
/// A closing quote ends the current argument; empty quoted strings produce
/// nothing. An unterminated quote keeps whatever it collected.
pub fn split_args(line: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut current: String = String::new();
    let mut in_quote: bool = false;

    for c in line.chars() {
        if c == '"' {
            in_quote = !in_quote;
            if !in_quote && !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
        } else if c.is_whitespace() && !in_quote {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Parse a `\key\value\key\value` info string. A trailing key without a
/// value is dropped and later duplicates win.
pub fn parse_info_string(line: &str) -> HashMap<String, String> {
    let mut parts: Vec<&str> = line.split('\\').collect();
    if parts.first() == Some(&"") {
        parts.remove(0);
    }

    parts
        .chunks_exact(2)
        .map(|pair| (pair[0].to_owned(), pair[1].to_owned()))
        .collect()
}

/// Get the characters of `line` in `range`, clamped to the line's length.
///
/// Offsets count characters, which for decoded 8-bit text are the bytes
/// the server laid the column out in.
pub fn column(line: &str, range: Range<usize>) -> String {
    line.chars()
        .skip(range.start)
        .take(range.end.saturating_sub(range.start))
        .collect()
}

/// Parse a numeric field, falling back to the type's default on garbage.
pub fn lenient<T: FromStr + Default>(field: Option<&String>) -> T {
    field
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_default()
}
