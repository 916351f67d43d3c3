//! Splitting of multi-valued option lines.
//!
//! A single `key=value1 value2` line may carry several values separated by
//! whitespace. Double quotes group whitespace into one value.

/// Split an option value into its whitespace-separated values.
///
/// Double quotes start and end a quoted span in which whitespace is kept.
/// The quote characters themselves are dropped, and a quoted span glued to
/// unquoted text (`a"b c"d`) stays part of the same value. An unterminated
/// quote runs to the end of the line.
pub fn parse_multivalue_line(line: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;

    for ch in line.chars() {
        if ch == '"' {
            in_quote = !in_quote;
            continue;
        }

        if ch.is_whitespace() && !in_quote {
            if !current.is_empty() {
                values.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if !current.is_empty() {
        values.push(current);
    }

    values
}
