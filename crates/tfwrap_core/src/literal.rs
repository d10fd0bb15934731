//! HCL literal helpers shared by the extractor and the generator.

use std::sync::OnceLock;

use regex::Regex;

/// Quote `value` as an HCL string literal.
///
/// Template sequences are escaped so the literal never interpolates.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether `name` can be used as a bare attribute in a traversal.
pub fn is_identifier(name: &str) -> bool {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
        .is_match(name)
}

/// Build `<prefix>.<name>`, falling back to index syntax for names that are
/// not plain identifiers.
pub fn attribute_path(prefix: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{}.{}", prefix, name)
    } else {
        format!("{}[{}]", prefix, quote_string(name))
    }
}
