use once_cell::sync::Lazy;
use regex::Regex;

// One or more code tokens (optional uppercase letters, then digits), each followed by whitespace
static CODE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[A-Z]*\d+\s+)+").unwrap());

/// Remove a leading administrative code ("08 Barcelona" -> "Barcelona")
pub fn strip_code(name: &str) -> &str {
    match CODE_PREFIX.find(name) {
        Some(m) => &name[m.end()..],
        None => name,
    }
}

/// Check whether a name carries a code prefix
pub fn has_code(name: &str) -> bool {
    CODE_PREFIX.is_match(name)
}
