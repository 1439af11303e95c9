//! A minimal LDAP-filter matcher: `(attr=value)` and `(&(f1)(f2)...)`.
//! Enough for the fixed set of filters the master issues against the
//! in-memory directory; anything fancier goes to the real LDAP backend.

use crate::directory::Entry;

pub fn matches_filter(filter: &str, entry: &Entry) -> bool {
    let filter = filter.trim();
    if let Some(rest) = filter.strip_prefix("(&").and_then(|s| s.strip_suffix(')')) {
        return split_clauses(rest).iter().all(|c| matches_filter(c, entry));
    }
    let Some(inner) = filter.strip_prefix('(').and_then(|s| s.strip_suffix(')')) else {
        return false;
    };
    let Some((attr, value)) = inner.split_once('=') else {
        return false;
    };
    entry
        .get(attr)
        .map(|values| values.iter().any(|v| v == value))
        .unwrap_or(false)
}

fn split_clauses(s: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    clauses.push(&s[start..=i]);
                }
            }
            _ => {}
        }
    }
    clauses
}
