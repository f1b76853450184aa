// destructure.rs — Placeholder destructuring of a single token
//
// Splits one command-line token into literal text and looked-up payloads.
// Keys are tested in the lookup's iteration order and the first key found
// anywhere in the remaining text wins, even when another key occurs earlier
// by position. Callers relying on positional order must order the lookup.
//
// Preconditions: none.
// Postconditions: concatenating literals and payload keys in order
//   reproduces the input token exactly.
// Failure modes: none.
// Side effects: none.

use indexmap::IndexMap;

/// One piece of a destructured token.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment<'a, T> {
    Literal(String),
    /// The lookup entry whose key matched at this position.
    Payload { key: &'a str, value: &'a T },
}

/// Split `token` against `lookup`. Empty keys never match.
pub fn destructure<'a, T>(token: &str, lookup: &'a IndexMap<String, T>) -> Vec<Fragment<'a, T>> {
    if token.is_empty() {
        return vec![Fragment::Literal(String::new())];
    }
    let mut out = Vec::new();
    split_into(token, lookup, &mut out);
    out
}

fn split_into<'a, T>(text: &str, lookup: &'a IndexMap<String, T>, out: &mut Vec<Fragment<'a, T>>) {
    if text.is_empty() {
        return;
    }
    let found = lookup
        .iter()
        .filter(|(key, _)| !key.is_empty())
        .find_map(|(key, value)| text.find(key.as_str()).map(|pos| (pos, key, value)));

    match found {
        Some((pos, key, value)) => {
            split_into(&text[..pos], lookup, out);
            out.push(Fragment::Payload {
                key: key.as_str(),
                value,
            });
            split_into(&text[pos + key.len()..], lookup, out);
        }
        None => out.push(Fragment::Literal(text.to_string())),
    }
}

/// Rebuild the token text from fragments, substituting each payload's key.
pub fn reassemble<T>(fragments: &[Fragment<'_, T>]) -> String {
    fragments
        .iter()
        .map(|f| match f {
            Fragment::Literal(s) => s.as_str(),
            Fragment::Payload { key, .. } => *key,
        })
        .collect()
}
