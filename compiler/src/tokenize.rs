// tokenize.rs — Command-template tokenizer
//
// Splits a command template into argument tokens using one fixed, shell-like
// quoting dialect. Uses the `logos` crate to lex the template into segments
// (blanks, quoted runs, escapes, bare runs); adjacent non-blank segments are
// glued into one argument.
//
// Quoting rules:
//   - single quotes: content fully literal, backslashes included
//   - double quotes: `\` escapes only `\`, `"`, `$`, backtick and newline;
//     any other escaped character keeps its backslash
//   - outside quotes: `\` escapes the next character, whitespace included
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns the argument list in template order; empty or
//   blank input yields an empty list.
// Failure modes: missing template, unterminated quote, trailing backslash.
//   A broken template is rejected outright (no partial token list).
// Side effects: none.

use logos::Logos;
use thiserror::Error;

/// Hard failure while tokenizing a command template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("command template is missing")]
    Missing,
    #[error("unclosed {quote} quote starting at byte {offset}")]
    UnclosedQuote { quote: char, offset: usize },
    #[error("trailing backslash at byte {offset}")]
    TrailingBackslash { offset: usize },
}

/// Lexical segments of a command template.
#[derive(Logos, Debug, Clone, PartialEq)]
enum Segment {
    /// Run of whitespace: argument separator.
    #[regex(r"\s+")]
    Blank,

    #[regex(r"'[^']*'", single_quoted)]
    SingleQuoted(String),

    #[regex(r#""([^"\\]|\\(.|\n))*""#, double_quoted)]
    DoubleQuoted(String),

    /// Backslash outside quotes: the next character, verbatim.
    #[regex(r"\\(.|\n)", escaped)]
    Escaped(char),

    #[regex(r#"[^\s'"\\]+"#)]
    Bare,
}

// ── Callbacks ──

fn single_quoted(lex: &mut logos::Lexer<'_, Segment>) -> String {
    let slice = lex.slice();
    slice[1..slice.len() - 1].to_string()
}

fn double_quoted(lex: &mut logos::Lexer<'_, Segment>) -> String {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        // The segment regex guarantees a character follows every backslash.
        if let Some(next) = chars.next() {
            if !matches!(next, '\\' | '"' | '$' | '`' | '\n') {
                result.push('\\');
            }
            result.push(next);
        }
    }
    result
}

fn escaped(lex: &mut logos::Lexer<'_, Segment>) -> Option<char> {
    lex.slice()[1..].chars().next()
}

// ── Public API ──

/// Split a command template into argument tokens.
///
/// ```
/// let args = styx::tokenize::tokenize("tool 'hello world' [INPUT1]").unwrap();
/// assert_eq!(args, vec!["tool", "hello world", "[INPUT1]"]);
/// ```
pub fn tokenize(template: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (segment, range) in Segment::lexer(template).spanned() {
        match segment {
            Ok(Segment::Blank) => flush(&mut current, &mut tokens),
            Ok(Segment::SingleQuoted(text)) | Ok(Segment::DoubleQuoted(text)) => {
                current.push_str(&text)
            }
            Ok(Segment::Escaped(c)) => current.push(c),
            Ok(Segment::Bare) => current.push_str(&template[range]),
            Err(()) => return Err(classify_error(template, range.start)),
        }
    }
    flush(&mut current, &mut tokens);

    Ok(tokens)
}

/// Like [`tokenize`], but for a template that may be absent (e.g. a
/// descriptor field that is missing or not a string).
pub fn tokenize_opt(template: Option<&str>) -> Result<Vec<String>, TokenizeError> {
    match template {
        Some(t) => tokenize(t),
        None => Err(TokenizeError::Missing),
    }
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// Map a lexer error position to the construct that failed to close.
/// Only a quote or a backslash can start an unmatched segment.
fn classify_error(template: &str, offset: usize) -> TokenizeError {
    match template[offset..].chars().next() {
        Some('\\') => TokenizeError::TrailingBackslash { offset },
        Some(quote @ ('\'' | '"')) => TokenizeError::UnclosedQuote { quote, offset },
        _ => TokenizeError::UnclosedQuote { quote: '"', offset },
    }
}

// ── Tests ──
