//! Tuple tokenizer for MySQL extended INSERT payloads.
//!
//! Turns the `(...),(...);` payload of one `INSERT INTO ... VALUES` line into
//! one CSV record per tuple:
//! - single-quoted values become double-quoted CSV fields
//! - a bare `NULL` at the start of a field becomes an empty field
//! - backslash escapes are replaced by a single space and the escaped character dropped
//! - stray double quotes and raw control characters become spaces
//!
//! The tokenizer works on bytes. Every structural character is ASCII, so
//! multi-byte UTF-8 sequences pass through untouched. An escaped multi-byte
//! character is dropped whole, continuation bytes included.

use crate::error::Violation;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::borrow::Cow;

static IP_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r", [0-9]+\.[0-9]+\.[0-9]+\.[0-9]+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InRecord,
    InQuote,
}

#[derive(Debug, Clone, Default)]
pub struct TupleTokenizer {
    strip_ip_suffix: bool,
}

impl TupleTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `, a.b.c.d` sequences from quoted values.
    pub fn with_strip_ip_suffix(mut self, strip: bool) -> Self {
        self.strip_ip_suffix = strip;
        self
    }

    /// Tokenize one statement payload, appending CSV records to `out`.
    ///
    /// `arity` holds the field count every tuple of the table must have. When
    /// `None`, the first tuple sets it. Returns the number of records emitted.
    /// On error `out` may hold a partial record and must be discarded.
    pub fn tokenize(
        &self,
        payload: &[u8],
        arity: &mut Option<usize>,
        out: &mut Vec<u8>,
    ) -> Result<usize, Violation> {
        let mut state = State::Outside;
        let mut beginning = false;
        let mut field_count = 1usize;
        let mut quote_start = 0usize;
        let mut records = 0usize;
        let mut pos = 0usize;

        while pos < payload.len() {
            let at = pos;
            let c = payload[pos];
            pos += 1;

            match (state, c) {
                (State::InQuote, b'\'') => {
                    if self.strip_ip_suffix {
                        self.strip_quoted(out, quote_start);
                    }
                    out.push(b'"');
                    state = State::InRecord;
                }
                (State::InQuote, b'\\') => {
                    // A trailing backslash falls through to the missing-terminator
                    // error below.
                    out.push(b' ');
                    pos += 1;
                    while pos < payload.len() && is_continuation(payload[pos]) {
                        pos += 1;
                    }
                }
                (State::InQuote, b'"' | b'\t' | b'\n' | b'\r') => out.push(b' '),
                (State::InQuote, _) => out.push(c),

                (State::Outside, b'(') => {
                    state = State::InRecord;
                    field_count = 1;
                    beginning = true;
                    continue;
                }
                (State::Outside, b',') => {}
                (State::Outside, b';') => {
                    if pos != payload.len() {
                        return Err(Violation::LineContinued { pos: at });
                    }
                    return Ok(records);
                }
                (State::Outside, b')') => return Err(Violation::UnmatchedParen { pos: at }),
                (State::Outside, b'\'') => return Err(Violation::IllegalQuote { pos: at }),
                (State::Outside, b'"') => return Err(Violation::IllegalDoubleQuote { pos: at }),
                (State::Outside, b'\\') => return Err(Violation::IllegalEscape { pos: at }),
                (State::Outside, _) => {
                    return Err(Violation::IllegalChar {
                        pos: at,
                        ch: char::from(c),
                    })
                }

                (State::InRecord, b'(') => return Err(Violation::NestedParen { pos: at }),
                (State::InRecord, b')') => {
                    match *arity {
                        Some(expected) if expected != field_count => {
                            return Err(Violation::ArityMismatch {
                                pos: at,
                                expected,
                                found: field_count,
                            })
                        }
                        Some(_) => {}
                        None => *arity = Some(field_count),
                    }
                    out.push(b'\n');
                    records += 1;
                    state = State::Outside;
                }
                (State::InRecord, b'\'') => {
                    out.push(b'"');
                    quote_start = out.len();
                    state = State::InQuote;
                }
                (State::InRecord, b'"') => out.push(b' '),
                (State::InRecord, b'\\') => return Err(Violation::IllegalEscape { pos: at }),
                (State::InRecord, b',') => {
                    field_count += 1;
                    if let Some(expected) = *arity {
                        if field_count > expected {
                            return Err(Violation::ArityMismatch {
                                pos: at,
                                expected,
                                found: field_count,
                            });
                        }
                    }
                    out.push(b',');
                    beginning = true;
                    continue;
                }
                (State::InRecord, b';') => {
                    return Err(Violation::UnterminatedRecord { pos: at });
                }
                (State::InRecord, b'N') if beginning => {
                    // Bare NULL: skip "ULL" without checking it.
                    pos += 3;
                }
                (State::InRecord, _) => out.push(c),
            }
            beginning = false;
        }

        Err(Violation::MissingTerminator)
    }

    fn strip_quoted(&self, out: &mut Vec<u8>, start: usize) {
        let stripped = match IP_SUFFIX_RE.replace_all(&out[start..], &b""[..]) {
            Cow::Owned(stripped) => stripped,
            Cow::Borrowed(_) => return,
        };
        out.truncate(start);
        out.extend_from_slice(&stripped);
    }
}

fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(payload: &str) -> Result<String, Violation> {
        let mut out = Vec::new();
        let mut arity = None;
        TupleTokenizer::new().tokenize(payload.as_bytes(), &mut arity, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_null_inside_quotes_is_kept() {
        assert_eq!(run("('NULL',NULL);").unwrap(), "\"NULL\",\n");
    }

    #[test]
    fn test_n_in_middle_of_unquoted_value() {
        assert_eq!(run("(1e5,-Nx);").unwrap(), "1e5,-Nx\n");
    }

    #[test]
    fn test_strip_quoted_only_touches_current_value() {
        let mut out = Vec::new();
        let mut arity = None;
        TupleTokenizer::new()
            .with_strip_ip_suffix(true)
            .tokenize(b"('x, 1.2.3.4','host, 10.0.0.1');", &mut arity, &mut out)
            .unwrap();
        assert_eq!(out, b"\"x\",\"host\"\n");
    }
}
