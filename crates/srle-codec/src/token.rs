//! Sentinel-wrapped codes.
//!
//! Every code any layer writes into the stream is `SENTINEL interior SENTINEL`.
//! A literal sentinel in the input becomes a code with an empty interior, so a
//! stream always splits left to right into literal runs and codes. Encoders
//! only rewrite literal runs; decoders only expand the codes they own.

pub const SENTINEL: char = '\u{1}';

/// One unit of a tokenized stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
    Literal(&'a str),
    Code(&'a str),
}

/// Left-to-right tokenizer. An unterminated code degrades to a literal.
pub struct Pieces<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Pieces<'a> {
    type Item = Piece<'a>;

    fn next(&mut self) -> Option<Piece<'a>> {
        if self.rest.is_empty() {
            return None;
        }
        if let Some(after) = self.rest.strip_prefix(SENTINEL) {
            return match after.find(SENTINEL) {
                Some(end) => {
                    self.rest = &after[end + SENTINEL.len_utf8()..];
                    Some(Piece::Code(&after[..end]))
                }
                None => {
                    let lit = self.rest;
                    self.rest = "";
                    Some(Piece::Literal(lit))
                }
            };
        }
        let end = self.rest.find(SENTINEL).unwrap_or(self.rest.len());
        let lit = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(Piece::Literal(lit))
    }
}

pub fn pieces(s: &str) -> Pieces<'_> {
    Pieces { rest: s }
}

/// `interior` wrapped in sentinels.
pub fn wrap(interior: &str) -> String {
    let mut s = String::with_capacity(interior.len() + 2);
    push_code(&mut s, interior);
    s
}

pub fn push_code(out: &mut String, interior: &str) {
    out.push(SENTINEL);
    out.push_str(interior);
    out.push(SENTINEL);
}

/// Append raw text, turning each literal sentinel into an empty code.
pub fn push_literal(out: &mut String, text: &str) {
    for c in text.chars() {
        if c == SENTINEL {
            out.push(SENTINEL);
        }
        out.push(c);
    }
}

/// If `s` is exactly one code, its interior.
pub fn single_code(s: &str) -> Option<&str> {
    let mut it = pieces(s);
    match (it.next(), it.next()) {
        (Some(Piece::Code(interior)), None) => Some(interior),
        _ => None,
    }
}

/// Rebuild `s`, passing every literal run through `f` and copying codes as-is.
pub fn map_literals<F>(s: &str, mut f: F) -> String
where
    F: FnMut(&str, &mut String),
{
    let mut out = String::with_capacity(s.len());
    for piece in pieces(s) {
        match piece {
            Piece::Literal(lit) => f(lit, &mut out),
            Piece::Code(interior) => push_code(&mut out, interior),
        }
    }
    out
}

/// Rebuild `s`, offering every code to `f`. `f` returns false to keep the code.
pub fn expand_codes<F>(s: &str, mut f: F) -> String
where
    F: FnMut(&str, &mut String) -> bool,
{
    let mut out = String::with_capacity(s.len());
    for piece in pieces(s) {
        match piece {
            Piece::Literal(lit) => out.push_str(lit),
            Piece::Code(interior) => {
                if !f(interior, &mut out) {
                    push_code(&mut out, interior);
                }
            }
        }
    }
    out
}
