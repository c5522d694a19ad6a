//! Layer 1: field normalization (structured substrings → indexed placeholders).
//!
//! Per line, in order: combined access-log fields, bracketed Apache
//! timestamps, then the generic extractors (timestamp, IPv4, UUID, 6+ digit
//! numbers). Each match becomes the code `__TAG<index>__`.

use crate::config::GuardrailConfig;
use crate::context::{CompressionContext, FieldKind};
use crate::token::{self, SENTINEL};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

static RE_COMBINED: LazyLock<Regex> = LazyLock::new(|| Regex::new(
    r#"^(\S+) (\S+) (\S+) \[([^\]]+)\] "(\S+) (\S+)(?: (\S+))?" (\d{3}) (\S+)(?: "([^"]*)" "([^"]*)")?"#
).unwrap());
static RE_APACHE_TS: LazyLock<Regex> = LazyLock::new(|| Regex::new(
    r"\[\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2} [+-]\d{4}\]"
).unwrap());
static RE_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| Regex::new(
    r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:,\d{3})?"
).unwrap());
static RE_IPV4: LazyLock<Regex> = LazyLock::new(|| Regex::new(
    r"\b(?:\d{1,3}\.){3}\d{1,3}\b"
).unwrap());
static RE_UUID: LazyLock<Regex> = LazyLock::new(|| Regex::new(
    r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b"
).unwrap());
static RE_NUMERIC_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{6,}\b").unwrap());

/// Tag of the Apache timestamp placeholder.
pub const APACHE_TAG: &str = "ATS";

/// Combined-log capture groups that get indexed, in line order.
const COMBINED_FIELDS: [(usize, FieldKind); 6] = [
    (1, FieldKind::Address),
    (5, FieldKind::Method),
    (6, FieldKind::Path),
    (8, FieldKind::Status),
    (10, FieldKind::Referer),
    (11, FieldKind::UserAgent),
];

#[derive(Debug)]
enum Segment {
    Literal(String),
    Code(String),
}

pub fn placeholder(tag: &str, index: usize) -> String {
    format!("__{tag}{index}__")
}

/// Split `__TAG<n>__` into its tag and index.
pub fn parse_placeholder(interior: &str) -> Option<(&str, usize)> {
    let body = interior.strip_prefix("__")?.strip_suffix("__")?;
    let split = body.find(|c: char| c.is_ascii_digit())?;
    let (tag, digits) = body.split_at(split);
    if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    Some((tag, digits.parse().ok()?))
}

/// Normalize every line of `body` (no trailing terminator) into `ctx`.
pub fn normalize(body: &str, terminator: &str, ctx: &mut CompressionContext, guard: &GuardrailConfig) -> String {
    let mut out = String::with_capacity(body.len());
    for (i, line) in body.split(terminator).enumerate() {
        if i > 0 {
            out.push_str(terminator);
        }
        normalize_line(line, ctx, guard, &mut out);
    }
    out
}

fn normalize_line(line: &str, ctx: &mut CompressionContext, guard: &GuardrailConfig, out: &mut String) {
    let mut segments = match RE_COMBINED.captures(line) {
        Some(caps) => combined_log_segments(line, &caps, ctx, guard),
        None => vec![Segment::Literal(line.to_string())],
    };

    segments = extract(segments, &RE_APACHE_TS, |m| {
        Some(placeholder(APACHE_TAG, ctx.apache.record(m)))
    });
    for (re, kind) in [
        (&*RE_TIMESTAMP, FieldKind::Timestamp),
        (&*RE_IPV4, FieldKind::Address),
        (&*RE_UUID, FieldKind::Uuid),
        (&*RE_NUMERIC_ID, FieldKind::NumericId),
    ] {
        segments = extract(segments, re, |m| {
            ctx.index_field(kind, m, guard).map(|i| placeholder(kind.tag(), i))
        });
    }

    for seg in segments {
        match seg {
            Segment::Literal(lit) => token::push_literal(out, &lit),
            Segment::Code(interior) => token::push_code(out, &interior),
        }
    }
}

fn combined_log_segments(
    line: &str,
    caps: &Captures<'_>,
    ctx: &mut CompressionContext,
    guard: &GuardrailConfig,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut pos = 0;
    for (group, kind) in COMBINED_FIELDS {
        let Some(m) = caps.get(group) else { continue };
        let Some(index) = ctx.index_field(kind, m.as_str(), guard) else { continue };
        if m.start() > pos {
            segments.push(Segment::Literal(line[pos..m.start()].to_string()));
        }
        segments.push(Segment::Code(placeholder(kind.tag(), index)));
        pos = m.end();
    }
    if pos < line.len() || segments.is_empty() {
        segments.push(Segment::Literal(line[pos..].to_string()));
    }
    segments
}

/// Replace matches of `re` inside literal segments with the code `f` returns.
fn extract<F>(segments: Vec<Segment>, re: &Regex, mut f: F) -> Vec<Segment>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = Vec::with_capacity(segments.len());
    for seg in segments {
        let lit = match seg {
            Segment::Literal(lit) => lit,
            code => {
                out.push(code);
                continue;
            }
        };
        let mut pos = 0;
        for m in re.find_iter(&lit) {
            let Some(interior) = f(m.as_str()) else { continue };
            if m.start() > pos {
                out.push(Segment::Literal(lit[pos..m.start()].to_string()));
            }
            out.push(Segment::Code(interior));
            pos = m.end();
        }
        if pos == 0 {
            out.push(Segment::Literal(lit));
        } else if pos < lit.len() {
            out.push(Segment::Literal(lit[pos..].to_string()));
        }
    }
    out
}

/// Resolve every placeholder and empty code back to original text.
pub fn denormalize(text: &str, ctx: &CompressionContext) -> String {
    token::expand_codes(text, |interior, out| {
        if interior.is_empty() {
            out.push(SENTINEL);
            return true;
        }
        match resolve(interior, ctx) {
            Some(value) => out.push_str(&value),
            None => {
                tracing::warn!(code = interior, "unresolved placeholder, emitting literally");
                out.push_str(interior);
            }
        }
        true
    })
}

fn resolve<'a>(interior: &str, ctx: &'a CompressionContext) -> Option<Cow<'a, str>> {
    let (tag, index) = parse_placeholder(interior)?;
    if tag == APACHE_TAG {
        return ctx.apache.lookup(index).map(Cow::Owned);
    }
    let kind = FieldKind::from_tag(tag)?;
    ctx.table(kind).get(index).map(Cow::Borrowed)
}
