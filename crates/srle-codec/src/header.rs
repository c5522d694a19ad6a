//! Header codec: every side table and code mapping as `KEY:value` lines.
//!
//! ```text
//! [SMARTRLE_HEADER]
//! VERSION:2
//! EOL:LF
//! TRAIL:1
//! ATS_BASE:1696935336
//! ...
//! ```
//!
//! List values are comma-joined with `\`, `,`, newline and CR escaped. A plain
//! header at or over the configured threshold is gzipped and base64-armoured
//! under `[SMARTRLE_HEADERGZ]`.

use crate::config::HeaderConfig;
use crate::context::{CompressionContext, FieldKind, LineEnding, SideTable};
use crate::error::{CodecError, Result};
use anyhow::Context as _;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::{Read, Write};

pub const PLAIN_MARKER: &str = "[SMARTRLE_HEADER]";
pub const GZ_MARKER: &str = "[SMARTRLE_HEADERGZ]";
pub const FORMAT_VERSION: &str = "2";

const KEY_VERSION: &str = "VERSION";
const KEY_EOL: &str = "EOL";
const KEY_TRAIL: &str = "TRAIL";
const KEY_LEN: &str = "LEN";
const KEY_ATS_BASE: &str = "ATS_BASE";
const KEY_ATS_OFFSET: &str = "ATS_OFFSET";
const KEY_ATS_DELTAS: &str = "ATS_DELTAS";
const KEY_ATS_RAW: &str = "ATS_RAW";
const KEY_ATS_LIST: &str = "ATS";
const KEY_DICT: &str = "DICT";
const KEY_PATTERNS: &str = "PAT";
const KEY_LINES: &str = "LINES";
const KEY_CHARMAP: &str = "CHARMAP";

pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Byte length of `value` once escaped.
pub fn escaped_len(value: &str) -> usize {
    value.len() + value.bytes().filter(|b| matches!(b, b'\\' | b',' | b'\n' | b'\r')).count()
}

/// Split on unescaped commas, unescaping each item.
pub fn split_escaped(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut item = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => item.push('\n'),
                Some('r') => item.push('\r'),
                Some(other) => item.push(other),
                None => item.push('\\'),
            },
            ',' => items.push(std::mem::take(&mut item)),
            _ => item.push(c),
        }
    }
    items.push(item);
    items
}

fn join_escaped<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values.into_iter().map(escape_value).collect::<Vec<_>>().join(",")
}

fn join_pairs<'a>(pairs: impl IntoIterator<Item = (String, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(code, value)| escape_value(&format!("{code}={value}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render the uncompressed header text.
pub fn render_plain(ctx: &CompressionContext) -> String {
    let mut h = format!("{PLAIN_MARKER}\n");
    let mut field = |key: &str, value: &str| {
        let _ = writeln!(h, "{key}:{value}");
    };
    field(KEY_VERSION, FORMAT_VERSION);
    field(KEY_EOL, ctx.line_ending.header_name());
    field(KEY_TRAIL, if ctx.trailing_terminator { "1" } else { "0" });
    if let Some(len) = ctx.original_len {
        field(KEY_LEN, &len.to_string());
    }

    let ats = &ctx.apache;
    match (ats.base_epoch, ats.offset.as_deref()) {
        (Some(base), Some(offset)) => {
            field(KEY_ATS_BASE, &base.to_string());
            field(KEY_ATS_OFFSET, offset);
            let deltas: Vec<String> = ats.deltas.iter().map(i64::to_string).collect();
            field(KEY_ATS_DELTAS, &deltas.join(","));
            if !ats.exceptions.is_empty() {
                field(
                    KEY_ATS_RAW,
                    &join_pairs(ats.exceptions.iter().map(|(i, raw)| (i.to_string(), raw.as_str()))),
                );
            }
        }
        _ if !ats.is_empty() => {
            field(KEY_ATS_LIST, &join_escaped(ats.exceptions.values().map(String::as_str)));
        }
        _ => {}
    }

    for kind in FieldKind::ALL {
        let table = ctx.table(kind);
        if !table.is_empty() {
            field(kind.tag(), &join_escaped(table.values().iter().map(String::as_str)));
        }
    }
    if !ctx.used_dictionary.is_empty() {
        field(
            KEY_DICT,
            &join_pairs(ctx.used_dictionary.iter().map(|(c, w)| (c.clone(), w.as_str()))),
        );
    }
    if !ctx.patterns.is_empty() {
        field(KEY_PATTERNS, &join_pairs(ctx.patterns.iter().map(|(c, p)| (c.clone(), p.as_str()))));
    }
    if !ctx.line_templates.is_empty() {
        field(KEY_LINES, &join_pairs(ctx.line_templates.iter().map(|(c, l)| (c.clone(), l.as_str()))));
    }
    if !ctx.char_map.is_empty() {
        let pairs: Vec<(String, String)> = ctx
            .char_map
            .iter()
            .map(|(code, original)| (format!("{:x}", *code as u32), original.to_string()))
            .collect();
        field(KEY_CHARMAP, &join_pairs(pairs.iter().map(|(c, o)| (c.clone(), o.as_str()))));
    }
    h
}

/// Render the header, self-compressing it past the threshold.
pub fn encode(ctx: &CompressionContext, cfg: &HeaderConfig) -> String {
    let plain = render_plain(ctx);
    if plain.chars().count() < cfg.compress_threshold {
        return plain;
    }
    match deflate(&plain) {
        Ok(packed) => {
            tracing::debug!(plain = plain.len(), packed = packed.len(), "header self-compressed");
            packed
        }
        Err(e) => {
            tracing::warn!(error = %e, "header compression failed, writing plain header");
            plain
        }
    }
}

fn deflate(plain: &str) -> Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(plain.as_bytes())?;
    let bytes = encoder.finish()?;
    Ok(format!("{GZ_MARKER}\nB64:{}\n", STANDARD.encode(bytes)))
}

fn inflate(rest: &str) -> anyhow::Result<String> {
    let b64 = rest
        .trim_start_matches(['\r', '\n'])
        .strip_prefix("B64:")
        .context("compressed header has no B64 field")?
        .trim_end();
    let bytes = STANDARD.decode(b64).context("compressed header is not valid base64")?;
    let mut text = String::new();
    GzDecoder::new(bytes.as_slice())
        .read_to_string(&mut text)
        .context("compressed header does not inflate")?;
    Ok(text)
}

/// Rebuild a context from header text (plain or self-compressed).
pub fn decode(header: &str) -> Result<CompressionContext> {
    let text: Cow<'_, str> = match header.strip_prefix(GZ_MARKER) {
        Some(rest) => Cow::Owned(inflate(rest)?),
        None => Cow::Borrowed(header),
    };

    let mut lines = text.split('\n');
    if lines.next() != Some(PLAIN_MARKER) {
        return Err(CodecError::MalformedHeader("missing header marker".into()));
    }

    let mut ctx = CompressionContext::new();
    for line in lines.filter(|l| !l.is_empty()) {
        let Some((key, value)) = line.split_once(':') else {
            tracing::warn!(line, "header line without key, skipping");
            continue;
        };
        match key {
            KEY_VERSION if value != FORMAT_VERSION => {
                return Err(CodecError::MalformedHeader(format!("unsupported version {value}")));
            }
            KEY_VERSION => {}
            KEY_EOL => match LineEnding::from_header_name(value) {
                Some(eol) => ctx.line_ending = eol,
                None => tracing::warn!(value, "unknown line ending, assuming LF"),
            },
            KEY_TRAIL => ctx.trailing_terminator = value == "1",
            KEY_LEN => match value.parse() {
                Ok(len) => ctx.original_len = Some(len),
                Err(_) => tracing::warn!(value, "unparsable original length, ignoring"),
            },
            KEY_ATS_BASE => match value.parse() {
                Ok(base) => ctx.apache.base_epoch = Some(base),
                Err(_) => tracing::warn!(value, "unparsable ATS base epoch, ignoring"),
            },
            KEY_ATS_OFFSET => ctx.apache.offset = Some(value.to_string()),
            KEY_ATS_DELTAS => {
                ctx.apache.deltas = value
                    .split(',')
                    .map(|d| {
                        d.parse().unwrap_or_else(|_| {
                            tracing::warn!(delta = d, "unparsable ATS delta, using 0");
                            0
                        })
                    })
                    .collect();
            }
            KEY_ATS_RAW => {
                for (index, raw) in parse_pairs(value) {
                    match index.parse() {
                        Ok(i) => {
                            ctx.apache.exceptions.insert(i, raw);
                        }
                        Err(_) => tracing::warn!(index = %index, "unparsable ATS exception index"),
                    }
                }
            }
            KEY_ATS_LIST => {
                ctx.apache.exceptions = split_escaped(value).into_iter().enumerate().collect();
            }
            KEY_DICT => ctx.used_dictionary = parse_pairs(value).into_iter().collect(),
            KEY_PATTERNS => ctx.patterns = parse_pairs(value),
            KEY_LINES => ctx.line_templates = parse_pairs(value),
            KEY_CHARMAP => {
                for (code, original) in parse_pairs(value) {
                    let code = u32::from_str_radix(&code, 16).ok().and_then(char::from_u32);
                    match (code, original.chars().next()) {
                        (Some(code), Some(original)) => ctx.char_map.push((code, original)),
                        _ => tracing::warn!("malformed char map entry, skipping"),
                    }
                }
            }
            other => match FieldKind::from_tag(other) {
                Some(kind) => ctx.set_table(kind, SideTable::from_values(split_escaped(value))),
                None => tracing::debug!(key = other, "unknown header key ignored"),
            },
        }
    }
    Ok(ctx)
}

fn parse_pairs(value: &str) -> Vec<(String, String)> {
    split_escaped(value)
        .into_iter()
        .filter_map(|item| match item.split_once('=') {
            Some((code, v)) => Some((code.to_string(), v.to_string())),
            None => {
                tracing::warn!(item = %item, "header pair without '=', skipping");
                None
            }
        })
        .collect()
}
