//! Layer 4: frequency-driven pattern substitution over the flattened stream.
//!
//! For each length from `min_len` up to `stream_len / len_divisor` (clamped to
//! `max_len`), count every window of that many chars inside literal runs,
//! then code the windows seen at least `min_freq` times, most frequent first,
//! until the per-document cap is reached.

use crate::config::PatternConfig;
use crate::context::CompressionContext;
use crate::token::{self, Piece};
use std::collections::HashMap;

pub fn code_for(counter: usize) -> String {
    format!("P{counter:02}")
}

/// Longest candidate length for a stream of `char_len` chars.
pub fn max_candidate_len(char_len: usize, cfg: &PatternConfig) -> usize {
    let divisor = cfg.len_divisor.max(1);
    cfg.max_len.min(cfg.min_len.max(char_len / divisor))
}

/// Window frequencies for windows of `len` chars lying wholly inside literal runs.
pub fn window_frequencies(stream: &str, len: usize) -> HashMap<&str, usize> {
    let mut freq: HashMap<&str, usize> = HashMap::new();
    if len == 0 {
        return freq;
    }
    for piece in token::pieces(stream) {
        let Piece::Literal(lit) = piece else { continue };
        let bounds: Vec<usize> = lit
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(lit.len()))
            .collect();
        for w in bounds.windows(len + 1) {
            *freq.entry(&lit[w[0]..w[len]]).or_insert(0) += 1;
        }
    }
    freq
}

pub fn encode(stream: &str, ctx: &mut CompressionContext, cfg: &PatternConfig) -> String {
    let mut current = stream.to_string();
    let max_len = max_candidate_len(current.chars().count(), cfg);

    for len in cfg.min_len..=max_len {
        if ctx.patterns.len() >= cfg.cap {
            break;
        }
        let mut candidates: Vec<(String, usize)> = window_frequencies(&current, len)
            .into_iter()
            .filter(|(_, n)| *n >= cfg.min_freq)
            .map(|(s, n)| (s.to_string(), n))
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        for (literal, _) in candidates {
            if ctx.patterns.len() >= cfg.cap {
                break;
            }
            let code = code_for(ctx.patterns.len());
            if let Some(next) = substitute(&current, &literal, &code) {
                current = next;
                ctx.patterns.push((code, literal));
            }
        }
    }

    tracing::debug!(patterns = ctx.patterns.len(), "pattern layer done");
    current
}

/// Replace `literal` inside literal runs; `None` when nothing was replaced.
fn substitute(stream: &str, literal: &str, code: &str) -> Option<String> {
    if !stream.contains(literal) {
        return None;
    }
    let mut hits = 0;
    let out = token::map_literals(stream, |lit, out| {
        let mut pos = 0;
        for (start, _) in lit.match_indices(literal) {
            out.push_str(&lit[pos..start]);
            token::push_code(out, code);
            pos = start + literal.len();
            hits += 1;
        }
        out.push_str(&lit[pos..]);
    });
    (hits > 0).then_some(out)
}

pub fn decode(stream: &str, ctx: &CompressionContext) -> String {
    if ctx.patterns.is_empty() {
        return stream.to_string();
    }
    let table: HashMap<&str, &str> = ctx
        .patterns
        .iter()
        .map(|(code, literal)| (code.as_str(), literal.as_str()))
        .collect();
    token::expand_codes(stream, |interior, out| match table.get(interior) {
        Some(literal) => {
            out.push_str(literal);
            true
        }
        None => false,
    })
}
