//! Layer 7 (opt-in): rare-character remap.
//!
//! Frequent multi-byte characters are swapped for single-byte control
//! characters the payload does not otherwise contain.

use crate::config::CharMapConfig;
use crate::context::CompressionContext;
use crate::token::SENTINEL;
use std::collections::{HashMap, HashSet};

/// Candidate code chars: U+0002..U+001F minus tab, LF and CR.
fn code_pool() -> impl Iterator<Item = char> {
    (0x02u8..=0x1F)
        .map(char::from)
        .filter(|c| !matches!(c, '\t' | '\n' | '\r') && *c != SENTINEL)
}

pub fn encode(text: &str, ctx: &mut CompressionContext, cfg: &CharMapConfig) -> String {
    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in text.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }
    let present: HashSet<char> = freq.keys().copied().collect();

    let mut candidates: Vec<(char, usize)> = freq
        .into_iter()
        .filter(|(c, n)| !c.is_ascii() && *n >= cfg.min_count)
        .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut forward: HashMap<char, char> = HashMap::new();
    for ((original, _), code) in candidates
        .into_iter()
        .zip(code_pool().filter(|c| !present.contains(c)))
    {
        forward.insert(original, code);
        ctx.char_map.push((code, original));
    }
    if forward.is_empty() {
        return text.to_string();
    }
    text.chars().map(|c| forward.get(&c).copied().unwrap_or(c)).collect()
}

pub fn decode(text: &str, ctx: &CompressionContext) -> String {
    if ctx.char_map.is_empty() {
        return text.to_string();
    }
    let reverse: HashMap<char, char> = ctx.char_map.iter().copied().collect();
    text.chars().map(|c| reverse.get(&c).copied().unwrap_or(c)).collect()
}
