//! Layer 2: static dictionary (common short words → `Dnn` codes).

use crate::context::CompressionContext;
use crate::token;
use regex::Regex;
use std::sync::LazyLock;

/// Fixed word table. A word's code is `D` plus its two-digit position.
pub const STATIC_DICTIONARY: [&str; 16] = [
    "the", "and", "ing", "ion", "ent", "for", "you", "not",
    "are", "but", "had", "was", "one", "our", "her", "all",
];

static RE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = STATIC_DICTIONARY
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alternation})\b")).unwrap()
});

pub fn code_for(index: usize) -> String {
    format!("D{index:02}")
}

/// Case-sensitive whole-word substitution; records the codes that fired.
pub fn encode(text: &str, ctx: &mut CompressionContext) -> String {
    if text.is_empty() {
        return String::new();
    }
    token::map_literals(text, |lit, out| {
        let mut pos = 0;
        for m in RE_WORDS.find_iter(lit) {
            let Some(index) = STATIC_DICTIONARY.iter().position(|w| *w == m.as_str()) else {
                continue;
            };
            let code = code_for(index);
            out.push_str(&lit[pos..m.start()]);
            token::push_code(out, &code);
            ctx.used_dictionary
                .entry(code)
                .or_insert_with(|| STATIC_DICTIONARY[index].to_string());
            pos = m.end();
        }
        out.push_str(&lit[pos..]);
    })
}

/// Expand the dictionary codes listed in the header.
pub fn decode(text: &str, ctx: &CompressionContext) -> String {
    if ctx.used_dictionary.is_empty() {
        return text.to_string();
    }
    token::expand_codes(text, |interior, out| match ctx.used_dictionary.get(interior) {
        Some(word) => {
            out.push_str(word);
            true
        }
        None => false,
    })
}
