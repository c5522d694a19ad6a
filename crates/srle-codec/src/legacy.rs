//! Best-effort decoder for the pre-header artifact format.
//!
//! That format had no side channel: runs were `R<char><count as char>` and
//! dictionary words were bare `Dnn` codes. Its pattern (`Pnn`) and character
//! (`Cn`) codes cannot be reversed and pass through unchanged, so this path
//! is lossy for anything but the simplest inputs.

use crate::layer2_dictionary::{code_for, STATIC_DICTIONARY};

/// Largest run the old format could express in its single count char.
const MAX_LEGACY_RUN: u32 = 255;

pub fn decode(artifact: &str) -> String {
    tracing::warn!(len = artifact.len(), "artifact has no [DATA] delimiter, using legacy decoder");
    let expanded = expand_runs(artifact);
    expand_dictionary(&expanded)
}

fn expand_runs(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == 'R' && i + 2 < chars.len() && chars[i + 2] as u32 <= MAX_LEGACY_RUN {
            let count = chars[i + 2] as usize;
            out.extend(std::iter::repeat(chars[i + 1]).take(count));
            i += 3;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn expand_dictionary(text: &str) -> String {
    let mut result = text.to_string();
    for (index, word) in STATIC_DICTIONARY.iter().enumerate() {
        result = result.replace(&code_for(index), word);
    }
    result
}
