//! Compression pipeline: orchestrates all layers.

use crate::config::CodecConfig;
use crate::context::{CompressionContext, LineEnding};
use crate::error::{CodecError, Result};
use crate::{
    header, layer1_normalize, layer2_dictionary, layer3_block_rle, layer4_pattern,
    layer5_line_template, layer6_char_rle, layer7_char_map, legacy,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separates the header block from the payload.
pub const DATA_DELIMITER: &str = "\n[DATA]\n";

/// Bound on any intermediate decode stream, as a multiple of the original
/// length from the header (or of the payload length when the header has none).
const EXPANSION_FACTOR: usize = 64;
const EXPANSION_SLACK: usize = 4096;

/// Size comparison between an input and its artifact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
    /// Compressed size as a percentage of the original.
    pub compression_ratio: f64,
}

impl CompressionStats {
    pub fn measure(original: &str, compressed: &str) -> Self {
        let original_size = original.len();
        let compressed_size = compressed.len();
        let compression_ratio = if original_size == 0 {
            0.0
        } else {
            compressed_size as f64 / original_size as f64 * 100.0
        };
        Self { original_size, compressed_size, compression_ratio }
    }
}

impl fmt::Display for CompressionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Original: {} bytes, Compressed: {} bytes, Ratio: {:.2}%",
            self.original_size, self.compressed_size, self.compression_ratio
        )
    }
}

/// The log codec. Holds configuration only; every call builds its own
/// [`CompressionContext`], so one codec can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct LogCodec {
    pub config: CodecConfig,
}

impl LogCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Compress text into `header + "\n[DATA]\n" + payload`.
    pub fn compress(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let cfg = &self.config;
        let mut ctx = CompressionContext::new();
        ctx.original_len = Some(text.len());
        ctx.line_ending = LineEnding::detect(text);
        let terminator = ctx.line_ending.as_str();
        let body = match text.strip_suffix(terminator) {
            Some(body) => {
                ctx.trailing_terminator = true;
                body
            }
            None => text,
        };

        let normalized = layer1_normalize::normalize(body, terminator, &mut ctx, &cfg.guardrail);
        let worded = layer2_dictionary::encode(&normalized, &mut ctx);
        let blocks = layer3_block_rle::encode(&worded, terminator, cfg.runs.block_min_run);
        let patterned = layer4_pattern::encode(&blocks, &mut ctx, &cfg.patterns);
        let templated = layer5_line_template::encode(&patterned, terminator, &mut ctx);
        let mut payload = layer6_char_rle::encode(&templated, cfg.runs.char_min_run);
        if cfg.char_map.enabled {
            payload = layer7_char_map::encode(&payload, &mut ctx, &cfg.char_map);
        }

        let header = header::encode(&ctx, &cfg.header);
        tracing::debug!(
            original = text.len(),
            normalized = normalized.len(),
            blocks = blocks.len(),
            payload = payload.len(),
            header = header.len(),
            "compressed"
        );
        format!("{header}{DATA_DELIMITER}{payload}")
    }

    /// Reverse [`Self::compress`]. Never fails: damaged structure degrades in
    /// place, and artifacts without a delimiter go through the legacy decoder.
    pub fn decompress(&self, artifact: &str) -> String {
        if artifact.is_empty() {
            return String::new();
        }
        let Some((header_text, payload)) = split_artifact(artifact) else {
            return legacy::decode(artifact);
        };
        let ctx = header::decode(header_text).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "unreadable header, decoding payload without side tables");
            CompressionContext::new()
        });
        reconstruct(payload, &ctx)
    }

    /// Like [`Self::decompress`], but reports a missing delimiter or an
    /// unreadable header instead of degrading.
    pub fn try_decompress(&self, artifact: &str) -> Result<String> {
        if artifact.is_empty() {
            return Ok(String::new());
        }
        let (header_text, payload) = split_artifact(artifact).ok_or(CodecError::MissingDelimiter)?;
        let ctx = header::decode(header_text)?;
        Ok(reconstruct(payload, &ctx))
    }
}

fn split_artifact(artifact: &str) -> Option<(&str, &str)> {
    let pos = artifact.find(DATA_DELIMITER)?;
    Some((&artifact[..pos], &artifact[pos + DATA_DELIMITER.len()..]))
}

/// Largest size any run-expanding layer may grow its output to.
fn decode_limit(payload: &str, ctx: &CompressionContext) -> usize {
    ctx.original_len
        .unwrap_or(payload.len())
        .saturating_mul(EXPANSION_FACTOR)
        .saturating_add(EXPANSION_SLACK)
}

/// Undo every layer in reverse order.
fn reconstruct(payload: &str, ctx: &CompressionContext) -> String {
    let terminator = ctx.line_ending.as_str();
    let limit = decode_limit(payload, ctx);
    let unmapped = layer7_char_map::decode(payload, ctx);
    let unrun = layer6_char_rle::decode(&unmapped, limit);
    let untemplated = layer5_line_template::decode(&unrun, terminator, ctx, limit);
    let unpatterned = layer4_pattern::decode(&untemplated, ctx);
    let lines = layer3_block_rle::decode(&unpatterned, terminator, limit);
    let words = layer2_dictionary::decode(&lines, ctx);
    let mut text = layer1_normalize::denormalize(&words, ctx);
    if ctx.trailing_terminator {
        text.push_str(terminator);
    }
    text
}
