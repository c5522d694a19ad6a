//! srle-codec: reversible, field-aware text codec for structured logs.
//!
//! Layers, applied in this order on compress and mirrored on decompress:
//! 1. Field normalization (access-log fields, timestamps, IPs, UUIDs, IDs → placeholders)
//! 2. Static dictionary (common short words → codes)
//! 3. Block RLE over whole lines (flattens the document into one token stream)
//! 4. Pattern substitution (frequent substrings → codes, capped per document)
//! 5. Line templates + run coding
//! 6. Character RLE
//! 7. Rare-character remap (opt-in)
//!
//! Every table the layers build goes into a textual header, so an artifact
//! decodes with no state carried over from the compress call.

pub mod config;
pub mod context;
pub mod error;
pub mod header;
pub mod layer1_normalize;
pub mod layer2_dictionary;
pub mod layer3_block_rle;
pub mod layer4_pattern;
pub mod layer5_line_template;
pub mod layer6_char_rle;
pub mod layer7_char_map;
pub mod legacy;
pub mod pipeline;
pub mod token;

pub use config::CodecConfig;
pub use context::CompressionContext;
pub use error::{CodecError, Result};
pub use pipeline::{CompressionStats, LogCodec, DATA_DELIMITER};

/// Compress with the default configuration.
pub fn compress(text: &str) -> String {
    LogCodec::default().compress(text)
}

/// Decompress with the default configuration.
pub fn decompress(artifact: &str) -> String {
    LogCodec::default().decompress(artifact)
}
