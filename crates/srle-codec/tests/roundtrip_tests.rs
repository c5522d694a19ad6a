//! End-to-end round-trip suite for srle-codec.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use srle_codec::{
    compress, decompress,
    config::HeaderConfig,
    context::{FieldKind, LineEnding},
    header,
    layer3_block_rle,
    CodecConfig, CompressionContext, LogCodec, DATA_DELIMITER,
};
use std::sync::Arc;
use std::thread;

fn access_log(lines: usize) -> String {
    let methods = ["GET", "POST", "PUT"];
    let paths = ["/index.html", "/api/v1/users", "/static/app.js", "/login"];
    let agents = ["Mozilla/5.0 (X11; Linux x86_64)", "curl/8.0.1", "Googlebot/2.1"];
    (0..lines)
        .map(|i| {
            format!(
                r#"192.168.{}.{} - - [10/Oct/2023:13:{:02}:{:02} +0300] "{} {} HTTP/1.1" {} {} "http://example.com/ref{}" "{}""#,
                i % 4,
                i % 200,
                (i / 60) % 60,
                i % 60,
                methods[i % methods.len()],
                paths[i % paths.len()],
                if i % 7 == 0 { 404 } else { 200 },
                1000 + i * 13,
                i % 3,
                agents[i % agents.len()],
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn split(artifact: &str) -> (&str, &str) {
    let pos = artifact.find(DATA_DELIMITER).expect("artifact has a delimiter");
    (&artifact[..pos], &artifact[pos + DATA_DELIMITER.len()..])
}

fn header_of(artifact: &str) -> CompressionContext {
    header::decode(split(artifact).0).expect("header decodes")
}

fn codec_with_threshold(threshold: usize) -> LogCodec {
    let mut config = CodecConfig::default();
    config.header = HeaderConfig { compress_threshold: threshold };
    LogCodec::new(config)
}

// ============================================================
// Round-trip law
// ============================================================

#[test]
fn test_roundtrip_access_log() {
    let text = access_log(200) + "\n";
    let artifact = compress(&text);
    assert_eq!(decompress(&artifact), text);
}

#[test]
fn test_roundtrip_crlf() {
    let text = "first line\r\nsecond line\r\nthird\nwith lone lf\r\n";
    assert_eq!(decompress(&compress(text)), text);
    assert_eq!(header_of(&compress(text)).line_ending, LineEnding::CrLf);
}

#[test]
fn test_roundtrip_without_trailing_newline() {
    let text = "alpha\nbeta\ngamma";
    let artifact = compress(text);
    assert!(!header_of(&artifact).trailing_terminator);
    assert_eq!(decompress(&artifact), text);
}

#[test]
fn test_roundtrip_mixed_log() {
    let text = "\
2023-10-10 13:55:36,123 INFO request 550e8400-e29b-41d4-a716-446655440000 from 10.1.2.3
2023-10-10 13:55:37,001 WARN user 12345678 retried the call and failed for you
2023-10-10 13:55:37,001 WARN user 12345678 retried the call and failed for you
2023-10-10 13:55:37,001 WARN user 12345678 retried the call and failed for you
2023-10-10 13:55:37,001 WARN user 12345678 retried the call and failed for you
done
";
    assert_eq!(decompress(&compress(text)), text);
}

#[test]
fn test_roundtrip_mixed_offsets() {
    let text = "\
1.1.1.1 - - [10/Oct/2023:13:55:36 +0300] \"GET / HTTP/1.1\" 200 1
1.1.1.1 - - [10/Oct/2023:13:55:36 -0700] \"GET / HTTP/1.1\" 200 1
1.1.1.1 - - [31/Feb/2023:13:55:36 +0300] \"GET / HTTP/1.1\" 200 1
1.1.1.1 - - [10/Oct/2023:14:00:00 +0300] \"GET / HTTP/1.1\" 200 1";
    assert_eq!(decompress(&compress(text)), text);
}

// ============================================================
// Empty input and nothing-to-encode
// ============================================================

#[test]
fn test_empty_input() {
    assert_eq!(compress(""), "");
    assert_eq!(decompress(""), "");
}

#[test]
fn test_nothing_to_encode() {
    let text = "zq xk vw\nmj py\nbz";
    let artifact = compress(text);
    let ctx = header_of(&artifact);
    assert!(ctx.used_dictionary.is_empty());
    assert!(ctx.patterns.is_empty());
    assert!(ctx.line_templates.is_empty());
    assert!(FieldKind::ALL.iter().all(|k| ctx.table(*k).is_empty()));
    assert_eq!(decompress(&artifact), text);
}

// ============================================================
// Pattern cap boundary
// ============================================================

#[test]
fn test_pattern_cap_boundary() {
    let words: Vec<String> = (0..40)
        .map(|i| (0..10).map(|k| (b'a' + ((i * 7 + k * 3 + i * k) % 26) as u8) as char).collect())
        .collect();
    let mut lines = Vec::new();
    for _ in 0..8 {
        for w in &words {
            lines.push(format!("{w} {w}x"));
        }
    }
    let text = lines.join("\n");

    let artifact = compress(&text);
    let ctx = header_of(&artifact);
    assert_eq!(ctx.patterns.len(), 30);
    assert_eq!(decompress(&artifact), text);
}

// ============================================================
// Guardrail boundary
// ============================================================

#[test]
fn test_guardrail_boundary() {
    let text = (0..800)
        .map(|i| {
            format!(
                r#"10.0.0.{} - - [10/Oct/2023:13:55:36 +0000] "GET /shop/category-{}/product-{i:05}/reviews HTTP/1.1" 200 512 "http://example.com/from/{i}" "agent-{}""#,
                i % 250,
                i % 17,
                i % 5
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let artifact = compress(&text);
    let ctx = header_of(&artifact);
    let paths = ctx.table(FieldKind::Path);
    assert!(paths.len() < 800);
    assert!(!paths.values().iter().any(|p| p.contains("product-00799")));
    assert!(ctx.table(FieldKind::Referer).len() < 800);
    assert_eq!(decompress(&artifact), text);
}

// ============================================================
// Header self-compression boundary
// ============================================================

#[test]
fn test_header_threshold_boundary() {
    let text = access_log(30);
    let plain_artifact = codec_with_threshold(usize::MAX).compress(&text);
    let (plain_header, _) = split(&plain_artifact);
    let n = plain_header.chars().count();

    let under = codec_with_threshold(n + 1);
    let artifact = under.compress(&text);
    assert_eq!(artifact, plain_artifact);
    assert_eq!(under.decompress(&artifact), text);

    let at = codec_with_threshold(n);
    let artifact = at.compress(&text);
    assert!(artifact.starts_with(header::GZ_MARKER));
    assert_eq!(at.decompress(&artifact), text);

    let over = codec_with_threshold(n - 1);
    assert!(over.compress(&text).starts_with(header::GZ_MARKER));
}

#[test]
fn test_default_threshold_compresses_large_header() {
    let text = access_log(300);
    let artifact = compress(&text);
    assert!(artifact.starts_with(header::GZ_MARKER));
    assert_eq!(decompress(&artifact), text);
}

// ============================================================
// Concrete scenarios
// ============================================================

#[test]
fn test_char_run_scenario() {
    let artifact = compress("aaaaaa");
    assert!(split(&artifact).1.contains("R:a:6;"));
    assert_eq!(decompress(&artifact), "aaaaaa");
}

#[test]
fn test_block_run_scenario() {
    let text = "head\nsame line\nsame line\nsame line\nsame line\ntail";
    let blocks = layer3_block_rle::encode(text, "\n", 4);
    assert!(blocks.contains("B4:same line;"));
    assert_eq!(decompress(&compress(text)), text);
}

#[test]
fn test_apache_timestamp_scenario() {
    let line = r#"127.0.0.1 - frank [10/Oct/2023:13:55:36 +0300] "GET /apache_pb.gif HTTP/1.0" 200 2326 "http://www.example.com/start.html" "Mozilla/4.08""#;
    let artifact = compress(line);
    let ctx = header_of(&artifact);
    assert!(ctx.apache.base_epoch.is_some());
    assert!(ctx.apache.exceptions.is_empty());
    assert!(!artifact.contains("10/Oct/2023"));
    assert_eq!(decompress(&artifact), line);
}

// ============================================================
// Tricky content
// ============================================================

#[test]
fn test_lookalike_content() {
    let docs = [
        "R:a:6;",
        "\\R:x:9;",
        "B4:x;Sy;",
        "R|a|3|",
        "__IP0__ __PATH3__ D00 P01 L0",
        "\u{1}\u{1}\u{1}\u{1}\u{1}\u{1}\u{1}",
        "\u{1}__IP0__\u{1}",
        "[SMARTRLE_HEADER]\nVERSION:2\n\n[DATA]\nSx;",
        "comma,separated=values\\with\\backslashes",
        "日本語のログ ééééééé ✓✓✓✓✓✓",
        "\r\r\r\r\r\r\n",
        ";;;;;;;;::::::::||||||||\\\\\\\\\\\\",
    ];
    for doc in docs {
        assert_eq!(decompress(&compress(doc)), doc, "failed for {doc:?}");
    }
}

#[test]
fn test_char_map_roundtrip() {
    let mut config = CodecConfig::default();
    config.char_map.enabled = true;
    config.char_map.min_count = 2;
    let codec = LogCodec::new(config);
    let text = "ünïcödé ünïcödé ünïcödé\n\u{2}\u{3} already present ëë";
    assert_eq!(codec.decompress(&codec.compress(text)), text);
}

#[test]
fn test_randomized_roundtrip() {
    let fragments = [
        "a", "R", ":", ";", "\\", "|", "\n", "\r", "\r\n", "\u{1}", "B", "S", "_", "0", "7",
        "é", "the ", "and", " ", ",", "=", "[", "]", "R:", "R|", "__IP0__", "D00", "10.0.0.1",
        "123456", "2023-10-10 13:55:36", "[10/Oct/2023:13:55:36 +0300]", "aaaaaaa",
    ];
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let codec = LogCodec::default();
    for _ in 0..300 {
        let len = rng.gen_range(0..80);
        let doc: String = (0..len).map(|_| fragments[rng.gen_range(0..fragments.len())]).collect();
        assert_eq!(codec.decompress(&codec.compress(&doc)), doc, "failed for {doc:?}");
    }
}

// ============================================================
// Concurrency
// ============================================================

#[test]
fn test_concurrent_calls_share_codec() {
    let codec = Arc::new(LogCodec::default());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let codec = Arc::clone(&codec);
            thread::spawn(move || {
                let text = format!("{}\nworker {t} done", access_log(20 + t * 5));
                let artifact = codec.compress(&text);
                assert_eq!(codec.decompress(&artifact), text);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
