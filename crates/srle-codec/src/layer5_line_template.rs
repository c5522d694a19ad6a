//! Layer 5: line templates and run coding.
//!
//! Lines seen at least twice get an `L<n>` code; consecutive identical
//! elements collapse to `R|<element>|<count>|`. After block RLE the stream has
//! no raw terminators, so in the default pipeline this sees a single element.

use crate::context::CompressionContext;
use crate::layer3_block_rle::fits;
use crate::token;
use std::collections::HashMap;

const RUN_PREFIX: &str = "R|";

pub fn code_for(counter: usize) -> String {
    format!("L{counter}")
}

pub fn encode(stream: &str, terminator: &str, ctx: &mut CompressionContext) -> String {
    let lines: Vec<&str> = stream.split(terminator).collect();

    let mut freq: HashMap<&str, usize> = HashMap::new();
    for &line in &lines {
        *freq.entry(line).or_insert(0) += 1;
    }
    let mut codes: HashMap<&str, String> = HashMap::new();
    for &line in &lines {
        if freq[line] >= 2 && !codes.contains_key(line) {
            let code = code_for(ctx.line_templates.len());
            ctx.line_templates.push((code.clone(), line.to_string()));
            codes.insert(line, token::wrap(&code));
        }
    }

    let elements: Vec<String> = lines
        .iter()
        .map(|line| match codes.get(line) {
            Some(code) => code.clone(),
            None => escape_element(line),
        })
        .collect();

    let mut out: Vec<String> = Vec::with_capacity(elements.len());
    let mut i = 0;
    while i < elements.len() {
        let run = elements[i..].iter().take_while(|e| **e == elements[i]).count();
        if run >= 2 {
            out.push(format!("{RUN_PREFIX}{}|{run}|", elements[i]));
        } else {
            out.push(elements[i].clone());
        }
        i += run;
    }
    out.join(terminator)
}

/// A literal element that could read as a run, or starts with the escape, gets a `\` prefix.
fn escape_element(line: &str) -> String {
    if line.starts_with(RUN_PREFIX) || line.starts_with('\\') {
        format!("\\{line}")
    } else {
        line.to_string()
    }
}

/// Reverse [`encode`]. A run that would push the joined output past `limit`
/// bytes is kept as a literal element.
pub fn decode(stream: &str, terminator: &str, ctx: &CompressionContext, limit: usize) -> String {
    let templates: HashMap<&str, &str> = ctx
        .line_templates
        .iter()
        .map(|(code, line)| (code.as_str(), line.as_str()))
        .collect();

    let mut lines: Vec<&str> = Vec::new();
    let mut size = 0usize;
    for element in stream.split(terminator) {
        let (line, count) = match parse_run(element) {
            Some((inner, count)) => {
                let line = resolve(inner, &templates);
                if fits(size, count, line.len() + terminator.len(), limit) {
                    (line, count)
                } else {
                    tracing::warn!(count, "run count exceeds decode limit, keeping element literally");
                    (element, 1)
                }
            }
            None => (resolve(element, &templates), 1),
        };
        size = size.saturating_add(count * (line.len() + terminator.len()));
        for _ in 0..count {
            lines.push(line);
        }
    }
    lines.join(terminator)
}

fn parse_run(element: &str) -> Option<(&str, usize)> {
    let body = element.strip_prefix(RUN_PREFIX)?.strip_suffix('|')?;
    let (inner, count) = body.rsplit_once('|')?;
    match count.parse() {
        Ok(n) => Some((inner, n)),
        Err(_) => {
            tracing::warn!(element, "malformed run element, keeping literally");
            None
        }
    }
}

fn resolve<'a>(element: &'a str, templates: &HashMap<&str, &'a str>) -> &'a str {
    if let Some(interior) = token::single_code(element) {
        if let Some(&line) = templates.get(interior) {
            return line;
        }
    }
    element.strip_prefix('\\').unwrap_or(element)
}
