//! Layer 3: whole-line block RLE.
//!
//! Flattens the document into one `;`-terminated token stream:
//! `B<count>:<line>;` for runs of at least `block_min_run` identical lines,
//! `S<line>;` for everything else. Line text is escaped so the stream carries
//! no raw terminators.

/// Escape a line or run character: newline, CR, `|`, `:`, `;` and `\`.
pub fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '|' | ':' | ';' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
}

/// Inverse of an escape pair `\c`.
pub fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        'r' => '\r',
        other => other,
    }
}

/// True when `count` more units of `unit_len` bytes keep `current` within `limit`.
pub(crate) fn fits(current: usize, count: usize, unit_len: usize, limit: usize) -> bool {
    count
        .checked_mul(unit_len)
        .and_then(|grow| grow.checked_add(current))
        .is_some_and(|total| total <= limit)
}

pub fn encode(text: &str, terminator: &str, min_run: usize) -> String {
    let lines: Vec<&str> = text.split(terminator).collect();
    let mut out = String::with_capacity(text.len() + lines.len() * 2);
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let run = lines[i..].iter().take_while(|l| **l == line).count();
        if run >= min_run.max(2) {
            out.push('B');
            out.push_str(&run.to_string());
            out.push(':');
            escape_into(&mut out, line);
            out.push(';');
        } else {
            for _ in 0..run {
                out.push('S');
                escape_into(&mut out, line);
                out.push(';');
            }
        }
        i += run;
    }
    out
}

/// Reverse [`encode`]. A block that would push the joined output past `limit`
/// bytes is kept literally, like any other malformed token.
pub fn decode(stream: &str, terminator: &str, limit: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut size = 0usize;
    let mut chars = stream.chars().peekable();
    while let Some(tag) = chars.next() {
        let count = match tag {
            'S' => 1,
            'B' => {
                let mut digits = String::new();
                while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
                    digits.push(c);
                }
                match (digits.parse::<usize>(), chars.next_if_eq(&':')) {
                    (Ok(n), Some(_)) => n,
                    _ => {
                        tracing::warn!(count = %digits, "malformed block token, keeping remainder literally");
                        let mut rest = format!("B{digits}");
                        rest.extend(chars.by_ref());
                        lines.push(rest);
                        break;
                    }
                }
            }
            other => {
                tracing::warn!(tag = %other, "unknown block tag, keeping remainder literally");
                let mut rest = other.to_string();
                rest.extend(chars.by_ref());
                lines.push(rest);
                break;
            }
        };

        let mut line = String::new();
        let mut terminated = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(e) => line.push(unescape_char(e)),
                    None => line.push('\\'),
                },
                ';' => {
                    terminated = true;
                    break;
                }
                _ => line.push(c),
            }
        }
        if !terminated {
            tracing::warn!("unterminated block token at end of stream");
        }
        let unit = line.len() + terminator.len();
        if count > 1 && !fits(size, count, unit, limit) {
            tracing::warn!(count, "block count exceeds decode limit, keeping token literally");
            let mut literal = format!("B{count}:");
            escape_into(&mut literal, &line);
            if terminated {
                literal.push(';');
            }
            size = size.saturating_add(literal.len() + terminator.len());
            lines.push(literal);
            continue;
        }
        size = size.saturating_add(count * unit);
        for _ in 0..count {
            lines.push(line.clone());
        }
    }
    lines.join(terminator)
}
