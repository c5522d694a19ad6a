//! Layer 6: character run-length encoding.
//!
//! A run of at least `min_run` identical chars becomes `R:<escaped-char>:<count>;`.
//! Shorter runs are copied verbatim; a verbatim `\` is doubled only before
//! an emitted `\` or `R`, and a verbatim `R` is escaped only before an emitted `:`.

use crate::layer3_block_rle::{escape_into, fits, unescape_char};

#[derive(Debug, Clone, Copy)]
enum Unit {
    Run(char, usize),
    Verbatim(char),
}

pub fn encode(text: &str, min_run: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut units = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        if run >= min_run.max(2) {
            units.push(Unit::Run(c, run));
        } else {
            units.extend(std::iter::repeat(Unit::Verbatim(c)).take(run));
        }
        i += run;
    }

    // First emitted char of each unit, decided right to left.
    let mut escaped = vec![false; units.len()];
    let mut next_first: Option<char> = None;
    for (idx, unit) in units.iter().enumerate().rev() {
        next_first = Some(match *unit {
            Unit::Run(..) => 'R',
            Unit::Verbatim(c) => {
                let escape = match c {
                    '\\' => matches!(next_first, Some('\\' | 'R')),
                    'R' => next_first == Some(':'),
                    _ => false,
                };
                escaped[idx] = escape;
                if escape { '\\' } else { c }
            }
        });
    }

    let mut out = String::with_capacity(text.len());
    for (unit, escape) in units.iter().zip(escaped) {
        match *unit {
            Unit::Run(c, n) => {
                out.push_str("R:");
                escape_into(&mut out, c.encode_utf8(&mut [0; 4]));
                out.push(':');
                out.push_str(&n.to_string());
                out.push(';');
            }
            Unit::Verbatim(c) => {
                if escape {
                    out.push('\\');
                }
                out.push(c);
            }
        }
    }
    out
}

/// Reverse [`encode`]. A run that would push the output past `limit` bytes
/// is treated as malformed.
pub fn decode(text: &str, limit: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' if matches!(chars.get(i + 1).copied(), Some('\\' | 'R')) => {
                out.push(chars[i + 1]);
                i += 2;
            }
            'R' if chars.get(i + 1) == Some(&':') => match parse_run(&chars[i + 2..])
                .filter(|&(c, n, _)| fits(out.len(), n, c.len_utf8(), limit))
            {
                Some((c, n, used)) => {
                    out.extend(std::iter::repeat(c).take(n));
                    i += 2 + used;
                }
                None => {
                    tracing::warn!(offset = i, "malformed char run, keeping 'R' literally");
                    out.push('R');
                    i += 1;
                }
            },
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Parse `<escaped-char>:<count>;`, returning the char, count and chars consumed.
fn parse_run(rest: &[char]) -> Option<(char, usize, usize)> {
    let (c, mut used) = match *rest.first()? {
        '\\' => (unescape_char(*rest.get(1)?), 2),
        c => (c, 1),
    };
    if rest.get(used) != Some(&':') {
        return None;
    }
    used += 1;
    let digits: String = rest[used..].iter().take_while(|c| c.is_ascii_digit()).collect();
    used += digits.len();
    if rest.get(used) != Some(&';') {
        return None;
    }
    Some((c, digits.parse().ok()?, used + 1))
}
