//! Per-document compression state.
//!
//! A fresh [`CompressionContext`] is built for every `compress`/`decompress`
//! call and threaded through the layers; nothing survives between calls.

use crate::config::GuardrailConfig;
use chrono::{DateTime, FixedOffset, TimeZone};
use std::collections::{BTreeMap, HashMap};

/// Format of the text between the brackets of an Apache timestamp.
pub const APACHE_TS_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Line terminator style of the original document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::CrLf
        } else {
            Self::Lf
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    pub fn header_name(&self) -> &'static str {
        match self {
            Self::Lf => "LF",
            Self::CrLf => "CRLF",
        }
    }

    pub fn from_header_name(name: &str) -> Option<Self> {
        match name {
            "LF" => Some(Self::Lf),
            "CRLF" => Some(Self::CrLf),
            _ => None,
        }
    }
}

/// Field families extracted into side tables. Apache timestamps are kept
/// separately in [`ApacheTimestamps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Timestamp,
    Address,
    Uuid,
    NumericId,
    Method,
    Path,
    Status,
    Referer,
    UserAgent,
}

impl FieldKind {
    pub const ALL: [FieldKind; 9] = [
        Self::Timestamp,
        Self::Address,
        Self::Uuid,
        Self::NumericId,
        Self::Method,
        Self::Path,
        Self::Status,
        Self::Referer,
        Self::UserAgent,
    ];

    /// Placeholder tag, also used as the header key.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Timestamp => "TS",
            Self::Address => "IP",
            Self::Uuid => "UUID",
            Self::NumericId => "ID",
            Self::Method => "METHOD",
            Self::Path => "PATH",
            Self::Status => "STATUS",
            Self::Referer => "REF",
            Self::UserAgent => "UA",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.tag() == tag)
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// Ordered, append-only list of original values with exact-repeat reuse.
#[derive(Debug, Clone, Default)]
pub struct SideTable {
    values: Vec<String>,
    index: HashMap<String, usize>,
}

impl SideTable {
    pub fn from_values(values: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(values.len());
        for (i, v) in values.iter().enumerate() {
            index.entry(v.clone()).or_insert(i);
        }
        Self { values, index }
    }

    pub fn position(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    /// Append `value`, returning its index. Callers check [`Self::position`] first.
    pub fn push(&mut self, value: &str) -> usize {
        let i = self.values.len();
        self.values.push(value.to_string());
        self.index.insert(value.to_string(), i);
        i
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.values.get(i).map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Apache `[dd/Mon/yyyy:HH:MM:SS ±ZZZZ]` timestamps, one entry per occurrence.
///
/// Entries that parse, carry the document offset and re-format byte-identically
/// are stored as a delta against the base epoch. Anything else keeps a zero
/// delta plus a verbatim exception.
#[derive(Debug, Clone, Default)]
pub struct ApacheTimestamps {
    pub base_epoch: Option<i64>,
    pub offset: Option<String>,
    pub deltas: Vec<i64>,
    pub exceptions: BTreeMap<usize, String>,
}

impl ApacheTimestamps {
    /// Record one bracketed occurrence and return its index.
    pub fn record(&mut self, bracketed: &str) -> usize {
        let index = self.deltas.len();
        if let Some((epoch, offset)) = parse_apache(bracketed) {
            if self.base_epoch.is_none() {
                self.base_epoch = Some(epoch);
                self.offset = Some(offset.to_string());
            }
            if let (Some(base), Some(doc_offset)) = (self.base_epoch, self.offset.as_deref()) {
                if doc_offset == offset {
                    self.deltas.push(epoch - base);
                    return index;
                }
            }
        }
        self.deltas.push(0);
        self.exceptions.insert(index, bracketed.to_string());
        index
    }

    /// Rebuild occurrence `index`, brackets included.
    pub fn lookup(&self, index: usize) -> Option<String> {
        if let Some(raw) = self.exceptions.get(&index) {
            return Some(raw.clone());
        }
        let base = self.base_epoch?;
        let offset = parse_offset(self.offset.as_deref()?)?;
        let delta = *self.deltas.get(index)?;
        let dt = offset.timestamp_opt(base.checked_add(delta)?, 0).single()?;
        Some(format!("[{}]", dt.format(APACHE_TS_FORMAT)))
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty() && self.exceptions.is_empty()
    }
}

/// Epoch seconds and offset text of a bracketed timestamp, if it re-formats exactly.
fn parse_apache(bracketed: &str) -> Option<(i64, &str)> {
    let inner = bracketed.strip_prefix('[')?.strip_suffix(']')?;
    let dt = DateTime::parse_from_str(inner, APACHE_TS_FORMAT).ok()?;
    if dt.format(APACHE_TS_FORMAT).to_string() != inner {
        return None;
    }
    let offset = inner.rsplit(' ').next()?;
    Some((dt.timestamp(), offset))
}

/// `+0300` → fixed offset.
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, digits) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// All per-document tables, built during `compress` or parsed from a header.
#[derive(Debug, Clone)]
pub struct CompressionContext {
    pub line_ending: LineEnding,
    pub trailing_terminator: bool,
    /// Byte length of the original document, when known.
    pub original_len: Option<usize>,
    tables: [SideTable; 9],
    pub apache: ApacheTimestamps,
    /// Static-dictionary codes actually applied, code → word.
    pub used_dictionary: BTreeMap<String, String>,
    /// Pattern code → literal, in discovery order.
    pub patterns: Vec<(String, String)>,
    /// Line-template code → line, in assignment order.
    pub line_templates: Vec<(String, String)>,
    /// Rare-character remap, code char → original char.
    pub char_map: Vec<(char, char)>,
    pub map_paths: bool,
    pub map_referers: bool,
    pub map_user_agents: bool,
    side_table_bytes: usize,
}

impl CompressionContext {
    pub fn new() -> Self {
        Self {
            line_ending: LineEnding::Lf,
            trailing_terminator: false,
            original_len: None,
            tables: Default::default(),
            apache: ApacheTimestamps::default(),
            used_dictionary: BTreeMap::new(),
            patterns: Vec::new(),
            line_templates: Vec::new(),
            char_map: Vec::new(),
            map_paths: true,
            map_referers: true,
            map_user_agents: true,
            side_table_bytes: 0,
        }
    }

    pub fn table(&self, kind: FieldKind) -> &SideTable {
        &self.tables[kind.slot()]
    }

    pub fn set_table(&mut self, kind: FieldKind, table: SideTable) {
        self.tables[kind.slot()] = table;
    }

    pub fn mapping_allowed(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Path => self.map_paths,
            FieldKind::Referer => self.map_referers,
            FieldKind::UserAgent => self.map_user_agents,
            _ => true,
        }
    }

    /// Index `value` into its table, or `None` when it must stay literal.
    pub fn index_field(&mut self, kind: FieldKind, value: &str, guard: &GuardrailConfig) -> Option<usize> {
        if !self.mapping_allowed(kind) {
            return None;
        }
        if let Some(i) = self.table(kind).position(value) {
            return Some(i);
        }
        let cap = match kind {
            FieldKind::Path => Some(guard.max_paths),
            FieldKind::Referer => Some(guard.max_referers),
            FieldKind::UserAgent => Some(guard.max_user_agents),
            _ => None,
        };
        if cap.is_some_and(|cap| self.table(kind).len() >= cap) {
            return None;
        }
        let i = self.tables[kind.slot()].push(value);
        self.note_growth(value, guard);
        Some(i)
    }

    /// Account for a new side-table value; trips the guardrail past the budget.
    fn note_growth(&mut self, value: &str, guard: &GuardrailConfig) {
        self.side_table_bytes += crate::header::escaped_len(value) + 1;
        if self.side_table_bytes > guard.budget_bytes && self.map_paths {
            tracing::debug!(
                bytes = self.side_table_bytes,
                budget = guard.budget_bytes,
                "side tables over budget, path/referer/user-agent mapping disabled"
            );
            self.map_paths = false;
            self.map_referers = false;
            self.map_user_agents = false;
        }
    }
}

impl Default for CompressionContext {
    fn default() -> Self {
        Self::new()
    }
}
