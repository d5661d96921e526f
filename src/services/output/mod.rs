// Script output handling
// Splits raw process output into lines, classifies them and keeps a bounded log

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;

/// Lines kept per run before the oldest are dropped
pub const DEFAULT_LOG_CAPACITY: usize = 20_000;

const TRACEBACK_HEADER: &str = "Traceback (most recent call last):";

static PROGRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*PROGRESS\s+(\d{1,3})\s*$").expect("valid progress regex")
});
static ERROR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(error|exception|fatal|traceback)").expect("valid error regex")
});
static WARNING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bwarn").expect("valid warning regex"));
/// Last line of a Python traceback, e.g. `ValueError: bad input` or `KeyboardInterrupt`
static EXCEPTION_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][\w.]*(Error|Exception|Interrupt|Exit|Warning)?(:.*)?$")
        .expect("valid exception regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `PROGRESS n`, value clamped to 0..=100
    Progress(u8),
    TracebackHeader,
    Traceback,
    Error,
    Warning,
    Normal,
}

impl LineKind {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            LineKind::Error | LineKind::Traceback | LineKind::TracebackHeader
        )
    }

    pub fn is_progress(&self) -> bool {
        matches!(self, LineKind::Progress(_))
    }
}

/// Joins byte chunks into complete lines
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and get every line it completed, without terminators
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Flush the unterminated tail, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        Some(line)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Classifies output lines; remembers whether it is inside a traceback
#[derive(Debug, Default, Clone)]
pub struct OutputParser {
    in_traceback: bool,
}

impl OutputParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_traceback(&self) -> bool {
        self.in_traceback
    }

    pub fn classify(&mut self, line: &str) -> LineKind {
        if let Some(value) = parse_progress(line) {
            return LineKind::Progress(value);
        }

        if line.trim_start().starts_with(TRACEBACK_HEADER) {
            self.in_traceback = true;
            return LineKind::TracebackHeader;
        }

        if self.in_traceback {
            if line.starts_with(char::is_whitespace) {
                return LineKind::Traceback;
            }
            self.in_traceback = false;
            if EXCEPTION_LINE_RE.is_match(line.trim_end()) {
                return LineKind::Traceback;
            }
        }

        if ERROR_RE.is_match(line) {
            LineKind::Error
        } else if WARNING_RE.is_match(line) {
            LineKind::Warning
        } else {
            LineKind::Normal
        }
    }

    pub fn reset(&mut self) {
        self.in_traceback = false;
    }
}

/// Value of a `PROGRESS n` line, clamped to 100
pub fn parse_progress(line: &str) -> Option<u8> {
    let caps = PROGRESS_RE.captures(line)?;
    let value: u16 = caps.get(1)?.as_str().parse().ok()?;
    Some(value.min(100) as u8)
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputLine {
    pub stream: Stream,
    pub kind: LineKind,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl OutputLine {
    /// Text with a `[HH:MM:SS]` prefix
    pub fn with_timestamp(&self) -> String {
        format!("[{}] {}", self.timestamp.format("%H:%M:%S"), self.text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFilter {
    pub query: String,
    pub case_sensitive: bool,
    pub errors_only: bool,
    pub hide_progress: bool,
}

impl OutputFilter {
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && !self.errors_only && !self.hide_progress
    }

    pub fn matches(&self, line: &OutputLine) -> bool {
        if self.hide_progress && line.kind.is_progress() {
            return false;
        }
        if self.errors_only && !line.kind.is_error() {
            return false;
        }
        if self.query.is_empty() {
            return true;
        }
        if self.case_sensitive {
            line.text.contains(&self.query)
        } else {
            line.text
                .to_lowercase()
                .contains(&self.query.to_lowercase())
        }
    }
}

/// Output of one run, oldest lines dropped past the capacity
#[derive(Debug, Clone)]
pub struct RunLog {
    lines: VecDeque<OutputLine>,
    capacity: usize,
    parser: OutputParser,
    total_lines: usize,
    error_lines: usize,
    warning_lines: usize,
    last_progress: Option<u8>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
            parser: OutputParser::new(),
            total_lines: 0,
            error_lines: 0,
            warning_lines: 0,
            last_progress: None,
        }
    }

    /// Classify and store one line; returns its kind
    pub fn push(&mut self, stream: Stream, text: impl Into<String>) -> LineKind {
        let text = text.into();
        let kind = self.parser.classify(&text);

        match kind {
            LineKind::Progress(value) => self.last_progress = Some(value),
            LineKind::Warning => self.warning_lines += 1,
            k if k.is_error() => self.error_lines += 1,
            _ => {}
        }
        self.total_lines += 1;

        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(OutputLine {
            stream,
            kind,
            text,
            timestamp: Local::now(),
        });

        kind
    }

    /// Lines produced by the runner itself, e.g. `[Process error] ...`
    pub fn push_note(&mut self, text: impl Into<String>) {
        self.push(Stream::Stderr, text);
    }

    pub fn lines(&self) -> impl Iterator<Item = &OutputLine> {
        self.lines.iter()
    }

    pub fn filtered<'a>(&'a self, filter: &'a OutputFilter) -> impl Iterator<Item = &'a OutputLine> {
        self.lines.iter().filter(move |line| filter.matches(line))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines received, including dropped ones
    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn dropped_lines(&self) -> usize {
        self.total_lines - self.lines.len()
    }

    pub fn error_lines(&self) -> usize {
        self.error_lines
    }

    pub fn warning_lines(&self) -> usize {
        self.warning_lines
    }

    pub fn last_progress(&self) -> Option<u8> {
        self.last_progress
    }

    pub fn clear(&mut self) {
        *self = Self::with_capacity(self.capacity);
    }

    /// Plain text of the kept lines
    pub fn text(&self, timestamps: bool) -> String {
        let mut out = String::new();
        for line in &self.lines {
            if timestamps {
                out.push_str(&line.with_timestamp());
            } else {
                out.push_str(&line.text);
            }
            out.push('\n');
        }
        out
    }
}
