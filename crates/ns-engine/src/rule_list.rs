//! Raw filter list text and its line scanner.

use std::sync::Arc;

use ns_rules::{CosmeticKind, ParseOptions};

use crate::tokenizer::{tokenize, RuleParts, Span};

bitflags::bitflags! {
    /// Which rule categories a scanner yields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScanMode: u8 {
        const NETWORK = 1 << 0;
        const COSMETIC = 1 << 1;
        const HOST = 1 << 2;

        const ALL = Self::NETWORK.bits() | Self::COSMETIC.bits() | Self::HOST.bits();
    }
}

/// One filter list: an id and its raw text.
#[derive(Debug, Clone)]
pub struct RuleList {
    id: u32,
    text: Arc<str>,
    ignore_cosmetic: bool,
    ignore_js: bool,
    ignore_unsafe: bool,
}

impl RuleList {
    pub fn new(id: u32, text: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            text: text.into(),
            ignore_cosmetic: false,
            ignore_js: false,
            ignore_unsafe: false,
        }
    }

    pub fn ignore_cosmetic(mut self, ignore: bool) -> Self {
        self.ignore_cosmetic = ignore;
        self
    }

    pub fn ignore_js(mut self, ignore: bool) -> Self {
        self.ignore_js = ignore;
        self
    }

    /// Drop rules with request-rewriting modifiers (`$redirect`, `$csp`, ...).
    pub fn ignore_unsafe(mut self, ignore: bool) -> Self {
        self.ignore_unsafe = ignore;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_ignoring_unsafe(&self) -> bool {
        self.ignore_unsafe
    }

    /// Parser switches for rules of this list.
    pub fn parse_options(&self, ignore_host: bool) -> ParseOptions {
        ParseOptions {
            ignore_cosmetic: self.ignore_cosmetic,
            ignore_js: self.ignore_js,
            ignore_host,
        }
    }

    /// The line starting at byte `offset`, without its line terminator.
    /// `None` unless `offset` is the start of a line.
    pub fn rule_text(&self, offset: usize) -> Option<&str> {
        if offset >= self.text.len() {
            return None;
        }
        if offset > 0 && self.text.as_bytes()[offset - 1] != b'\n' {
            return None;
        }
        let rest = &self.text[offset..];
        let line = match rest.find('\n') {
            Some(idx) => &rest[..idx],
            None => rest,
        };
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    pub fn scanner(&self, mode: ScanMode) -> RuleScanner {
        RuleScanner {
            text: Arc::clone(&self.text),
            pos: 0,
            mode,
            ignore_cosmetic: self.ignore_cosmetic,
            ignore_js: self.ignore_js,
        }
    }
}

/// A tokenized line of a list.
#[derive(Debug, Clone)]
pub struct ScannedLine {
    text: Arc<str>,
    line: Span,
    pub parts: RuleParts,
}

impl ScannedLine {
    /// The rule line; `parts` spans are relative to it.
    pub fn line(&self) -> &str {
        self.line.of(&self.text)
    }

    /// Byte offset of the line inside its list.
    pub fn offset(&self) -> usize {
        self.line.start
    }
}

/// Iterates the rule lines of one list that match a [`ScanMode`].
#[derive(Debug)]
pub struct RuleScanner {
    text: Arc<str>,
    pos: usize,
    mode: ScanMode,
    ignore_cosmetic: bool,
    ignore_js: bool,
}

impl RuleScanner {
    fn accepts(&self, parts: &RuleParts) -> bool {
        match parts {
            RuleParts::Network(_) => self.mode.contains(ScanMode::NETWORK),
            RuleParts::Host(_) => self.mode.contains(ScanMode::HOST),
            RuleParts::Cosmetic(parts) => {
                self.mode.contains(ScanMode::COSMETIC)
                    && !(self.ignore_js && parts.kind() == CosmeticKind::Js)
            }
        }
    }
}

impl Iterator for RuleScanner {
    type Item = ScannedLine;

    fn next(&mut self) -> Option<ScannedLine> {
        let ignore_cosmetic = self.ignore_cosmetic || !self.mode.contains(ScanMode::COSMETIC);

        while self.pos < self.text.len() {
            let start = self.pos;
            let rest = &self.text[start..];
            let (end, next) = match rest.find('\n') {
                Some(idx) => (start + idx, start + idx + 1),
                None => (self.text.len(), self.text.len()),
            };
            self.pos = next;

            let line_end = if self.text[start..end].ends_with('\r') { end - 1 } else { end };
            let line = Span::new(start, line_end);

            // Host lines are always recognized so they never masquerade as
            // network rules; the mode decides whether they are yielded.
            let parts = match tokenize(line.of(&self.text), ignore_cosmetic, false) {
                Some(parts) => parts,
                None => continue,
            };
            if !self.accepts(&parts) {
                continue;
            }

            return Some(ScannedLine {
                text: Arc::clone(&self.text),
                line,
                parts,
            });
        }
        None
    }
}
