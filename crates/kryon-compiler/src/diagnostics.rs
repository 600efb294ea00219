//! Source locations and accumulated diagnostics, shared by every compiler phase (§3, §7).

use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A byte-offset span within a single source file. Immutable after creation (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub offset: u32,
    pub length: u32,
}

impl Span {
    pub fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }
}

/// Anything that carries a location can be asked for one (tokens, AST nodes, diagnostics).
pub trait Spanned {
    fn span(&self) -> SourceLocation;
}

#[derive(Debug, Default, PartialEq)]
struct SourceFileInner {
    path: PathBuf,
    source: String,
    line_offsets: Vec<u32>,
}

impl SourceFileInner {
    fn new(path: PathBuf, source: String) -> Self {
        let line_offsets = source
            .bytes()
            .enumerate()
            .filter_map(|(i, b)| (b == b'\n').then_some(i as u32 + 1))
            .collect();
        Self { path, source, line_offsets }
    }

    /// 1-based (line, column), with `\r\n` counted as a single newline (§4.A).
    fn line_column(&self, offset: u32) -> (u32, u32) {
        match self.line_offsets.binary_search(&offset) {
            Ok(line) => (line as u32 + 2, 1),
            Err(line) => {
                let line_start = if line == 0 { 0 } else { self.line_offsets[line - 1] };
                (line as u32 + 1, offset - line_start + 1)
            }
        }
    }
}

/// A loaded source file, cheap to clone and share across tokens/nodes/diagnostics.
pub type SourceFile = Rc<SourceFileInner>;

pub fn source_file(path: impl Into<PathBuf>, source: impl Into<String>) -> SourceFile {
    Rc::new(SourceFileInner::new(path.into(), source.into()))
}

/// An unnamed, in-memory source file, for the byte-buffer API variants (§5).
pub fn anonymous_source_file(source: impl Into<String>) -> SourceFile {
    source_file("<memory>", source)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceLocation {
    pub file: SourceFile,
    pub span: Span,
}

impl SourceLocation {
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    pub fn line_column(&self) -> (u32, u32) {
        self.file.line_column(self.span.offset)
    }

    pub fn text(&self) -> &str {
        let start = self.span.offset as usize;
        let end = start + self.span.length as usize;
        self.file.source.get(start..end).unwrap_or_default()
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (line, col) = self.line_column();
        write!(f, "{}:{}:{}", self.path().display(), line, col)
    }
}

/// Severity of a diagnostic (§7). Ordered so that `>=` checks whether a
/// diagnostic should block moving on to the next compilation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Note,
    Warning,
    Error,
    Fatal,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub fix_suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self { severity, message: message.into(), location: None, fix_suggestion: None }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix_suggestion = Some(fix.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Info => "info",
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        match &self.location {
            Some(loc) => write!(f, "{tag}: {loc}: {}", self.message),
            None => write!(f, "{tag}: {}", self.message),
        }?;
        if let Some(fix) = &self.fix_suggestion {
            write!(f, " (suggestion: {fix})")?;
        }
        Ok(())
    }
}

/// Accumulates diagnostics across a compiler phase; every phase returns one of
/// these alongside its result instead of bailing out on the first problem
/// (§7 "Propagation").
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::debug!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.push(Diagnostic::new(Severity::Error, message).at(location));
    }

    pub fn warning(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.push(Diagnostic::new(Severity::Warning, message).at(location));
    }

    /// Errors above `Warning` block moving to the next phase (§7).
    pub fn has_blocking_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity > Severity::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// Severity counts, for a one-line summary on request (§7).
    pub fn summary(&self) -> (usize, usize, usize) {
        let mut errors = 0;
        let mut warnings = 0;
        let mut notes = 0;
        for d in &self.entries {
            match d.severity {
                Severity::Error | Severity::Fatal => errors += 1,
                Severity::Warning => warnings += 1,
                Severity::Note | Severity::Info => notes += 1,
            }
        }
        (errors, warnings, notes)
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for d in &self.entries {
            writeln!(f, "{d}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_column_tracks_newlines_and_resets_column() {
        let file = source_file("a.kry", "Button {\ntext: \"Hi\";\n}");
        let loc = SourceLocation { file: file.clone(), span: Span::new(9, 4) };
        assert_eq!(loc.line_column(), (2, 1));
        assert_eq!(loc.text(), "text");
    }

    #[test]
    fn crlf_counts_as_one_newline() {
        let file = source_file("a.kry", "a\r\nb");
        // offset of 'b' is 3, the first character of line 2
        assert_eq!(file.line_column(3), (2, 1));
    }

    #[test]
    fn blocking_errors_detected_above_warning() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_blocking_errors());
        diags.push(Diagnostic::new(Severity::Warning, "just a warning"));
        assert!(!diags.has_blocking_errors());
        diags.push(Diagnostic::new(Severity::Error, "boom"));
        assert!(diags.has_blocking_errors());
        let (errors, warnings, _) = diags.summary();
        assert_eq!(errors, 1);
        assert_eq!(warnings, 1);
    }
}
