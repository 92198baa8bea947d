//! Error types for template compilation.
//!
//! Every failure is fatal for the file being compiled. Errors carry enough
//! context (file, what was being processed, what was found) to be reported
//! without the caller having to re-inspect the template.

use std::fmt;
use std::path::{Path, PathBuf};

/// The kind of compile error that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// The template front-end could not turn the source into a tree.
    TemplateSyntax,
    /// The directive block is not valid declaration syntax.
    DirectiveParse,
    /// A template file (or a referenced layout file) could not be read.
    UnreadableFile,
    /// Layout resolution revisited a file that is already being compiled.
    LayoutCycle,
    /// The tree contains a node kind outside the four known modes.
    UnknownNodeKind,
    /// The tree breaks the shape the front-end promised (root, parent links).
    MalformedTree,
}

impl CompileErrorKind {
    /// Returns a human-readable description of this error kind.
    pub fn description(&self) -> &'static str {
        match self {
            Self::TemplateSyntax => "template syntax error",
            Self::DirectiveParse => "malformed directive block",
            Self::UnreadableFile => "cannot read template file",
            Self::LayoutCycle => "layout cycle detected",
            Self::UnknownNodeKind => "unknown node kind in template tree",
            Self::MalformedTree => "malformed template tree",
        }
    }
}

/// A compile error with context information.
#[derive(Debug, Clone)]
pub struct CompileError {
    /// The kind of error.
    pub kind: CompileErrorKind,
    /// The template file being compiled, when known.
    pub file: Option<PathBuf>,
    /// Context describing what was being processed.
    pub context: String,
    /// What was actually found.
    pub found: Option<String>,
    /// Optional help text for fixing the error.
    pub help: Option<String>,
    /// Source chain for nested errors (e.g. a failure inside a layout).
    pub source: Option<Box<CompileError>>,
}

impl CompileError {
    /// Creates a new compile error.
    pub fn new(kind: CompileErrorKind) -> Self {
        Self {
            kind,
            file: None,
            context: String::new(),
            found: None,
            help: None,
            source: None,
        }
    }

    /// Creates a "malformed directive" error from a parser message.
    pub fn directive(message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::DirectiveParse)
            .with_context("directive block")
            .with_found(message)
    }

    /// Creates an "unreadable file" error for `path`.
    pub fn unreadable(path: &Path, err: &std::io::Error) -> Self {
        Self::new(CompileErrorKind::UnreadableFile)
            .with_file(path)
            .with_found(err.to_string())
    }

    /// Creates a layout cycle error listing the chain of files involved.
    ///
    /// `chain` is the in-progress stack; `again` is the file that closed the loop.
    pub fn cycle(chain: &[PathBuf], again: &Path) -> Self {
        let mut links: Vec<String> = chain.iter().map(|p| p.display().to_string()).collect();
        links.push(again.display().to_string());
        Self::new(CompileErrorKind::LayoutCycle)
            .with_file(again)
            .with_context("layout resolution")
            .with_found(links.join(" -> "))
            .with_help("a layout must not (directly or indirectly) use itself as its layout")
    }

    /// Creates an "unknown node kind" error for a raw mode code.
    pub fn unknown_node(code: u8) -> Self {
        Self::new(CompileErrorKind::UnknownNodeKind)
            .with_found(format!("mode code {code}"))
            .with_help("the template parser produced a node the compiler does not understand")
    }

    /// Creates a "malformed tree" error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::MalformedTree).with_found(message)
    }

    /// Creates a front-end syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::TemplateSyntax).with_found(message)
    }

    /// Sets the file, unless one is already recorded.
    pub fn with_file(mut self, file: impl AsRef<Path>) -> Self {
        if self.file.is_none() {
            self.file = Some(file.as_ref().to_path_buf());
        }
        self
    }

    /// Adds context to the error.
    pub fn with_context(mut self, context: &str) -> Self {
        self.context = context.to_string();
        self
    }

    /// Adds the found item to the error.
    pub fn with_found(mut self, found: impl Into<String>) -> Self {
        self.found = Some(found.into());
        self
    }

    /// Adds help text to the error.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Adds a source error (for error chaining).
    pub fn with_source(mut self, source: CompileError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Converts the error to a user-friendly message.
    pub fn to_message(&self) -> String {
        let mut msg = String::from("error: ");
        msg.push_str(self.kind.description());

        if let Some(ref file) = self.file {
            msg.push_str(&format!(" in {}", file.display()));
        }
        if !self.context.is_empty() {
            msg.push_str(&format!(" (while processing {})", self.context));
        }
        if let Some(ref found) = self.found {
            msg.push_str(&format!(": {found}"));
        }
        if let Some(ref help) = self.help {
            msg.push_str(&format!("\n  help: {help}"));
        }
        if let Some(ref source) = self.source {
            msg.push_str(&format!("\n  caused by: {}", source.to_message()));
        }

        msg
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_message())
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_error_names_file() {
        let err = CompileError::directive("expected `;`").with_file("views/index.rshtml");
        let msg = err.to_message();
        assert!(msg.contains("malformed directive block"));
        assert!(msg.contains("views/index.rshtml"));
        assert!(msg.contains("expected `;`"));
    }

    #[test]
    fn test_with_file_keeps_innermost_file() {
        let err = CompileError::directive("bad")
            .with_file("layout/base.rshtml")
            .with_file("pages/home.rshtml");
        assert_eq!(err.file.as_deref(), Some(Path::new("layout/base.rshtml")));
    }

    #[test]
    fn test_cycle_error_lists_chain() {
        let chain = vec![PathBuf::from("/t/layout/a.rshtml"), PathBuf::from("/t/layout/b.rshtml")];
        let err = CompileError::cycle(&chain, Path::new("/t/layout/a.rshtml"));
        assert_eq!(err.kind, CompileErrorKind::LayoutCycle);
        let msg = err.to_string();
        assert!(msg.contains("/t/layout/a.rshtml -> /t/layout/b.rshtml -> /t/layout/a.rshtml"));
        assert!(msg.contains("help:"));
    }

    #[test]
    fn test_error_with_source_chain() {
        let inner = CompileError::unknown_node(9);
        let outer = CompileError::new(CompileErrorKind::TemplateSyntax)
            .with_context("layout")
            .with_source(inner);
        let msg = outer.to_message();
        assert!(msg.contains("caused by:"));
        assert!(msg.contains("mode code 9"));
        assert!(std::error::Error::source(&outer).is_some());
    }

    #[test]
    fn test_all_error_kinds_have_descriptions() {
        let kinds = [
            CompileErrorKind::TemplateSyntax,
            CompileErrorKind::DirectiveParse,
            CompileErrorKind::UnreadableFile,
            CompileErrorKind::LayoutCycle,
            CompileErrorKind::UnknownNodeKind,
            CompileErrorKind::MalformedTree,
        ];
        for kind in kinds {
            assert!(!kind.description().is_empty(), "{:?} has empty description", kind);
        }
    }
}
