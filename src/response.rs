use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal finding about the input or the generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// JSON pointer (`#/properties/a`) of the schema location, or the
    /// declaration name for formatter findings.
    pub pointer: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Warning, pointer: pointer.into(), message: message.into() }
    }

    pub fn error(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Error, pointer: pointer.into(), message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: {} ({})", self.message, self.pointer)
    }
}

/// Result of one conversion: the assembled source plus every diagnostic
/// raised along the way. Non-empty diagnostics mean "complete but suspect";
/// the caller decides whether that blocks the build.
#[derive(Debug, Clone)]
pub struct Response {
    source: String,
    diagnostics: Vec<Diagnostic>,
}

impl Response {
    pub(crate) fn new(source: String, diagnostics: Vec<Diagnostic>) -> Self {
        Response { source, diagnostics }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn into_source(self) -> String {
        self.source
    }
}
