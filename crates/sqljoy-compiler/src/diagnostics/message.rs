//! Diagnostic message types.

use sqljoy_ast::Loc;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single message with an optional source location. `source` is the
/// module's source index; configuration-level messages carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub source: Option<u32>,
    pub loc: Loc,
    pub message: String,
}

impl Diagnostic {
    pub fn error(source: Option<u32>, loc: Loc, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            source,
            loc,
            message: message.into(),
        }
    }

    pub fn warning(source: Option<u32>, loc: Loc, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            source,
            loc,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}
