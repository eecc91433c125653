//! Diagnostics collection for accumulating compiler messages.

use sqljoy_ast::Loc;

use super::message::{Diagnostic, Severity};

/// Collection of diagnostic messages from analysis and compilation.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn add_error(&mut self, source: Option<u32>, loc: Loc, message: impl Into<String>) {
        self.0.push(Diagnostic::error(source, loc, message));
    }

    pub fn add_warning(&mut self, source: Option<u32>, loc: Loc, message: impl Into<String>) {
        self.0.push(Diagnostic::warning(source, loc, message));
    }

    pub fn extend(&mut self, iter: impl IntoIterator<Item = Diagnostic>) {
        self.0.extend(iter);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.0.iter().any(|d| d.is_warning())
    }

    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|d| d.is_error()).count()
    }

    pub fn filter_by_severity(&self, severity: Severity) -> Vec<&Diagnostic> {
        self.0.iter().filter(|d| d.severity == severity).collect()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_errors_ignores_warnings() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_warning(None, Loc(0), "query is unused");
        assert!(!diagnostics.has_errors());
        assert!(diagnostics.has_warnings());

        diagnostics.add_error(None, Loc(0), "executeQuery must be invoked as a method");
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.error_count(), 1);
    }
}
