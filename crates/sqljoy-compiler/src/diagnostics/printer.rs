//! Rendering diagnostics against module sources.

use std::fmt::Write;

use annotate_snippets::{Level, Renderer, Snippet};
use sqljoy_ast::Module;

use super::message::{Diagnostic, Severity};

pub struct DiagnosticsPrinter<'a> {
    diagnostics: &'a [Diagnostic],
    modules: &'a [Module],
    colored: bool,
}

impl<'a> DiagnosticsPrinter<'a> {
    pub fn new(diagnostics: &'a [Diagnostic], modules: &'a [Module]) -> Self {
        Self {
            diagnostics,
            modules,
            colored: false,
        }
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_str("\n\n")?;
            }

            let level = severity_to_level(diag.severity);
            let module = diag
                .source
                .and_then(|s| self.modules.iter().find(|m| m.source.index == s));

            let Some(module) = module else {
                write!(w, "{}", renderer.render(level.title(&diag.message)))?;
                continue;
            };

            let contents = module.source.contents.as_str();
            let start = (diag.loc.0 as usize).min(contents.len());
            let end = (start + 1).min(contents.len()).max(start);
            let message = level.title(&diag.message).snippet(
                Snippet::source(contents)
                    .origin(&module.source.pretty_path)
                    .line_start(1)
                    .fold(true)
                    .annotation(level.span(start..end)),
            );
            write!(w, "{}", renderer.render(message))?;
        }

        Ok(())
    }
}

fn severity_to_level(severity: Severity) -> Level {
    match severity {
        Severity::Error => Level::Error,
        Severity::Warning => Level::Warning,
    }
}
