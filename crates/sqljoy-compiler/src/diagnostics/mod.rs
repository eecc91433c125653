//! Compiler diagnostics infrastructure.
//!
//! Messages are collected during analysis and compilation; `has_errors()`
//! gates output emission. Rendering against module sources happens in the
//! printer.

mod collection;
mod message;
mod printer;

pub use collection::Diagnostics;
pub use message::{Diagnostic, Severity};
pub use printer::DiagnosticsPrinter;
