//! Build-time compiler for tagged SQL templates.
//!
//! Sits behind a JavaScript bundler's compile hook and transforms a parsed
//! module graph in place: `sql`/`sql.p` tagged templates become
//! hash-identified query objects, server calls become
//! `x.serverCall("<hash>", ...)`, and two JSON allow-lists plus a
//! synthesized server entry module are emitted. The same ASTs are
//! serialized twice, with an undo log flipping the trees between the
//! client and server forms.
//!
//! # Example
//!
//! ```ignore
//! let mut options = Options::from_json(&config_text, "build")?;
//! let result = build(&mut options, &mut my_bundler);
//! if !result.errors.is_empty() {
//!     std::process::exit(1);
//! }
//! ```

pub mod analyze;
pub mod build;
pub mod compiler;
pub mod diagnostics;
pub mod emit;
pub mod options;
pub mod query;
pub mod rewrite;

#[cfg(test)]
mod test_util;

#[cfg(test)]
mod compiler_tests;

pub use build::{Bundler, BuildResult, CompileHook, build};
pub use compiler::{Compiler, CompilerConfig};
pub use diagnostics::{Diagnostic, Diagnostics, DiagnosticsPrinter, Severity};
pub use emit::OutputFile;
pub use options::{BuildOptions, ConfigError, LogLevel, Options, StdinOptions};
