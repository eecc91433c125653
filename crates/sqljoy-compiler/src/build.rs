//! Two-pass build orchestration.
//!
//! The bundler itself is a host concern; this module owns the choreography
//! around it: run the client build with the compile hook installed, gather
//! the allow-lists, feed the synthesized server entry back in, drain the
//! undo log, run the server build.

use sqljoy_ast::Module;

use crate::compiler::{Compiler, CompilerConfig};
use crate::diagnostics::Diagnostic;
use crate::emit::OutputFile;
use crate::options::{BuildOptions, Options, StdinOptions};

/// What one bundler invocation produced.
#[derive(Debug, Default)]
pub struct BuildResult {
    pub errors: Vec<Diagnostic>,
    pub output_files: Vec<OutputFile>,
}

/// The hook a bundler invokes after parsing, before emitting: the full
/// module set plus the source indices of the entry points. The hook
/// mutates the ASTs in place.
pub type CompileHook<'h> = &'h mut dyn FnMut(&BuildOptions, &mut Vec<Module>, &[u32]);

/// The contract a host bundler implements. `bundle` parses and links the
/// configured entry points, invokes the hook once, then emits.
pub trait Bundler {
    fn bundle(&mut self, options: &BuildOptions, hook: CompileHook<'_>) -> BuildResult;
}

/// Everything up to the final '/' of a path, `.` when there is none.
fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(i) => path[..i].to_string(),
        None => ".".to_string(),
    }
}

/// Run the full two-pass build: client bundle + allow-lists, undo drain,
/// server bundle from the synthesized entry module.
pub fn build(options: &mut Options, bundler: &mut dyn Bundler) -> BuildResult {
    let mut compiler = Compiler::new(CompilerConfig {
        include: options.include.clone(),
        exclude: options.exclude.clone(),
        debug: true,
        write: options.client.write,
    });

    let mut base_dir = String::new();
    let mut whitelists: Vec<OutputFile> = Vec::new();

    let client_result = {
        let compiler = &mut compiler;
        let base_dir = &mut base_dir;
        let whitelists = &mut whitelists;
        let mut hook = |opts: &BuildOptions, modules: &mut Vec<Module>, entry_points: &[u32]| {
            assert!(!entry_points.is_empty(), "no entry point defined");
            let out_dir = parent_dir(&opts.outfile);
            let entry = modules
                .iter()
                .find(|m| m.source.index == entry_points[0])
                .expect("entry point names a parsed module");
            *base_dir = parent_dir(&entry.source.key_path);
            compiler.compile_client(&out_dir, base_dir, modules);

            if let Some(file) = compiler.client_whitelist_file.take() {
                whitelists.push(file);
            }
            if let Some(file) = compiler.server_whitelist_file.take() {
                whitelists.push(file);
            }
        };
        bundler.bundle(&options.client, &mut hook)
    };

    let mut errors: Vec<Diagnostic> = compiler
        .diagnostics
        .iter()
        .filter(|d| d.is_error())
        .cloned()
        .collect();
    errors.extend(client_result.errors);
    if !errors.is_empty() {
        return BuildResult {
            errors,
            output_files: client_result.output_files,
        };
    }

    options.server.stdin = Some(StdinOptions {
        contents: compiler.server_file.clone(),
        resolve_dir: base_dir,
    });

    let server_result = {
        let compiler = &mut compiler;
        let mut hook = |_: &BuildOptions, modules: &mut Vec<Module>, _: &[u32]| {
            compiler.compile_server(modules);
        };
        bundler.bundle(&options.server, &mut hook)
    };

    let mut output_files = whitelists;
    output_files.extend(client_result.output_files);
    output_files.extend(server_result.output_files);
    BuildResult {
        errors: server_result.errors,
        output_files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{TestModule, render_expr};

    #[test]
    fn parent_dir_of_paths() {
        assert_eq!(parent_dir("dist/client.bundle.js"), "dist");
        assert_eq!(parent_dir("client.bundle.js"), ".");
        assert_eq!(parent_dir("/app.js"), "/");
    }

    /// A bundler double: hands its parsed modules to the hook and reports
    /// one output file per invocation.
    struct MemoryBundler {
        modules: Vec<Module>,
        entry_points: Vec<u32>,
        invocations: usize,
    }

    impl Bundler for MemoryBundler {
        fn bundle(&mut self, options: &BuildOptions, hook: CompileHook<'_>) -> BuildResult {
            self.invocations += 1;
            hook(options, &mut self.modules, &self.entry_points);
            BuildResult {
                errors: Vec::new(),
                output_files: vec![OutputFile {
                    path: options.outfile.clone(),
                    contents: Vec::new(),
                }],
            }
        }
    }

    #[test]
    fn two_pass_build_flips_the_ast_between_bundles() {
        let mut tm = TestModule::new(0, "/app.js");
        let query = tm.b.symbol("query");
        let template = tm.sql_template("select 1", vec![]);
        tm.b.const_decl(query, template);
        let q_id = tm.b.ident(query);
        tm.execute_query(vec![q_id]);

        let mut bundler = MemoryBundler {
            modules: vec![tm.finish()],
            entry_points: vec![0],
            invocations: 0,
        };

        let mut options = Options::from_json(
            r#"{"client": {"entryPoints": ["app.js"], "write": false}, "server": {"write": false}}"#,
            "build",
        )
        .expect("valid config");

        let result = build(&mut options, &mut bundler);
        assert!(result.errors.is_empty());
        assert_eq!(bundler.invocations, 2);

        // Allow-list plus the two bundles.
        let paths: Vec<&str> = result.output_files.iter().map(|f| f.path.as_str()).collect();
        assert!(paths.iter().any(|p| p.ends_with("client-queries.json")));
        assert!(paths.contains(&"client.bundle.js"));
        assert!(paths.contains(&"server.bundle.js"));

        // The server pass starts from the synthesized entry module.
        let stdin = options.server.stdin.as_ref().expect("server stdin set");
        assert!(stdin.contents.contains("export const functions"));
        assert_eq!(stdin.resolve_dir, "/");

        // Client-only query: by the time the server bundle was emitted the
        // undo drain had blanked it.
        assert_eq!(render_expr(&bundler.modules[0].ast, template), "void 0");
    }

    #[test]
    fn client_errors_stop_the_build() {
        let mut tm = TestModule::new(0, "/app.js");
        let mystery = tm.b.symbol("mystery");
        let m_id = tm.b.ident(mystery);
        tm.execute_query(vec![m_id]);

        let mut bundler = MemoryBundler {
            modules: vec![tm.finish()],
            entry_points: vec![0],
            invocations: 0,
        };
        let mut options = Options::from_json(
            r#"{"client": {"entryPoints": ["app.js"], "write": false}}"#,
            "build",
        )
        .expect("valid config");

        let result = build(&mut options, &mut bundler);
        assert!(!result.errors.is_empty());
        // The server pass never ran.
        assert_eq!(bundler.invocations, 1);
        assert!(options.server.stdin.is_none());
    }
}
