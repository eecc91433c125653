//! The global compile pass.
//!
//! Phase 1 runs one analyzer per module concurrently; the scope join is the
//! barrier. The global pass then resolves every `executeQuery` argument to
//! candidate queries, compiles reachable queries (inlining single-candidate
//! fragments), replaces templates with query objects, rewrites server
//! calls, and emits the allow-lists plus the synthesized server entry
//! module. All AST mutation happens on this thread, through the rewriter.

use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use sqljoy_ast::{ExprData, ExprId, Module, Ref, clone::clone_expr};

use crate::analyze::{
    ModuleAnalyzer, ServerCall, analyze_module, find_original_ref, ref_for_identifier_or_member,
};
use crate::diagnostics::Diagnostics;
use crate::emit::server_entry::{ImportedName, new_import, relative_path, synthesize_server_entry};
use crate::emit::{OutputFile, serialize_whitelist, whitelist_entries};
use crate::query::{
    QueryRc, QueryUsage, QueryVar, QueryVarType, merge_candidates, new_query, query_type_of,
    sort_whitelist,
};
use crate::rewrite::{ExprRef, PartRef, Rewriter, expr_data};

const SERVER_CALL_METHOD: &str = "serverCall";
const LATE_BOUND_PARAM: &str = "__PARAM_";

const ERR_QUERY_AS_QUERY_PART: &str =
    "cannot use a query (created with sql``) as a query part: use sql.p`` instead";
const ERR_QUERY_PART_AS_QUERY: &str =
    "cannot use a query part (created with sql.p``) as a query: use sql`${part}` instead";

type AllQueries = IndexMap<Ref, Vec<QueryRc>>;

/// Settings the compiler needs from the configuration layer.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Include query text in replacements even for client-only queries.
    pub debug: bool,
    /// Write the allow-list JSON files to disk.
    pub write: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            debug: true,
            write: false,
        }
    }
}

pub struct Compiler {
    pub diagnostics: Diagnostics,
    pub analyzers: Vec<Option<ModuleAnalyzer>>,
    rewriter: Rewriter,
    config: CompilerConfig,
    out_dir: String,
    base_dir: String,
    /// Synthesized server entry-point source.
    pub server_file: String,
    pub client_whitelist_file: Option<OutputFile>,
    pub server_whitelist_file: Option<OutputFile>,
}

fn module(modules: &[Module], source: u32) -> &Module {
    modules
        .iter()
        .find(|m| m.source.index == source)
        .expect("source index outside the build")
}

fn module_mut(modules: &mut [Module], source: u32) -> &mut Module {
    modules
        .iter_mut()
        .find(|m| m.source.index == source)
        .expect("source index outside the build")
}

/// Borrow one module shared and another mutably. The two must differ.
fn two_modules_mut(modules: &mut [Module], from: u32, to: u32) -> (&Module, &mut Module) {
    assert_ne!(from, to, "cross-module copy within one module");
    let from_pos = modules
        .iter()
        .position(|m| m.source.index == from)
        .expect("source index outside the build");
    let to_pos = modules
        .iter()
        .position(|m| m.source.index == to)
        .expect("source index outside the build");
    if from_pos < to_pos {
        let (head, tail) = modules.split_at_mut(to_pos);
        (&head[from_pos], &mut tail[0])
    } else {
        let (head, tail) = modules.split_at_mut(from_pos);
        (&tail[0], &mut head[to_pos])
    }
}

/// One `executeQuery` call with its candidate queries resolved.
struct ResolvedExecution {
    source_index: u32,
    call: ExprId,
    queries: Vec<QueryRc>,
}

fn string_prop(
    ast: &mut sqljoy_ast::Ast,
    loc: sqljoy_ast::Loc,
    key: &str,
    value: ExprId,
) -> sqljoy_ast::Property {
    sqljoy_ast::Property {
        key: ast.alloc_expr(loc, ExprData::String(key.to_string())),
        value: Some(value),
        initializer: None,
    }
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            diagnostics: Diagnostics::new(),
            analyzers: Vec::new(),
            rewriter: Rewriter::new(),
            config,
            out_dir: String::new(),
            base_dir: String::new(),
            server_file: String::new(),
            client_whitelist_file: None,
            server_whitelist_file: None,
        }
    }

    /// The client-build half of the pass: analyze every file in parallel,
    /// then run the global pass and produce outputs. Invoked from the
    /// bundler's compile hook before the client bundle is emitted.
    pub fn compile_client(&mut self, out_dir: &str, base_dir: &str, modules: &mut [Module]) {
        self.out_dir = out_dir.to_string();
        self.base_dir = base_dir.to_string();

        let max_index = modules
            .iter()
            .map(|m| m.source.index as usize)
            .max()
            .map_or(0, |m| m + 1);
        let mut analyzers: Vec<Option<ModuleAnalyzer>> = Vec::with_capacity(max_index);
        analyzers.resize_with(max_index, || None);

        {
            let shared: &[Module] = modules;
            let eligible: Vec<u32> = shared
                .iter()
                .filter(|m| self.should_analyze(&m.source.key_path))
                .map(|m| m.source.index)
                .collect();

            // One task per file; the scope join is the barrier before the
            // global pass.
            let results = std::thread::scope(|scope| {
                let handles: Vec<_> = eligible
                    .iter()
                    .map(|&index| scope.spawn(move || analyze_module(shared, index)))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().expect("analyzer task panicked"))
                    .collect::<Vec<_>>()
            });
            for analyzer in results {
                let index = analyzer.source_index as usize;
                analyzers[index] = Some(analyzer);
            }
        }

        for analyzer in analyzers.iter_mut().flatten() {
            let diagnostics = std::mem::take(&mut analyzer.diagnostics);
            self.diagnostics.extend(diagnostics);
        }
        self.analyzers = analyzers;

        self.generate_outputs(modules);
    }

    /// The server-build half: drain the undo log so the same ASTs serialize
    /// into the server bundle.
    pub fn compile_server(&mut self, modules: &mut [Module]) {
        self.rewriter.drain(modules);
    }

    fn should_analyze(&self, key_path: &str) -> bool {
        if key_path == "<runtime>" {
            return false;
        }
        if self
            .config
            .exclude
            .iter()
            .any(|dir| key_path.starts_with(dir.as_str()))
        {
            return false;
        }
        if !self.config.include.is_empty() {
            return self
                .config
                .include
                .iter()
                .any(|dir| key_path.starts_with(dir.as_str()));
        }
        true
    }

    fn generate_outputs(&mut self, modules: &mut [Module]) {
        // Every discovered template becomes an uncompiled query keyed by
        // its canonical-to-be ref. Conditional definitions put several
        // queries under one ref.
        let mut all: AllQueries = IndexMap::new();
        for analyzer in self.analyzers.iter().flatten() {
            for qt in &analyzer.queries {
                let q = new_query(qt, module(modules, qt.source_index));
                all.entry(qt.query_ref).or_default().push(q);
            }
        }

        // Resolve each executeQuery's first argument to candidate queries
        // and attach the usage.
        let mut executions: Vec<ResolvedExecution> = Vec::new();
        for index in 0..self.analyzers.len() {
            let pending: Vec<_> = match &self.analyzers[index] {
                Some(a) => a.query_executions.clone(),
                None => continue,
            };
            let source_index = index as u32;
            for qe in pending {
                let ast = &module(modules, source_index).ast;
                let ExprData::Call { args, .. } = &ast.expr(qe.call).data else {
                    continue;
                };
                let first = args[0];
                let arg_loc = ast.expr(first).loc;
                let queries =
                    self.find_query_for_expr(modules, &all, ExprRef::new(source_index, first));

                if queries.is_empty() {
                    self.diagnostics.add_error(
                        Some(source_index),
                        arg_loc,
                        "could not identify query for first argument to executeQuery",
                    );
                    continue;
                }

                for q in &queries {
                    if q.borrow().is_fragment() {
                        self.diagnostics.add_error(
                            Some(source_index),
                            arg_loc,
                            ERR_QUERY_PART_AS_QUERY,
                        );
                        continue;
                    }
                    q.borrow_mut().calls.push(QueryUsage {
                        call: ExprRef::new(source_index, qe.call),
                        is_server: qe.is_server,
                    });
                }
                executions.push(ResolvedExecution {
                    source_index,
                    call: qe.call,
                    queries,
                });
            }
        }

        // Compile and replace every reachable query; wire validators.
        let mut validators: BTreeMap<String, Vec<ImportedName>> = BTreeMap::new();
        let mut validators_by_query: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for exec in &executions {
            for q in &exec.queries {
                if q.borrow().is_fragment() {
                    continue;
                }
                if !self.compile_query(modules, &all, q) {
                    continue;
                }
                self.replace_query(modules, q);
                {
                    let mut qb = q.borrow_mut();
                    qb.ty = query_type_of(&qb.query_text);
                }

                // Arguments past (query, params) are validator functions.
                let validator_args: Vec<ExprId> = {
                    let ast = &module(modules, exec.source_index).ast;
                    match &ast.expr(exec.call).data {
                        ExprData::Call { args, .. } if args.len() > 2 => args[2..].to_vec(),
                        _ => Vec::new(),
                    }
                };
                for validator in validator_args {
                    let Some((_, imp)) = self.find_import_for_function_identifier(
                        modules,
                        exec.source_index,
                        validator,
                        &mut validators,
                    ) else {
                        continue;
                    };
                    validators_by_query
                        .entry(q.borrow().hash.clone())
                        .or_default()
                        .push(imp.hash);
                }
            }
        }

        // Partition into the two allow-lists. Unreachable queries are
        // included when referenced at all, since reachability is not known
        // exactly; fragments never appear at the top level.
        let mut client_list: Vec<QueryRc> = Vec::new();
        let mut server_list: Vec<QueryRc> = Vec::new();
        for queries in all.values() {
            for q in queries {
                let (is_fragment, template, icc, cr, isc, sr, inlined) = {
                    let qb = q.borrow();
                    (
                        qb.is_fragment(),
                        qb.template,
                        qb.inlined_client_count,
                        qb.client_references,
                        qb.inlined_server_count,
                        qb.server_references,
                        qb.is_inlined(),
                    )
                };
                if is_fragment {
                    if cr == 0 && sr == 0 && !inlined {
                        let loc = module(modules, template.source_index)
                            .ast
                            .expr(template.expr)
                            .loc;
                        self.diagnostics.add_warning(
                            Some(template.source_index),
                            loc,
                            "fragment is unused",
                        );
                    }
                    let target = ExprRef::new(template.source_index, template.expr);
                    if icc == cr {
                        // Every client reference was satisfied by inlining:
                        // the fragment value itself disappears from the
                        // client build. Undo only when the server still
                        // references it at runtime.
                        let current = expr_data(modules, target).clone();
                        if matches!(current, ExprData::Template { .. }) {
                            self.rewriter.replace_expr(
                                modules,
                                target,
                                &current,
                                ExprData::Undefined,
                                isc != sr,
                            );
                        }
                    } else if isc == sr {
                        // Referenced on the client, fully inlined on the
                        // server: blank it out for the server build only.
                        self.rewriter.defer_expr(target, ExprData::Undefined);
                    }
                    continue;
                }

                if cr != 0 {
                    client_list.push(q.clone());
                } else if sr != 0 {
                    server_list.push(q.clone());
                } else {
                    let loc = module(modules, template.source_index)
                        .ast
                        .expr(template.expr)
                        .loc;
                    self.diagnostics.add_warning(
                        Some(template.source_index),
                        loc,
                        "query is unused",
                    );
                }
            }
        }

        if self.diagnostics.has_errors() {
            return;
        }

        sort_whitelist(&mut client_list);
        sort_whitelist(&mut server_list);
        let client_entries = whitelist_entries(&client_list);
        let server_entries = whitelist_entries(&server_list);

        // The two allow-lists serialize on their own tasks; the server
        // entry synthesis (which rewrites server calls) stays on this
        // thread. Nothing mutable is shared.
        let (client_json, server_json) = std::thread::scope(|scope| {
            let client = scope.spawn(move || serialize_whitelist(&client_entries));
            let server = scope.spawn(move || serialize_whitelist(&server_entries));
            self.generate_server_file(modules, validators, validators_by_query);
            (
                client.join().expect("client allow-list task panicked"),
                server.join().expect("server allow-list task panicked"),
            )
        });

        self.client_whitelist_file = self.output_whitelist("client-queries.json", client_json);
        self.server_whitelist_file = self.output_whitelist("server-queries.json", server_json);
    }

    fn output_whitelist(&mut self, file_name: &str, contents: Option<String>) -> Option<OutputFile> {
        let contents = contents?;
        let path = Path::new(&self.out_dir)
            .join(file_name)
            .to_string_lossy()
            .into_owned();
        if self.config.write
            && let Err(err) = std::fs::write(&path, &contents)
        {
            self.diagnostics.add_error(
                None,
                sqljoy_ast::Loc::NONE,
                format!("write query whitelist {file_name}: {err}"),
            );
        }
        Some(OutputFile {
            path,
            contents: contents.into_bytes(),
        })
    }

    /// Resolve an expression to the queries it can evaluate to, in
    /// allow-list order. Conditionals and `&&`/`||` contribute both sides.
    fn find_query_for_expr(
        &self,
        modules: &[Module],
        all: &AllQueries,
        expr: ExprRef,
    ) -> Vec<QueryRc> {
        let ast = &module(modules, expr.source).ast;
        let analyzer = self
            .analyzers
            .get(expr.source as usize)
            .and_then(|a| a.as_ref());
        let (r, prop) = ref_for_identifier_or_member(analyzer, ast, expr.expr);

        if !r.is_valid() {
            let (left, right) = match &ast.expr(expr.expr).data {
                ExprData::If { yes, no, .. } => (*yes, *no),
                ExprData::Binary {
                    op: sqljoy_ast::BinOp::LogicalOr | sqljoy_ast::BinOp::LogicalAnd,
                    left,
                    right,
                } => (*left, *right),
                _ => return Vec::new(),
            };
            let q1 = self.find_query_for_expr(modules, all, ExprRef::new(expr.source, left));
            let q2 = self.find_query_for_expr(modules, all, ExprRef::new(expr.source, right));
            return merge_candidates(q1, q2);
        }

        let canonical = find_original_ref(&self.analyzers, modules, r, prop);
        let mut result = all.get(&canonical).cloned().unwrap_or_default();
        sort_whitelist(&mut result);
        result
    }

    fn add_query_usage_locations(&mut self, modules: &[Module], q: &QueryRc) {
        let calls: Vec<QueryUsage> = q.borrow().calls.clone();
        for usage in calls {
            {
                let mut qb = q.borrow_mut();
                if usage.is_server {
                    qb.server_references += 1;
                } else {
                    qb.client_references += 1;
                }
            }
            let m = module(modules, usage.call.source);
            let target_loc = match &m.ast.expr(usage.call.expr).data {
                ExprData::Call { target, .. } => m.ast.expr(*target).loc,
                _ => m.ast.expr(usage.call.expr).loc,
            };
            let line = m.source.line_of(target_loc);
            let file = m.source.pretty_path.clone();
            let mut qb = q.borrow_mut();
            if !qb
                .usages
                .iter()
                .any(|u| u.file == file && u.line == line)
            {
                qb.usages.push(crate::query::SourceLocation { line, file });
            }
        }
    }

    /// Compile a query: resolve each `${expr}` to fragments, inline single
    /// candidates, and accumulate the content hash. Memoized on a
    /// non-empty hash; re-running is a no-op.
    ///
    /// The hash covers the literal parts, server-variable names, and the
    /// digests of non-inlined fragments, in slot order. Parameter names
    /// and variable expressions deliberately do not contribute.
    fn compile_query(&mut self, modules: &mut [Module], all: &AllQueries, q: &QueryRc) -> bool {
        if !q.borrow().hash.is_empty() {
            return true;
        }
        self.add_query_usage_locations(modules, q);

        let (template_src, template_expr) = {
            let qb = q.borrow();
            (qb.template.source_index, qb.template.expr)
        };
        let template_loc = module(modules, template_src).ast.expr(template_expr).loc;

        let mut hasher = Sha256::new();
        let mut i = 0usize;
        'slots: loop {
            if i >= q.borrow().vars.len() {
                break;
            }
            let ty = q.borrow().vars[i].ty;
            match ty {
                QueryVarType::Var => {
                    // The interpolation could name fragments; trace it.
                    let expr = q.borrow().vars[i].expr;
                    let found = match expr {
                        Some(e) => self.find_query_for_expr(modules, all, e),
                        None => Vec::new(),
                    };
                    let inline = found.len() == 1;
                    if !found.is_empty() {
                        let mut qb = q.borrow_mut();
                        qb.vars[i].ty = QueryVarType::Fragment;
                        qb.vars[i].fragments = found.clone();
                    }
                    for fragment in &found {
                        if Rc::ptr_eq(fragment, q) {
                            self.diagnostics.add_error(
                                Some(template_src),
                                template_loc,
                                "fragment cannot include itself",
                            );
                            return false;
                        }
                        if !fragment.borrow().is_fragment() {
                            self.diagnostics.add_error(
                                Some(template_src),
                                template_loc,
                                ERR_QUERY_AS_QUERY_PART,
                            );
                            return false;
                        }
                        let (sr, cr) = {
                            let qb = q.borrow();
                            (qb.server_references, qb.client_references)
                        };
                        {
                            let mut fb = fragment.borrow_mut();
                            fb.server_references += sr;
                            fb.client_references += cr;
                            if inline {
                                fb.inlined_server_count += sr;
                                fb.inlined_client_count += cr;
                            }
                        }
                        if inline {
                            let fb = fragment.borrow();
                            q.borrow_mut().insert(i, &fb);
                            // The slot now holds the fragment's own parts
                            // and vars; reprocess from the same index.
                            continue 'slots;
                        }
                        if !self.compile_query(modules, all, fragment) {
                            return false;
                        }
                        hasher.update(fragment.borrow().bin_hash);
                    }
                }
                QueryVarType::Server => {
                    q.borrow_mut().is_public = false;
                    hasher.update(q.borrow().vars[i].name.as_bytes());
                }
                QueryVarType::Param | QueryVarType::Fragment => {}
            }
            hasher.update(q.borrow().parts[i].as_bytes());
            i += 1;
        }
        {
            let qb = q.borrow();
            hasher.update(qb.parts[qb.parts.len() - 1].as_bytes());
        }

        let digest: [u8; 32] = hasher.finalize().into();
        let mut qb = q.borrow_mut();
        qb.bin_hash = digest;
        qb.hash = crate::emit::base64url_30(&digest);
        true
    }

    /// Make an expression available in `target_module`'s arena, deep
    /// copying when it was written in a different module (fragments
    /// inlined across files).
    fn expr_in_module(
        &mut self,
        modules: &mut [Module],
        expr: ExprRef,
        target_module: u32,
    ) -> ExprId {
        if expr.source == target_module {
            return expr.expr;
        }
        let (from, to) = two_modules_mut(modules, expr.source, target_module);
        clone_expr(&from.ast, &mut to.ast, expr.expr)
    }

    /// Replace a compiled query's template with the runtime object literal
    /// (wrapped in `sql.merge(...)` when fragment slots remain), and record
    /// the direction-dependent elisions.
    fn replace_query(&mut self, modules: &mut [Module], q: &QueryRc) {
        if !q.borrow().query_text.is_empty() {
            return; // already replaced
        }

        let (src, template_expr, is_fragment, hash, cr, sr) = {
            let qb = q.borrow();
            (
                qb.template.source_index,
                qb.template.expr,
                qb.template.is_fragment,
                qb.hash.clone(),
                qb.client_references,
                qb.server_references,
            )
        };
        let loc = module(modules, src).ast.expr(template_expr).loc;

        q.borrow_mut().is_public = true;

        let vars: Vec<QueryVar> = q.borrow().vars.clone();
        let parts: Vec<String> = q.borrow().parts.clone();

        let mut text: Vec<String> = Vec::with_capacity(parts.len() * 2 - 1);
        let mut param_props: Vec<(String, ExprId)> = Vec::new();
        let mut fragment_exprs: Vec<ExprId> = Vec::new();
        let mut query_fragments: Vec<Vec<QueryRc>> = Vec::new();
        let mut next_param = 1usize;

        for (j, v) in vars.iter().enumerate() {
            text.push(parts[j].clone());
            match v.ty {
                QueryVarType::Var => {
                    text.push(format!("${next_param}"));
                    let value = v.expr.expect("interpolated var carries its expression");
                    let value = self.expr_in_module(modules, value, src);
                    let name = if v.name.is_empty() {
                        format!("${next_param}")
                    } else {
                        v.name.clone()
                    };
                    param_props.push((name, value));
                    next_param += 1;
                }
                QueryVarType::Param => {
                    // Late-bound: the params object carries a sentinel the
                    // runtime substitutes at executeQuery time.
                    text.push(format!("${next_param}"));
                    let value = module_mut(modules, src)
                        .ast
                        .alloc_expr(loc, ExprData::String(LATE_BOUND_PARAM.to_string()));
                    param_props.push((v.name.clone(), value));
                    next_param += 1;
                }
                QueryVarType::Fragment => {
                    let value = v.expr.expect("fragment var carries its expression");
                    let value = self.expr_in_module(modules, value, src);
                    fragment_exprs.push(value);
                    query_fragments.push(v.fragments.clone());
                    if v.name.is_empty() {
                        text.push(format!("${{fragment{}}}", fragment_exprs.len()));
                    } else {
                        text.push(format!("${{{}}}", v.name));
                    }
                }
                QueryVarType::Server => {
                    q.borrow_mut().is_public = false;
                    text.push(format!("${{{}}}", v.name));
                }
            }
        }
        if parts.len() > vars.len() {
            text.push(parts[parts.len() - 1].clone());
        }
        let query_text = text.concat();
        q.borrow_mut().query_text = query_text.clone();

        // The replacement object literal: query, text (debug or
        // server-visible), params.
        let ast = &mut module_mut(modules, src).ast;
        let hash_value = ast.alloc_expr(loc, ExprData::String(hash));
        let mut props = vec![string_prop(ast, loc, "query", hash_value)];
        if self.config.debug || sr != 0 {
            let text_value = ast.alloc_expr(loc, ExprData::String(query_text));
            props.push(string_prop(ast, loc, "text", text_value));
        }
        let mut params_props = Vec::with_capacity(param_props.len());
        for (name, value) in param_props {
            params_props.push(string_prop(ast, loc, &name, value));
        }
        let params_value = ast.alloc_expr(
            loc,
            ExprData::Object {
                properties: params_props,
                is_single_line: true,
            },
        );
        props.push(string_prop(ast, loc, "params", params_value));

        let query_obj = ExprData::Object {
            properties: props,
            is_single_line: true,
        };

        q.borrow_mut().fragments = query_fragments.clone();

        let target = ExprRef::new(src, template_expr);
        let old_template = module(modules, src).ast.expr(template_expr).data.clone();
        let new_data = if fragment_exprs.is_empty() {
            query_obj
        } else {
            // Wrap as sql.merge(queryObj, frag1, frag2, ...). For a
            // fragment template the sql root sits behind the `.p` tag.
            let ExprData::Template { tag: Some(tag), .. } = &old_template else {
                panic!("compiled query lost its template");
            };
            let sql_root = if is_fragment {
                match &module(modules, src).ast.expr(*tag).data {
                    ExprData::Dot { target, .. } => *target,
                    _ => panic!("fragment template tag is not sql.p"),
                }
            } else {
                *tag
            };
            let ast = &mut module_mut(modules, src).ast;
            let query_obj_id = ast.alloc_expr(loc, query_obj);
            let merge_target = ast.alloc_expr(
                loc,
                ExprData::Dot {
                    target: sql_root,
                    name: "merge".to_string(),
                },
            );
            let mut args = vec![query_obj_id];
            args.extend(fragment_exprs);
            ExprData::Call {
                target: merge_target,
                args,
            }
        };

        self.rewriter
            .replace_expr(modules, target, &old_template, new_data.clone(), false);

        if cr == 0 {
            if sr != 0 {
                // Server-only: undefined in the client build, restored for
                // the server build.
                self.rewriter
                    .replace_expr(modules, target, &new_data, ExprData::Undefined, true);
            } else if !q.borrow().is_inlined() {
                let message = if is_fragment {
                    "fragment is unused"
                } else {
                    "query is unused"
                };
                self.diagnostics.add_warning(Some(src), loc, message);
            }
        } else if sr == 0 {
            // Client-only: stays as-is now, blanked for the server build.
            self.rewriter.defer_expr(target, ExprData::Undefined);
        }

        // Fragment groups: a group of uniformly private fragments makes
        // the query private; one public sibling offsets the group.
        for group in &query_fragments {
            let mut private = !group.is_empty();
            for fragment in group {
                if fragment.borrow().is_public {
                    private = false;
                }
                self.replace_query(modules, fragment);
            }
            if private {
                q.borrow_mut().is_public = false;
            }
        }
    }

    /// Resolve a function-valued expression (server-call target or
    /// validator) to its import: either a named import's `(module, alias)`
    /// or a local exported server function addressed by relative path.
    fn find_import_for_function_identifier(
        &mut self,
        modules: &[Module],
        source_index: u32,
        f_ident: ExprId,
        calls: &mut BTreeMap<String, Vec<ImportedName>>,
    ) -> Option<(Ref, ImportedName)> {
        let m = module(modules, source_index);
        let ast = &m.ast;
        let (r, _) = ref_for_identifier_or_member(None, ast, f_ident);
        let loc = ast.expr(f_ident).loc;
        if !r.is_valid() {
            self.diagnostics.add_error(
                Some(source_index),
                loc,
                "server call must refer to a top level exportable function",
            );
            return None;
        }
        let name = ast.symbol_name(r).unwrap_or("<unknown>").to_string();

        if let Some(import) = ast.named_imports.get(&r) {
            let module_path = ast.import_records[import.import_record_index as usize]
                .path
                .clone();
            let imp = new_import(&module_path, &import.alias);
            calls.entry(module_path).or_default().push(imp.clone());
            return Some((r, imp));
        }

        let local = self
            .analyzers
            .get(source_index as usize)
            .and_then(|a| a.as_ref())
            .and_then(|a| a.server_functions.get(&r).copied());
        let Some(f) = local else {
            self.diagnostics.add_error(
                Some(source_index),
                loc,
                format!("server call {name} must refer to a top level exportable function"),
            );
            return None;
        };
        if !f.kind.is_export() {
            self.diagnostics.add_error(
                Some(source_index),
                loc,
                format!("function {name} must be exported"),
            );
        }

        let key_path = m.source.key_path.clone();
        let import_path = match relative_path(&self.base_dir, &key_path) {
            Some(rel) => format!("./{rel}"),
            None => key_path,
        };
        let imp = new_import(&import_path, &name);
        calls.entry(import_path).or_default().push(imp.clone());
        Some((r, imp))
    }

    /// Rewrite every server call to `x.serverCall("<hash>", ...)`, shrink
    /// the callee's use estimate (removing its part when it hits zero),
    /// and synthesize the server entry module.
    fn generate_server_file(
        &mut self,
        modules: &mut [Module],
        validators: BTreeMap<String, Vec<ImportedName>>,
        validators_by_query: BTreeMap<String, Vec<String>>,
    ) {
        let mut calls: BTreeMap<String, Vec<ImportedName>> = BTreeMap::new();

        for index in 0..self.analyzers.len() {
            let server_calls: Vec<ServerCall> = match &self.analyzers[index] {
                Some(a) => a.server_calls.clone(),
                None => continue,
            };
            let source_index = index as u32;
            for sc in server_calls {
                let (call_target, call_args) = {
                    let ast = &module(modules, source_index).ast;
                    match &ast.expr(sc.call).data {
                        ExprData::Call { target, args } => (*target, args.clone()),
                        _ => continue,
                    }
                };
                let Some((sym_ref, imp)) = self.find_import_for_function_identifier(
                    modules,
                    source_index,
                    call_target,
                    &mut calls,
                ) else {
                    continue;
                };

                // foo(x.beginTx(), ...args) -> x.serverCall("<hash>", ...args)
                let fs_root = {
                    let ast = &module(modules, source_index).ast;
                    match &ast.expr(sc.fs_instance).data {
                        ExprData::Dot { target, .. } => *target,
                        _ => continue,
                    }
                };
                let old_call = module(modules, source_index)
                    .ast
                    .expr(sc.call)
                    .data
                    .clone();
                let loc = module(modules, source_index).ast.expr(sc.call).loc;
                let new_call = {
                    let ast = &mut module_mut(modules, source_index).ast;
                    let new_target = ast.alloc_expr(
                        loc,
                        ExprData::Dot {
                            target: fs_root,
                            name: SERVER_CALL_METHOD.to_string(),
                        },
                    );
                    let hash_arg = ast.alloc_expr(loc, ExprData::String(imp.hash.clone()));
                    let mut args = vec![hash_arg];
                    args.extend(call_args[1..].iter().copied());
                    ExprData::Call {
                        target: new_target,
                        args,
                    }
                };
                self.rewriter.replace_expr(
                    modules,
                    ExprRef::new(source_index, sc.call),
                    &old_call,
                    new_call,
                    true,
                );

                // The call site no longer references the function symbol;
                // at zero uses the function's part is dropped from the
                // client bundle (and restored for the server build).
                if sym_ref.source != source_index {
                    continue;
                }
                let hit_zero = {
                    let symbol = &mut module_mut(modules, source_index).ast.symbols
                        [sym_ref.inner as usize];
                    if symbol.use_count_estimate == 0 {
                        false
                    } else {
                        symbol.use_count_estimate -= 1;
                        symbol.use_count_estimate == 0
                    }
                };
                if hit_zero {
                    let (r, prop) = {
                        let ast = &module(modules, source_index).ast;
                        ref_for_identifier_or_member(None, ast, call_target)
                    };
                    let canonical = find_original_ref(&self.analyzers, modules, r, prop);
                    if canonical.is_valid()
                        && let Some(owner) = self
                            .analyzers
                            .get(canonical.source as usize)
                            .and_then(|a| a.as_ref())
                        && let Some(f) = owner.server_functions.get(&canonical).copied()
                    {
                        self.rewriter.remove_part(
                            modules,
                            PartRef {
                                source: canonical.source,
                                part: f.part,
                            },
                            true,
                        );
                    }
                }
            }
        }

        self.server_file = synthesize_server_entry(&calls, &validators, &validators_by_query);
    }
}
