//! Per-module analysis pass.
//!
//! One analyzer per module, run concurrently. Each visits its module's AST
//! and records the raw material the global pass works from: tagged SQL
//! templates, `executeQuery` call sites, server calls, server-function
//! declarations, and the export/alias bridges the resolver follows. The
//! only cross-module reads are parse-time data (named imports/exports,
//! import records), which is immutable during a build.

mod resolve;


pub use resolve::{find_original_ref, ref_for_identifier_or_member};

use indexmap::IndexMap;
use sqljoy_ast::{
    Ast, BinOp, BindingData, Decl, ExprData, ExprId, INLINE_REF_BASE, Module, PartId, Ref,
    StmtData, StmtId, Visit, Visitor, walk_module,
};

use crate::diagnostics::Diagnostics;

const SQL_TEMPLATE_TAG: &str = "sql";
const TEMPLATE_PART: &str = "p";
const QUERY_EXECUTE_METHOD: &str = "executeQuery";
const BEGIN_TRANSACTION_METHOD: &str = "beginTx";

/// A discovered tagged SQL template, attached to its declaring ref.
#[derive(Debug, Clone, Copy)]
pub struct QueryTemplate {
    pub query_ref: Ref,
    /// Slot of the template expression in its module.
    pub expr: ExprId,
    pub source_index: u32,
    pub is_fragment: bool,
}

/// A possible `x.executeQuery(...)` call. Whether it names a real query is
/// only known after every module has been analyzed.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecution {
    pub call: ExprId,
    pub is_server: bool,
}

/// A call whose first argument is `y.beginTx()`.
#[derive(Debug, Clone, Copy)]
pub struct ServerCall {
    /// The call expression slot.
    pub call: ExprId,
    /// The `y.beginTx` member expression inside the first argument.
    pub fs_instance: ExprId,
}

/// How a server function appears in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalFunctionKind {
    /// `function f(ctx, ...) {}`
    Declaration { is_export: bool },
    /// `const f = (ctx, ...) => {}`
    LocalArrow { is_export: bool },
    /// `const f = function(ctx, ...) {}`
    LocalExpr { is_export: bool },
}

impl LocalFunctionKind {
    pub fn is_export(self) -> bool {
        match self {
            LocalFunctionKind::Declaration { is_export }
            | LocalFunctionKind::LocalArrow { is_export }
            | LocalFunctionKind::LocalExpr { is_export } => is_export,
        }
    }
}

/// A server-function candidate: a top-level function whose first parameter
/// binds an identifier (the `ctx`).
#[derive(Debug, Clone, Copy)]
pub struct LocalFunction {
    pub part: PartId,
    pub stmt: StmtId,
    pub kind: LocalFunctionKind,
}

/// Everything one analyzer learned about its module.
#[derive(Debug)]
pub struct ModuleAnalyzer {
    pub source_index: u32,
    /// Export ref -> the ref the exported value traces back to.
    pub exports: IndexMap<Ref, Ref>,
    /// `export * from M`: namespace ref -> source index of M.
    pub exported_namespaces: IndexMap<Ref, u32>,
    /// Simple `a = b` identifier aliases.
    pub aliases: IndexMap<Ref, Ref>,
    /// Synthesized refs for templates inlined into call arguments.
    pub inline_templates: IndexMap<ExprId, Ref>,
    pub server_functions: IndexMap<Ref, LocalFunction>,
    pub server_functions_by_ctx_var: IndexMap<Ref, LocalFunction>,
    pub queries: Vec<QueryTemplate>,
    pub query_executions: Vec<QueryExecution>,
    pub server_calls: Vec<ServerCall>,
    pub diagnostics: Diagnostics,
}

impl ModuleAnalyzer {
    fn new(source_index: u32) -> Self {
        Self {
            source_index,
            exports: IndexMap::new(),
            exported_namespaces: IndexMap::new(),
            aliases: IndexMap::new(),
            inline_templates: IndexMap::new(),
            server_functions: IndexMap::new(),
            server_functions_by_ctx_var: IndexMap::new(),
            queries: Vec::new(),
            query_executions: Vec::new(),
            server_calls: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Run the analysis pass over one module. `modules` is the whole build;
/// only parse-time data of other modules is read.
pub fn analyze_module(modules: &[Module], source_index: u32) -> ModuleAnalyzer {
    let module = modules
        .iter()
        .find(|m| m.source.index == source_index)
        .expect("analyze_module called with unknown source index");
    let mut pass = AnalyzerPass {
        modules,
        module,
        analyzer: ModuleAnalyzer::new(source_index),
    };
    walk_module(&mut pass, &module.ast);
    pass.analyzer
}

struct AnalyzerPass<'a> {
    modules: &'a [Module],
    module: &'a Module,
    analyzer: ModuleAnalyzer,
}

impl Visitor for AnalyzerPass<'_> {
    fn visit_stmt(&mut self, ast: &Ast, stmt: StmtId, part: Option<PartId>) -> Visit {
        match &ast.stmt(stmt).data {
            StmtData::Function { func, is_export } => {
                if let Some(part) = part {
                    self.record_server_function(ast, part, stmt, func, *is_export);
                }
            }
            StmtData::ExportFrom {
                items,
                import_record_index,
                ..
            } => {
                // Bridge each exported ref to the ref it names in the
                // source module.
                let record = &ast.import_records[*import_record_index as usize];
                if let Some(target_index) = record.source_index {
                    for item in items {
                        let target_ast = &self.find_module(target_index).ast;
                        if let Some(&target) = target_ast.named_exports.get(&item.original_name)
                        {
                            self.analyzer.exports.insert(item.name, target);
                        }
                    }
                }
            }
            StmtData::ExportStar {
                namespace_ref,
                import_record_index,
                ..
            } => {
                let record = &ast.import_records[*import_record_index as usize];
                if let Some(target_index) = record.source_index {
                    self.analyzer
                        .exported_namespaces
                        .insert(*namespace_ref, target_index);
                }
            }
            _ => {}
        }
        Visit::Continue
    }

    fn visit_expr(
        &mut self,
        ast: &Ast,
        stmt: StmtId,
        expr: ExprId,
        decl: Option<&Decl>,
        parents: &[ExprId],
        part: Option<PartId>,
    ) -> Visit {
        match &ast.expr(expr).data {
            ExprData::Call { .. } => {
                self.record_call(ast, expr);
            }
            ExprData::Arrow { args, .. } => {
                if let (Some(part), Some(decl)) = (part, decl)
                    && let StmtData::Local { is_export, .. } = &ast.stmt(stmt).data
                {
                    self.record_server_function_var(
                        part,
                        stmt,
                        *is_export,
                        decl,
                        args,
                        LocalFunctionKind::LocalArrow {
                            is_export: *is_export,
                        },
                    );
                }
            }
            ExprData::Function { func } => {
                if let (Some(part), Some(decl)) = (part, decl)
                    && let StmtData::Local { is_export, .. } = &ast.stmt(stmt).data
                {
                    self.record_server_function_var(
                        part,
                        stmt,
                        *is_export,
                        decl,
                        &func.args,
                        LocalFunctionKind::LocalExpr {
                            is_export: *is_export,
                        },
                    );
                }
            }
            ExprData::Template { .. } => {
                self.record_sql_template(ast, stmt, decl, parents, expr);
            }
            ExprData::Identifier(r) | ExprData::ImportIdentifier(r) => {
                let r = *r;
                if part.is_some() && stmt_is_export(&ast.stmt(stmt).data) {
                    self.record_export(ast, stmt, decl, parents, r);
                } else if let Some(decl) = decl
                    && (parents.is_empty() || is_target_of_index_or_dot(ast, parents, expr))
                {
                    // An aliasing assignment from identifier r to the
                    // declarator binding, possibly through a property
                    // access rooted at r.
                    self.record_alias(decl, r);
                }
            }
            ExprData::Binary {
                op: BinOp::Assign,
                left,
                right,
            } => {
                let (left_ref, _) =
                    ref_for_identifier_or_member(Some(&self.analyzer), ast, *left);
                let (right_ref, _) =
                    ref_for_identifier_or_member(Some(&self.analyzer), ast, *right);
                if left_ref.is_valid() && right_ref.is_valid() {
                    self.analyzer.aliases.insert(left_ref, right_ref);
                }
            }
            _ => {}
        }
        Visit::Continue
    }
}

impl<'a> AnalyzerPass<'a> {
    fn find_module(&self, source_index: u32) -> &'a Module {
        self.modules
            .iter()
            .find(|m| m.source.index == source_index)
            .expect("import record resolves outside the build")
    }

    fn record_server_function(
        &mut self,
        _ast: &Ast,
        part: PartId,
        stmt: StmtId,
        func: &sqljoy_ast::Fn,
        is_export: bool,
    ) {
        // A server function requires a context argument.
        if func.args.is_empty() {
            return;
        }
        let Some(name) = func.name else { return };
        let fun = LocalFunction {
            part,
            stmt,
            kind: LocalFunctionKind::Declaration { is_export },
        };
        self.analyzer.server_functions.insert(name, fun);
        if let BindingData::Identifier(ctx) = &func.args[0].binding.data {
            self.analyzer.server_functions_by_ctx_var.insert(*ctx, fun);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record_server_function_var(
        &mut self,
        part: PartId,
        stmt: StmtId,
        is_export: bool,
        decl: &Decl,
        args: &[sqljoy_ast::Arg],
        kind: LocalFunctionKind,
    ) {
        if !is_export {
            return;
        }
        let BindingData::Identifier(name) = &decl.binding.data else {
            return;
        };
        if args.is_empty() {
            return;
        }
        let fun = LocalFunction { part, stmt, kind };
        if let BindingData::Identifier(ctx) = &args[0].binding.data {
            self.analyzer.server_functions_by_ctx_var.insert(*ctx, fun);
        }
        self.analyzer.server_functions.insert(*name, fun);
    }

    fn record_export(
        &mut self,
        ast: &Ast,
        stmt: StmtId,
        decl: Option<&Decl>,
        parents: &[ExprId],
        identifier: Ref,
    ) {
        let mut is_local = false;
        let exp_ref = match &ast.stmt(stmt).data {
            StmtData::ExportDefault { default_name, .. } => *default_name,
            StmtData::Local { .. } => {
                let Some(decl) = decl else { return };
                let BindingData::Identifier(r) = &decl.binding.data else {
                    return;
                };
                is_local = true;
                *r
            }
            _ => return,
        };

        if is_local {
            // Only map the identifier if it traces back to the declaration
            // through an unbroken chain of supported expressions: object
            // literals, ternaries, and `&&`/`||`.
            for &parent in parents.iter().rev() {
                match &ast.expr(parent).data {
                    ExprData::Binary {
                        op: BinOp::LogicalAnd | BinOp::LogicalOr,
                        ..
                    } => continue,
                    ExprData::Object { .. } | ExprData::If { .. } => continue,
                    _ => return,
                }
            }
        }

        self.analyzer.exports.insert(exp_ref, identifier);
    }

    fn record_alias(&mut self, decl: &Decl, r: Ref) {
        if let BindingData::Identifier(target) = &decl.binding.data {
            self.analyzer.aliases.insert(*target, r);
        }
    }

    fn record_sql_template(
        &mut self,
        ast: &Ast,
        stmt: StmtId,
        decl: Option<&Decl>,
        parents: &[ExprId],
        expr: ExprId,
    ) -> bool {
        // The template must end up attached to a named ref: a declarator, an
        // assignment target, or a synthesized ref when it sits directly in a
        // call's first argument. Supported intermediate parents are object
        // literals, ternaries, and `&&`/`||`; anything else means the
        // template is not statically traceable and is ignored as dead code.
        let ExprData::Template { tag, .. } = &ast.expr(expr).data else {
            return false;
        };
        let Some(tag) = *tag else { return false };

        let mut is_fragment = false;
        let tag_ref = match &ast.expr(tag).data {
            ExprData::Identifier(r) | ExprData::ImportIdentifier(r) => *r,
            ExprData::Dot { target, name } if name == TEMPLATE_PART => {
                match &ast.expr(*target).data {
                    ExprData::Identifier(r) => {
                        is_fragment = true;
                        *r
                    }
                    _ => return false,
                }
            }
            _ => return false,
        };

        if ast.symbol_name(tag_ref) != Some(SQL_TEMPLATE_TAG) {
            return false;
        }

        enum Attach {
            FromStmt,
            AssignTarget(ExprId),
        }

        let mut attach = Attach::FromStmt;
        let innermost = parents.len().wrapping_sub(1);
        for (i, &parent) in parents.iter().enumerate().rev() {
            match &ast.expr(parent).data {
                ExprData::Binary {
                    op: BinOp::Assign,
                    left,
                    ..
                } => {
                    attach = Attach::AssignTarget(*left);
                    break;
                }
                ExprData::Binary {
                    op: BinOp::LogicalAnd | BinOp::LogicalOr,
                    ..
                } => continue,
                ExprData::Object { .. } | ExprData::If { .. } => continue,
                ExprData::Call { args, .. } if i == innermost => {
                    if args.first() == Some(&expr) {
                        // Inlined directly into a call's first argument:
                        // invent a ref for it.
                        let inner = INLINE_REF_BASE + self.analyzer.inline_templates.len() as u32;
                        let r = Ref::new(self.analyzer.source_index, inner);
                        self.analyzer.inline_templates.insert(expr, r);
                        self.analyzer.queries.push(QueryTemplate {
                            query_ref: r,
                            expr,
                            source_index: self.analyzer.source_index,
                            is_fragment,
                        });
                        return true;
                    }
                    return false;
                }
                _ => return false,
            }
        }

        let query_ref = match attach {
            Attach::FromStmt => match &ast.stmt(stmt).data {
                StmtData::Local { .. } => {
                    let Some(decl) = decl else { return false };
                    match &decl.binding.data {
                        BindingData::Identifier(r) => *r,
                        _ => return false,
                    }
                }
                _ => return false,
            },
            Attach::AssignTarget(left) => {
                ref_for_identifier_or_member(Some(&self.analyzer), ast, left).0
            }
        };

        if !query_ref.is_valid() {
            return false;
        }

        self.analyzer.queries.push(QueryTemplate {
            query_ref,
            expr,
            source_index: self.analyzer.source_index,
            is_fragment,
        });
        true
    }

    fn record_call(&mut self, ast: &Ast, call: ExprId) -> bool {
        let ExprData::Call { target, args } = &ast.expr(call).data else {
            return false;
        };
        // Both kinds of calls require at least one argument.
        if args.is_empty() {
            return false;
        }
        let target = *target;

        match &ast.expr(target).data {
            ExprData::Identifier(r) | ExprData::ImportIdentifier(r) => {
                if ast.symbol_name(*r) == Some(QUERY_EXECUTE_METHOD) {
                    let loc = ast.expr(target).loc;
                    self.analyzer.diagnostics.add_error(
                        Some(self.analyzer.source_index),
                        loc,
                        "executeQuery must be invoked as a method",
                    );
                    return false;
                }
                self.record_server_call(ast, call)
            }
            ExprData::Dot {
                target: lhs, name, ..
            } => {
                if name == QUERY_EXECUTE_METHOD {
                    // A possible query execution; verified after every file
                    // has been visited. It is a server execution iff the
                    // receiver is the ctx parameter of a server function.
                    let is_server = match &ast.expr(*lhs).data {
                        ExprData::Identifier(r) => self
                            .analyzer
                            .server_functions_by_ctx_var
                            .contains_key(r),
                        _ => false,
                    };
                    self.analyzer
                        .query_executions
                        .push(QueryExecution { call, is_server });
                    true
                } else {
                    self.record_server_call(ast, call)
                }
            }
            _ => false,
        }
    }

    fn record_server_call(&mut self, ast: &Ast, call: ExprId) -> bool {
        let ExprData::Call { args, .. } = &ast.expr(call).data else {
            return false;
        };
        let Some(&first_arg) = args.first() else {
            return false;
        };
        let ExprData::Call {
            target: ctx_target,
            args: ctx_args,
        } = &ast.expr(first_arg).data
        else {
            return false;
        };
        // beginTx doesn't currently accept arguments.
        if !ctx_args.is_empty() {
            return false;
        }
        let ExprData::Dot { name, .. } = &ast.expr(*ctx_target).data else {
            return false;
        };
        if name != BEGIN_TRANSACTION_METHOD {
            return false;
        }
        self.analyzer.server_calls.push(ServerCall {
            call,
            fs_instance: *ctx_target,
        });
        true
    }
}

fn stmt_is_export(stmt: &StmtData) -> bool {
    match stmt {
        StmtData::Local { is_export, .. } => *is_export,
        StmtData::ExportDefault { .. }
        | StmtData::ExportClause { .. }
        | StmtData::ExportEquals { .. }
        | StmtData::ExportFrom { .. }
        | StmtData::ExportStar { .. }
        | StmtData::LazyExport { .. } => true,
        _ => false,
    }
}

fn is_target_of_index_or_dot(ast: &Ast, parents: &[ExprId], identifier: ExprId) -> bool {
    if parents.len() != 1 {
        return false;
    }
    match &ast.expr(parents[0]).data {
        ExprData::Dot { target, .. } => *target == identifier,
        ExprData::Index { target, .. } => *target == identifier,
        _ => false,
    }
}
