//! Shared helpers for compiler tests: module-graph construction on top of
//! the AST builder, and a small expression renderer so assertions read
//! like the JavaScript the bundler would print.

use sqljoy_ast::{Ast, BinOp, ExprData, ExprId, Module, ModuleBuilder, Ref, UnOp};

use crate::compiler::{Compiler, CompilerConfig};

/// A module under construction with the ambient `sql` and `fs` bindings
/// every fixture needs.
pub struct TestModule {
    pub b: ModuleBuilder,
    pub sql: Ref,
    pub fs: Ref,
}

impl TestModule {
    pub fn new(index: u32, path: &str) -> Self {
        let mut b = ModuleBuilder::new(index, path);
        let sql = b.symbol("sql");
        let fs = b.symbol("fs");
        Self { b, sql, fs }
    }

    /// `sql`head${part}tail...``
    pub fn sql_template(&mut self, head: &str, parts: Vec<(ExprId, &str)>) -> ExprId {
        let tag = self.b.ident(self.sql);
        self.b.template(Some(tag), head, parts)
    }

    /// `sql.p`head${part}tail...``
    pub fn sql_fragment(&mut self, head: &str, parts: Vec<(ExprId, &str)>) -> ExprId {
        let root = self.b.ident(self.sql);
        let tag = self.b.dot(root, "p");
        self.b.template(Some(tag), head, parts)
    }

    /// `fs.executeQuery(args...)` as a top-level statement.
    pub fn execute_query(&mut self, args: Vec<ExprId>) -> ExprId {
        let fs = self.b.ident(self.fs);
        let target = self.b.dot(fs, "executeQuery");
        let call = self.b.call(target, args);
        self.b.expr_stmt(call);
        call
    }

    pub fn finish(self) -> Module {
        self.b.finish()
    }
}

/// Run the client half of the pass over a module graph.
pub fn compile_client(modules: &mut Vec<Module>) -> Compiler {
    let mut compiler = Compiler::new(CompilerConfig::default());
    compiler.compile_client("dist", "/", modules);
    compiler
}

/// Render an expression roughly the way the bundler's printer would, for
/// substring assertions. Unhandled shapes render as `<expr>`.
pub fn render_expr(ast: &Ast, expr: ExprId) -> String {
    match &ast.expr(expr).data {
        ExprData::Identifier(r) | ExprData::ImportIdentifier(r) => {
            ast.symbol_name(*r).unwrap_or("<ref>").to_string()
        }
        ExprData::Dot { target, name } => format!("{}.{}", render_expr(ast, *target), name),
        ExprData::Index { target, index } => format!(
            "{}[{}]",
            render_expr(ast, *target),
            render_expr(ast, *index)
        ),
        ExprData::Call { target, args } => {
            let args: Vec<String> = args.iter().map(|&a| render_expr(ast, a)).collect();
            format!("{}({})", render_expr(ast, *target), args.join(", "))
        }
        ExprData::Object { properties, .. } => {
            let props: Vec<String> = properties
                .iter()
                .map(|p| {
                    let key = match &ast.expr(p.key).data {
                        ExprData::String(s) => s.clone(),
                        _ => render_expr(ast, p.key),
                    };
                    match p.value {
                        Some(value) => format!("{}: {}", key, render_expr(ast, value)),
                        None => key,
                    }
                })
                .collect();
            format!("{{{}}}", props.join(", "))
        }
        ExprData::String(s) => format!("\"{s}\""),
        ExprData::Number(n) => {
            if n.fract() == 0.0 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        ExprData::Boolean(b) => b.to_string(),
        ExprData::Undefined => "void 0".to_string(),
        ExprData::Null => "null".to_string(),
        ExprData::Binary { op, left, right } => {
            let op = match op {
                BinOp::LogicalOr => "||",
                BinOp::LogicalAnd => "&&",
                BinOp::Assign => "=",
                BinOp::Add => "+",
                BinOp::Mul => "*",
                _ => "?op?",
            };
            format!(
                "{} {} {}",
                render_expr(ast, *left),
                op,
                render_expr(ast, *right)
            )
        }
        ExprData::If { test, yes, no } => format!(
            "{} ? {} : {}",
            render_expr(ast, *test),
            render_expr(ast, *yes),
            render_expr(ast, *no)
        ),
        ExprData::Unary { op: UnOp::Neg, value } => format!("-{}", render_expr(ast, *value)),
        ExprData::Template { head_raw, .. } => format!("`{head_raw}...`"),
        ExprData::Await { value } => format!("await {}", render_expr(ast, *value)),
        _ => "<expr>".to_string(),
    }
}
