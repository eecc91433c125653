//! Deep-copying expression trees between module arenas.
//!
//! Compiled query objects can embed parameter expressions that were written
//! in a different module (a fragment inlined across files). Slot ids are
//! arena-local, so embedding means copying the subtree into the target
//! arena with every child id remapped.

use crate::ast::Ast;
use crate::expr::{Arg, Binding, BindingData, Class, ExprData, ExprId, Fn, Property, TemplatePart};
use crate::stmt::{
    Case, Catch, Decl, EnumValue, ExportDefaultValue, Finally, StmtData, StmtId,
};

/// Copy the expression subtree rooted at `expr` from `from` into `to`,
/// returning the new root id.
pub fn clone_expr(from: &Ast, to: &mut Ast, expr: ExprId) -> ExprId {
    let node = from.expr(expr);
    let data = clone_expr_data(from, to, &node.data);
    to.alloc_expr(node.loc, data)
}

/// Copy the statement subtree rooted at `stmt` from `from` into `to`.
pub fn clone_stmt(from: &Ast, to: &mut Ast, stmt: StmtId) -> StmtId {
    let node = from.stmt(stmt);
    let data = clone_stmt_data(from, to, &node.data);
    to.alloc_stmt(node.loc, data)
}

fn clone_opt_expr(from: &Ast, to: &mut Ast, expr: Option<ExprId>) -> Option<ExprId> {
    expr.map(|e| clone_expr(from, to, e))
}

fn clone_exprs(from: &Ast, to: &mut Ast, exprs: &[ExprId]) -> Vec<ExprId> {
    exprs.iter().map(|&e| clone_expr(from, to, e)).collect()
}

fn clone_stmts(from: &Ast, to: &mut Ast, stmts: &[StmtId]) -> Vec<StmtId> {
    stmts.iter().map(|&s| clone_stmt(from, to, s)).collect()
}

fn clone_properties(from: &Ast, to: &mut Ast, props: &[Property]) -> Vec<Property> {
    props
        .iter()
        .map(|p| Property {
            key: clone_expr(from, to, p.key),
            value: clone_opt_expr(from, to, p.value),
            initializer: clone_opt_expr(from, to, p.initializer),
        })
        .collect()
}

fn clone_args(from: &Ast, to: &mut Ast, args: &[Arg]) -> Vec<Arg> {
    args.iter()
        .map(|a| Arg {
            binding: clone_binding(&a.binding),
            default: clone_opt_expr(from, to, a.default),
        })
        .collect()
}

fn clone_binding(binding: &Binding) -> Binding {
    Binding {
        loc: binding.loc,
        data: match &binding.data {
            BindingData::Identifier(r) => BindingData::Identifier(*r),
            BindingData::Array(items) => {
                BindingData::Array(items.iter().map(clone_binding).collect())
            }
            BindingData::Missing => BindingData::Missing,
        },
    }
}

fn clone_fn(from: &Ast, to: &mut Ast, func: &Fn) -> Fn {
    Fn {
        name: func.name,
        args: clone_args(from, to, &func.args),
        body: clone_stmts(from, to, &func.body),
        is_async: func.is_async,
    }
}

fn clone_class(from: &Ast, to: &mut Ast, class: &Class) -> Class {
    Class {
        name: class.name,
        properties: clone_properties(from, to, &class.properties),
    }
}

fn clone_expr_data(from: &Ast, to: &mut Ast, data: &ExprData) -> ExprData {
    match data {
        ExprData::Array { items } => ExprData::Array {
            items: clone_exprs(from, to, items),
        },
        ExprData::Unary { op, value } => ExprData::Unary {
            op: *op,
            value: clone_expr(from, to, *value),
        },
        ExprData::Binary { op, left, right } => ExprData::Binary {
            op: *op,
            left: clone_expr(from, to, *left),
            right: clone_expr(from, to, *right),
        },
        ExprData::New { target, args } => ExprData::New {
            target: clone_expr(from, to, *target),
            args: clone_exprs(from, to, args),
        },
        ExprData::Call { target, args } => ExprData::Call {
            target: clone_expr(from, to, *target),
            args: clone_exprs(from, to, args),
        },
        ExprData::Dot { target, name } => ExprData::Dot {
            target: clone_expr(from, to, *target),
            name: name.clone(),
        },
        ExprData::Index { target, index } => ExprData::Index {
            target: clone_expr(from, to, *target),
            index: clone_expr(from, to, *index),
        },
        ExprData::Arrow {
            args,
            body,
            is_async,
        } => ExprData::Arrow {
            args: clone_args(from, to, args),
            body: clone_stmts(from, to, body),
            is_async: *is_async,
        },
        ExprData::Function { func } => ExprData::Function {
            func: clone_fn(from, to, func),
        },
        ExprData::Class { class } => ExprData::Class {
            class: clone_class(from, to, class),
        },
        ExprData::JsxElement {
            tag,
            properties,
            children,
        } => ExprData::JsxElement {
            tag: clone_opt_expr(from, to, *tag),
            properties: clone_properties(from, to, properties),
            children: clone_exprs(from, to, children),
        },
        ExprData::Object {
            properties,
            is_single_line,
        } => ExprData::Object {
            properties: clone_properties(from, to, properties),
            is_single_line: *is_single_line,
        },
        ExprData::Spread { value } => ExprData::Spread {
            value: clone_expr(from, to, *value),
        },
        ExprData::Template {
            tag,
            head_raw,
            parts,
        } => ExprData::Template {
            tag: clone_opt_expr(from, to, *tag),
            head_raw: head_raw.clone(),
            parts: parts
                .iter()
                .map(|p| TemplatePart {
                    value: clone_expr(from, to, p.value),
                    tail_raw: p.tail_raw.clone(),
                })
                .collect(),
        },
        ExprData::Await { value } => ExprData::Await {
            value: clone_expr(from, to, *value),
        },
        ExprData::Yield { value, is_star } => ExprData::Yield {
            value: clone_opt_expr(from, to, *value),
            is_star: *is_star,
        },
        ExprData::If { test, yes, no } => ExprData::If {
            test: clone_expr(from, to, *test),
            yes: clone_expr(from, to, *yes),
            no: clone_expr(from, to, *no),
        },
        ExprData::ImportCall { expr } => ExprData::ImportCall {
            expr: clone_expr(from, to, *expr),
        },
        ExprData::Identifier(r) => ExprData::Identifier(*r),
        ExprData::ImportIdentifier(r) => ExprData::ImportIdentifier(*r),
        ExprData::Boolean(v) => ExprData::Boolean(*v),
        ExprData::Super => ExprData::Super,
        ExprData::Null => ExprData::Null,
        ExprData::Undefined => ExprData::Undefined,
        ExprData::This => ExprData::This,
        ExprData::NewTarget => ExprData::NewTarget,
        ExprData::ImportMeta => ExprData::ImportMeta,
        ExprData::PrivateIdentifier(r) => ExprData::PrivateIdentifier(*r),
        ExprData::Missing => ExprData::Missing,
        ExprData::Number(v) => ExprData::Number(*v),
        ExprData::BigInt(v) => ExprData::BigInt(v.clone()),
        ExprData::String(v) => ExprData::String(v.clone()),
        ExprData::RegExp(v) => ExprData::RegExp(v.clone()),
        ExprData::Require { path } => ExprData::Require { path: path.clone() },
        ExprData::RequireResolve { path } => ExprData::RequireResolve { path: path.clone() },
    }
}

fn clone_stmt_data(from: &Ast, to: &mut Ast, data: &StmtData) -> StmtData {
    match data {
        StmtData::Block { stmts } => StmtData::Block {
            stmts: clone_stmts(from, to, stmts),
        },
        StmtData::LazyExport { value } => StmtData::LazyExport {
            value: clone_expr(from, to, *value),
        },
        StmtData::Expr { value } => StmtData::Expr {
            value: clone_expr(from, to, *value),
        },
        StmtData::Enum { name, values } => StmtData::Enum {
            name: *name,
            values: values
                .iter()
                .map(|v| EnumValue {
                    name: v.name.clone(),
                    value: clone_opt_expr(from, to, v.value),
                })
                .collect(),
        },
        StmtData::Namespace { name, stmts } => StmtData::Namespace {
            name: *name,
            stmts: clone_stmts(from, to, stmts),
        },
        StmtData::Function { func, is_export } => StmtData::Function {
            func: clone_fn(from, to, func),
            is_export: *is_export,
        },
        StmtData::Class { class, is_export } => StmtData::Class {
            class: clone_class(from, to, class),
            is_export: *is_export,
        },
        StmtData::Label { name, stmt } => StmtData::Label {
            name: *name,
            stmt: clone_stmt(from, to, *stmt),
        },
        StmtData::If { test, yes, no } => StmtData::If {
            test: clone_expr(from, to, *test),
            yes: clone_stmt(from, to, *yes),
            no: no.map(|s| clone_stmt(from, to, s)),
        },
        StmtData::For {
            init,
            test,
            update,
            body,
        } => StmtData::For {
            init: init.map(|s| clone_stmt(from, to, s)),
            test: clone_opt_expr(from, to, *test),
            update: clone_opt_expr(from, to, *update),
            body: clone_stmt(from, to, *body),
        },
        StmtData::ForIn { init, value, body } => StmtData::ForIn {
            init: clone_stmt(from, to, *init),
            value: clone_expr(from, to, *value),
            body: clone_stmt(from, to, *body),
        },
        StmtData::ForOf { init, value, body } => StmtData::ForOf {
            init: clone_stmt(from, to, *init),
            value: clone_expr(from, to, *value),
            body: clone_stmt(from, to, *body),
        },
        StmtData::DoWhile { body, test } => StmtData::DoWhile {
            body: clone_stmt(from, to, *body),
            test: clone_expr(from, to, *test),
        },
        StmtData::While { test, body } => StmtData::While {
            test: clone_expr(from, to, *test),
            body: clone_stmt(from, to, *body),
        },
        StmtData::With { value, body } => StmtData::With {
            value: clone_expr(from, to, *value),
            body: clone_stmt(from, to, *body),
        },
        StmtData::Try {
            body,
            catch,
            finally,
        } => StmtData::Try {
            body: clone_stmts(from, to, body),
            catch: catch.as_ref().map(|c| Catch {
                binding: c.binding.as_ref().map(clone_binding),
                body: clone_stmts(from, to, &c.body),
            }),
            finally: finally.as_ref().map(|f| Finally {
                stmts: clone_stmts(from, to, &f.stmts),
            }),
        },
        StmtData::Switch { test, cases } => StmtData::Switch {
            test: clone_expr(from, to, *test),
            cases: cases
                .iter()
                .map(|c| Case {
                    value: clone_opt_expr(from, to, c.value),
                    body: clone_stmts(from, to, &c.body),
                })
                .collect(),
        },
        StmtData::Return { value } => StmtData::Return {
            value: clone_opt_expr(from, to, *value),
        },
        StmtData::Throw { value } => StmtData::Throw {
            value: clone_expr(from, to, *value),
        },
        StmtData::Local {
            kind,
            decls,
            is_export,
        } => StmtData::Local {
            kind: *kind,
            decls: decls
                .iter()
                .map(|d| Decl {
                    binding: clone_binding(&d.binding),
                    value: clone_opt_expr(from, to, d.value),
                })
                .collect(),
            is_export: *is_export,
        },
        StmtData::ExportDefault {
            default_name,
            value,
        } => StmtData::ExportDefault {
            default_name: *default_name,
            value: match value {
                ExportDefaultValue::Stmt(s) => {
                    ExportDefaultValue::Stmt(clone_stmt(from, to, *s))
                }
                ExportDefaultValue::Expr(e) => {
                    ExportDefaultValue::Expr(clone_expr(from, to, *e))
                }
            },
        },
        StmtData::Comment { text } => StmtData::Comment { text: text.clone() },
        StmtData::Debugger => StmtData::Debugger,
        StmtData::Directive { value } => StmtData::Directive {
            value: value.clone(),
        },
        StmtData::Empty => StmtData::Empty,
        StmtData::TypeScript => StmtData::TypeScript,
        StmtData::ExportClause { items } => StmtData::ExportClause {
            items: items.to_vec(),
        },
        StmtData::ExportFrom {
            items,
            namespace_ref,
            import_record_index,
        } => StmtData::ExportFrom {
            items: items.to_vec(),
            namespace_ref: *namespace_ref,
            import_record_index: *import_record_index,
        },
        StmtData::ExportStar {
            namespace_ref,
            alias,
            import_record_index,
        } => StmtData::ExportStar {
            namespace_ref: *namespace_ref,
            alias: alias.clone(),
            import_record_index: *import_record_index,
        },
        StmtData::ExportEquals { value } => StmtData::ExportEquals {
            value: clone_expr(from, to, *value),
        },
        StmtData::Break { label } => StmtData::Break { label: *label },
        StmtData::Continue { label } => StmtData::Continue { label: *label },
        StmtData::Import {
            namespace_ref,
            default_name,
            items,
            import_record_index,
        } => StmtData::Import {
            namespace_ref: *namespace_ref,
            default_name: *default_name,
            items: items.to_vec(),
            import_record_index: *import_record_index,
        },
    }
}
