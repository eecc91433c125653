//! Depth-first AST traversal.
//!
//! The walker threads `(stmt, decl, parents[])` context to a [`Visitor`].
//! Children of an expression are pushed right-to-left onto an explicit work
//! stack, so popping visits them in source order while `parents` behaves as
//! a proper stack; visitors that inspect sibling order rely on this.
//!
//! Every statement and expression kind is matched exhaustively. There is no
//! wildcard arm: a node kind the walker does not know about fails to
//! compile, it is never silently accepted.

use crate::ast::{Ast, PartId};
use crate::expr::{ExprData, ExprId};
use crate::stmt::{Decl, ExportDefaultValue, StmtData, StmtId};

/// Flow control returned from visitor hooks. [`Visit::Stop`] halts the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Stop,
}

/// Visitor hooks invoked by [`walk_module`]. Both default to continuing, so
/// an empty impl is a null visitor.
pub trait Visitor {
    fn visit_stmt(&mut self, _ast: &Ast, _stmt: StmtId, _part: Option<PartId>) -> Visit {
        Visit::Continue
    }

    #[allow(clippy::too_many_arguments)]
    fn visit_expr(
        &mut self,
        _ast: &Ast,
        _stmt: StmtId,
        _expr: ExprId,
        _decl: Option<&Decl>,
        _parents: &[ExprId],
        _part: Option<PartId>,
    ) -> Visit {
        Visit::Continue
    }
}

/// Walk every part of a module. Returns `true` if a visitor stopped the walk.
pub fn walk_module<V: Visitor>(visitor: &mut V, ast: &Ast) -> bool {
    let mut w = Walker { visitor };
    for part_index in 0..ast.parts.len() {
        let part = PartId(part_index as u32);
        for i in 0..ast.parts[part.index()].stmts.len() {
            let stmt = ast.parts[part.index()].stmts[i];
            if w.visit_stmt(ast, stmt, Some(part)) == Visit::Stop {
                return true;
            }
        }
    }
    false
}

struct Walker<'v, V> {
    visitor: &'v mut V,
}

impl<V: Visitor> Walker<'_, V> {
    fn visit_stmt(&mut self, ast: &Ast, stmt: StmtId, part: Option<PartId>) -> Visit {
        if self.visitor.visit_stmt(ast, stmt, part) == Visit::Stop {
            return Visit::Stop;
        }

        macro_rules! stmts {
            ($list:expr) => {
                for &s in $list {
                    if self.visit_stmt(ast, s, None) == Visit::Stop {
                        return Visit::Stop;
                    }
                }
            };
        }

        match &ast.stmt(stmt).data {
            StmtData::Block { stmts } => stmts!(stmts),
            StmtData::LazyExport { value } => {
                return self.visit_exprs(ast, stmt, part, vec![Some(*value)]);
            }
            StmtData::Expr { value } => {
                return self.visit_exprs(ast, stmt, part, vec![Some(*value)]);
            }
            StmtData::Enum { values, .. } => {
                let exprs = values.iter().rev().map(|v| v.value).collect();
                return self.visit_exprs(ast, stmt, part, exprs);
            }
            StmtData::Namespace { stmts, .. } => stmts!(stmts),
            StmtData::Function { func, .. } => stmts!(&func.body),
            StmtData::Class { class, .. } => {
                let mut exprs = Vec::with_capacity(class.properties.len() * 2);
                for prop in &class.properties {
                    exprs.push(prop.value);
                    exprs.push(prop.initializer);
                }
                return self.visit_exprs(ast, stmt, part, exprs);
            }
            StmtData::Label { stmt: inner, .. } => return self.visit_stmt(ast, *inner, None),
            StmtData::If { test, yes, no } => {
                if self.visit_exprs(ast, stmt, part, vec![Some(*test)]) == Visit::Stop {
                    return Visit::Stop;
                }
                if self.visit_stmt(ast, *yes, None) == Visit::Stop {
                    return Visit::Stop;
                }
                if let Some(no) = no {
                    return self.visit_stmt(ast, *no, None);
                }
            }
            StmtData::For {
                init,
                test,
                update,
                body,
            } => {
                if let Some(init) = init
                    && self.visit_stmt(ast, *init, None) == Visit::Stop
                {
                    return Visit::Stop;
                }
                if self.visit_exprs(ast, stmt, part, vec![*update, *test]) == Visit::Stop {
                    return Visit::Stop;
                }
                return self.visit_stmt(ast, *body, None);
            }
            StmtData::ForIn { init, value, body } | StmtData::ForOf { init, value, body } => {
                if self.visit_stmt(ast, *init, None) == Visit::Stop {
                    return Visit::Stop;
                }
                if self.visit_exprs(ast, stmt, part, vec![Some(*value)]) == Visit::Stop {
                    return Visit::Stop;
                }
                return self.visit_stmt(ast, *body, None);
            }
            StmtData::DoWhile { body, test } => {
                if self.visit_stmt(ast, *body, None) == Visit::Stop {
                    return Visit::Stop;
                }
                return self.visit_exprs(ast, stmt, part, vec![Some(*test)]);
            }
            StmtData::While { test, body } | StmtData::With { value: test, body } => {
                if self.visit_exprs(ast, stmt, part, vec![Some(*test)]) == Visit::Stop {
                    return Visit::Stop;
                }
                return self.visit_stmt(ast, *body, None);
            }
            StmtData::Try {
                body,
                catch,
                finally,
            } => {
                stmts!(body);
                if let Some(catch) = catch {
                    stmts!(&catch.body);
                }
                if let Some(finally) = finally {
                    stmts!(&finally.stmts);
                }
            }
            StmtData::Switch { test, cases } => {
                let mut exprs = vec![None; cases.len() + 1];
                for (i, case) in cases.iter().enumerate() {
                    exprs[cases.len() - 1 - i] = case.value;
                    stmts!(&case.body);
                }
                exprs[cases.len()] = Some(*test);
                return self.visit_exprs(ast, stmt, part, exprs);
            }
            StmtData::Return { value } => {
                return self.visit_exprs(ast, stmt, part, vec![*value]);
            }
            StmtData::Throw { value } => {
                return self.visit_exprs(ast, stmt, part, vec![Some(*value)]);
            }
            StmtData::Local { decls, .. } => {
                let exprs = decls.iter().rev().map(|d| d.value).collect();
                return self.visit_exprs(ast, stmt, part, exprs);
            }
            StmtData::ExportDefault { value, .. } => match value {
                ExportDefaultValue::Stmt(inner) => return self.visit_stmt(ast, *inner, None),
                ExportDefaultValue::Expr(expr) => {
                    return self.visit_exprs(ast, stmt, part, vec![Some(*expr)]);
                }
            },
            StmtData::Comment { .. }
            | StmtData::Debugger
            | StmtData::Directive { .. }
            | StmtData::Empty
            | StmtData::TypeScript
            | StmtData::ExportClause { .. }
            | StmtData::ExportFrom { .. }
            | StmtData::ExportStar { .. }
            | StmtData::ExportEquals { .. }
            | StmtData::Break { .. }
            | StmtData::Continue { .. }
            | StmtData::Import { .. } => {}
        }
        Visit::Continue
    }

    /// Iterative expression traversal with an explicit parent stack.
    ///
    /// `exprs` arrives with the last item to visit first at the tail (callers
    /// build it reversed); children are pushed the same way. `pop_parents`
    /// remembers the stack height below which each parent's children live,
    /// so a parent is popped exactly when its subtree is exhausted.
    fn visit_exprs(
        &mut self,
        ast: &Ast,
        stmt: StmtId,
        part: Option<PartId>,
        mut exprs: Vec<Option<ExprId>>,
    ) -> Visit {
        let decls: &[Decl] = match &ast.stmt(stmt).data {
            StmtData::Local { decls, .. } => decls,
            _ => &[],
        };
        let mut next_decl = 0usize;
        let mut decl: Option<&Decl> = None;

        let mut parents: Vec<ExprId> = Vec::new();
        let mut pop_parents: Vec<u32> = Vec::new();

        let mut tail = exprs.len() as isize - 1;
        while tail >= 0 {
            // Decls were queued in reverse order alongside their value
            // expressions; consume the next one each time the stack drops
            // back to the top-level run.
            if (tail as usize) < decls.len() - next_decl {
                decl = Some(&decls[next_decl]);
                next_decl += 1;
            }
            let item = exprs[tail as usize];
            exprs.truncate(tail as usize);
            let Some(expr) = item else {
                tail -= 1;
                continue;
            };

            if self
                .visitor
                .visit_expr(ast, stmt, expr, decl, &parents, part)
                == Visit::Stop
            {
                return Visit::Stop;
            }

            match &ast.expr(expr).data {
                ExprData::Array { items } => {
                    exprs.extend(items.iter().rev().map(|&e| Some(e)));
                }
                ExprData::Unary { value, .. } => exprs.push(Some(*value)),
                ExprData::Binary { left, right, .. } => {
                    exprs.push(Some(*left));
                    exprs.push(Some(*right));
                }
                ExprData::New { target, args } | ExprData::Call { target, args } => {
                    exprs.push(Some(*target));
                    exprs.extend(args.iter().rev().map(|&e| Some(e)));
                }
                ExprData::Dot { target, .. } => exprs.push(Some(*target)),
                ExprData::Index { target, index } => {
                    exprs.push(Some(*target));
                    exprs.push(Some(*index));
                }
                ExprData::Arrow { args, body, .. } => {
                    for &s in body.iter().rev() {
                        if self.visit_stmt(ast, s, None) == Visit::Stop {
                            return Visit::Stop;
                        }
                    }
                    exprs.extend(args.iter().rev().map(|a| a.default));
                }
                ExprData::Function { func } => {
                    for &s in func.body.iter().rev() {
                        if self.visit_stmt(ast, s, None) == Visit::Stop {
                            return Visit::Stop;
                        }
                    }
                    exprs.extend(func.args.iter().rev().map(|a| a.default));
                }
                ExprData::Class { class } => {
                    for prop in class.properties.iter().rev() {
                        if let Some(init) = prop.initializer {
                            exprs.push(Some(init));
                        }
                        if let Some(value) = prop.value {
                            exprs.push(Some(value));
                        }
                    }
                }
                ExprData::JsxElement {
                    tag,
                    properties,
                    children,
                } => {
                    exprs.extend(children.iter().rev().map(|&e| Some(e)));
                    for prop in properties {
                        if let Some(init) = prop.initializer {
                            exprs.push(Some(init));
                        }
                        if let Some(value) = prop.value {
                            exprs.push(Some(value));
                        }
                    }
                    if let Some(tag) = tag {
                        exprs.push(Some(*tag));
                    }
                }
                ExprData::Object { properties, .. } => {
                    for prop in properties.iter().rev() {
                        if let Some(init) = prop.initializer {
                            exprs.push(Some(init));
                        }
                        if let Some(value) = prop.value {
                            exprs.push(Some(value));
                        }
                    }
                }
                ExprData::Spread { value } => exprs.push(Some(*value)),
                ExprData::Template { tag, parts, .. } => {
                    exprs.extend(parts.iter().rev().map(|p| Some(p.value)));
                    if let Some(tag) = tag {
                        exprs.push(Some(*tag));
                    }
                }
                ExprData::Await { value } => exprs.push(Some(*value)),
                ExprData::Yield { value, .. } => {
                    if let Some(value) = value {
                        exprs.push(Some(*value));
                    }
                }
                ExprData::If { test, yes, no } => {
                    exprs.push(Some(*no));
                    exprs.push(Some(*yes));
                    exprs.push(Some(*test));
                }
                ExprData::ImportCall { expr } => exprs.push(Some(*expr)),
                ExprData::Identifier(_)
                | ExprData::ImportIdentifier(_)
                | ExprData::Boolean(_)
                | ExprData::Super
                | ExprData::Null
                | ExprData::Undefined
                | ExprData::This
                | ExprData::NewTarget
                | ExprData::ImportMeta
                | ExprData::PrivateIdentifier(_)
                | ExprData::Missing
                | ExprData::Number(_)
                | ExprData::BigInt(_)
                | ExprData::String(_)
                | ExprData::RegExp(_)
                | ExprData::Require { .. }
                | ExprData::RequireResolve { .. } => {}
            }

            let new_tail = exprs.len() as isize - 1;
            if new_tail < tail {
                // No children were pushed; if the stack dropped below the
                // current parent's first child, its subtree is done.
                if let Some(&first_child) = pop_parents.last()
                    && new_tail < first_child as isize
                {
                    parents.pop();
                    pop_parents.pop();
                }
            } else {
                // expr is the parent of everything above the old tail.
                parents.push(expr);
                pop_parents.push(tail as u32);
            }
            tail = new_tail;
        }
        Visit::Continue
    }
}
