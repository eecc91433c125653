//! AST mutation with an undo log.
//!
//! Three guarded primitives mutate the tree now: replace an expression
//! payload, replace a statement payload, mark a top-level part for
//! removal. Each checks the slot still holds the expected old payload, so
//! a slot is replaced at most once per build direction. A fourth,
//! [`Rewriter::defer_expr`], only appends to the log: it covers rewrites
//! that must leave the client build untouched and take effect at drain
//! time, which a restore-the-previous-payload undo entry cannot express.
//! The undo log is drained in reverse right before the server pass; that
//! inversion is the only mechanism by which one parsed AST serves two
//! emitted bundles.

use sqljoy_ast::{ExprData, ExprId, Module, PartId, StmtData, StmtId};

/// A cross-module expression slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprRef {
    pub source: u32,
    pub expr: ExprId,
}

impl ExprRef {
    pub fn new(source: u32, expr: ExprId) -> Self {
        Self { source, expr }
    }
}

/// A cross-module statement slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtRef {
    pub source: u32,
    pub stmt: StmtId,
}

/// A cross-module part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartRef {
    pub source: u32,
    pub part: PartId,
}

#[derive(Debug)]
enum UndoRecord {
    Expr { target: ExprRef, data: ExprData },
    Stmt { target: StmtRef, data: StmtData },
    Part { target: PartRef },
}

/// Applies mutations and records how to invert them.
#[derive(Debug, Default)]
pub struct Rewriter {
    undo: Vec<UndoRecord>,
}

fn module_mut(modules: &mut [Module], source: u32) -> &mut Module {
    modules
        .iter_mut()
        .find(|m| m.source.index == source)
        .expect("rewrite target names a module outside the build")
}

fn module(modules: &[Module], source: u32) -> &Module {
    modules
        .iter()
        .find(|m| m.source.index == source)
        .expect("rewrite target names a module outside the build")
}

impl Rewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Replace the payload at `target` iff it still equals `old`. With
    /// `undo` set, the previous payload is recorded for the server pass.
    pub fn replace_expr(
        &mut self,
        modules: &mut [Module],
        target: ExprRef,
        old: &ExprData,
        new: ExprData,
        undo: bool,
    ) -> bool {
        let slot = module_mut(modules, target.source).ast.expr_mut(target.expr);
        if slot.data != *old {
            return false;
        }
        let previous = std::mem::replace(&mut slot.data, new);
        if undo {
            self.undo.push(UndoRecord::Expr {
                target,
                data: previous,
            });
        }
        true
    }

    /// Same as [`replace_expr`](Self::replace_expr), for statement slots.
    pub fn replace_stmt(
        &mut self,
        modules: &mut [Module],
        target: StmtRef,
        old: &StmtData,
        new: StmtData,
        undo: bool,
    ) -> bool {
        let slot = module_mut(modules, target.source).ast.stmt_mut(target.stmt);
        if slot.data != *old {
            return false;
        }
        let previous = std::mem::replace(&mut slot.data, new);
        if undo {
            self.undo.push(UndoRecord::Stmt {
                target,
                data: previous,
            });
        }
        true
    }

    /// Record a payload to write at `target` when the log drains, without
    /// touching the slot now. Used for rewrites that are correct for the
    /// client build as-is but must look different to the server build.
    pub fn defer_expr(&mut self, target: ExprRef, data: ExprData) {
        self.undo.push(UndoRecord::Expr { target, data });
    }

    /// Mark a top-level part so the tree-shaker drops it, undoably.
    pub fn remove_part(&mut self, modules: &mut [Module], target: PartRef, undo: bool) {
        let part = module_mut(modules, target.source).ast.part_mut(target.part);
        if part.force_remove {
            return;
        }
        part.force_remove = true;
        if undo {
            self.undo.push(UndoRecord::Part { target });
        }
    }

    /// Drain the log in reverse, restoring every recorded slot. Called
    /// exactly once, between the client and server passes.
    pub fn drain(&mut self, modules: &mut [Module]) {
        for record in self.undo.drain(..).rev() {
            match record {
                UndoRecord::Expr { target, data } => {
                    module_mut(modules, target.source).ast.expr_mut(target.expr).data = data;
                }
                UndoRecord::Stmt { target, data } => {
                    module_mut(modules, target.source).ast.stmt_mut(target.stmt).data = data;
                }
                UndoRecord::Part { target } => {
                    module_mut(modules, target.source)
                        .ast
                        .part_mut(target.part)
                        .force_remove = false;
                }
            }
        }
    }
}

/// Read the current payload of an expression slot.
pub fn expr_data(modules: &[Module], target: ExprRef) -> &ExprData {
    &module(modules, target.source).ast.expr(target.expr).data
}
