//! Statement payloads.

use crate::expr::{Binding, Class, ExprId, Fn};
use crate::refs::{Loc, Ref};

/// Index of a statement slot in a module's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtId(pub(crate) u32);

impl StmtId {
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A statement node: location plus replaceable payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub loc: Loc,
    pub data: StmtData,
}

/// One declarator of a `let`/`const`/`var` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub binding: Binding,
    pub value: Option<ExprId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    Var,
    Let,
    Const,
}

/// One name of an import/export clause. `alias` is the exported/imported
/// name as written; `original_name` the name in the source module.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseItem {
    pub alias: String,
    pub original_name: String,
    pub name: Ref,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    pub binding: Option<Binding>,
    pub body: Vec<StmtId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finally {
    pub stmts: Vec<StmtId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub value: Option<ExprId>,
    pub body: Vec<StmtId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub value: Option<ExprId>,
}

/// `export default` can carry a statement (function/class declaration) or an
/// expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportDefaultValue {
    Stmt(StmtId),
    Expr(ExprId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtData {
    Block {
        stmts: Vec<StmtId>,
    },
    /// CommonJS-interop export synthesized by the host bundler.
    LazyExport {
        value: ExprId,
    },
    Expr {
        value: ExprId,
    },
    Enum {
        name: Ref,
        values: Vec<EnumValue>,
    },
    Namespace {
        name: Ref,
        stmts: Vec<StmtId>,
    },
    Function {
        func: Fn,
        is_export: bool,
    },
    Class {
        class: Class,
        is_export: bool,
    },
    Label {
        name: Ref,
        stmt: StmtId,
    },
    If {
        test: ExprId,
        yes: StmtId,
        no: Option<StmtId>,
    },
    For {
        init: Option<StmtId>,
        test: Option<ExprId>,
        update: Option<ExprId>,
        body: StmtId,
    },
    ForIn {
        init: StmtId,
        value: ExprId,
        body: StmtId,
    },
    ForOf {
        init: StmtId,
        value: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        test: ExprId,
    },
    While {
        test: ExprId,
        body: StmtId,
    },
    With {
        value: ExprId,
        body: StmtId,
    },
    Try {
        body: Vec<StmtId>,
        catch: Option<Catch>,
        finally: Option<Finally>,
    },
    Switch {
        test: ExprId,
        cases: Vec<Case>,
    },
    Return {
        value: Option<ExprId>,
    },
    Throw {
        value: ExprId,
    },
    Local {
        kind: LocalKind,
        decls: Vec<Decl>,
        is_export: bool,
    },
    ExportDefault {
        default_name: Ref,
        value: ExportDefaultValue,
    },
    Comment {
        text: String,
    },
    Debugger,
    Directive {
        value: String,
    },
    Empty,
    /// A TypeScript-only construct erased by the host parser.
    TypeScript,
    /// `export { a, b as c }`
    ExportClause {
        items: Vec<ClauseItem>,
    },
    /// `export { a } from "m"`
    ExportFrom {
        items: Vec<ClauseItem>,
        namespace_ref: Ref,
        import_record_index: u32,
    },
    /// `export * from "m"`
    ExportStar {
        namespace_ref: Ref,
        alias: Option<String>,
        import_record_index: u32,
    },
    /// `export = expr` (TypeScript)
    ExportEquals {
        value: ExprId,
    },
    Break {
        label: Option<Ref>,
    },
    Continue {
        label: Option<Ref>,
    },
    Import {
        namespace_ref: Ref,
        default_name: Option<Ref>,
        items: Vec<ClauseItem>,
        import_record_index: u32,
    },
}
