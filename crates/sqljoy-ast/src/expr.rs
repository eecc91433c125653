//! Expression payloads.
//!
//! `ExprData` is a sealed enum of every expression kind the host bundler can
//! hand us. Consumers match exhaustively: an unhandled kind is a compile
//! error here, never a silent skip at runtime.

use crate::refs::{Loc, Ref};
use crate::stmt::StmtId;

/// Index of an expression slot in a module's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub(crate) u32);

impl ExprId {
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An expression node: location plus replaceable payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub loc: Loc,
    pub data: ExprData,
}

/// One `${expr}` slot of a template literal plus the raw text following it.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePart {
    pub value: ExprId,
    pub tail_raw: String,
}

/// An object/class property. `value` is the usual form; `initializer` holds
/// the default in shorthand-with-default positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: ExprId,
    pub value: Option<ExprId>,
    pub initializer: Option<ExprId>,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub binding: Binding,
    pub default: Option<ExprId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub loc: Loc,
    pub data: BindingData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindingData {
    Identifier(Ref),
    Array(Vec<Binding>),
    Missing,
}

/// A function body shared by declarations and expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Fn {
    pub name: Option<Ref>,
    pub args: Vec<Arg>,
    pub body: Vec<StmtId>,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: Option<Ref>,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Pos,
    Neg,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    LogicalAnd,
    LogicalOr,
    NullishCoalescing,
    Assign,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprData {
    Array {
        items: Vec<ExprId>,
    },
    Unary {
        op: UnOp,
        value: ExprId,
    },
    Binary {
        op: BinOp,
        left: ExprId,
        right: ExprId,
    },
    New {
        target: ExprId,
        args: Vec<ExprId>,
    },
    Call {
        target: ExprId,
        args: Vec<ExprId>,
    },
    /// `target.name`
    Dot {
        target: ExprId,
        name: String,
    },
    /// `target[index]`
    Index {
        target: ExprId,
        index: ExprId,
    },
    Arrow {
        args: Vec<Arg>,
        body: Vec<StmtId>,
        is_async: bool,
    },
    Function {
        func: Fn,
    },
    Class {
        class: Class,
    },
    JsxElement {
        tag: Option<ExprId>,
        properties: Vec<Property>,
        children: Vec<ExprId>,
    },
    Object {
        properties: Vec<Property>,
        is_single_line: bool,
    },
    Spread {
        value: ExprId,
    },
    /// A template literal, optionally tagged. `head_raw` is the text before
    /// the first `${`; each part carries its own trailing raw text.
    Template {
        tag: Option<ExprId>,
        head_raw: String,
        parts: Vec<TemplatePart>,
    },
    Await {
        value: ExprId,
    },
    Yield {
        value: Option<ExprId>,
        is_star: bool,
    },
    /// Ternary `test ? yes : no`.
    If {
        test: ExprId,
        yes: ExprId,
        no: ExprId,
    },
    /// Dynamic `import(expr)`.
    ImportCall {
        expr: ExprId,
    },
    Identifier(Ref),
    /// An identifier bound by an `import` statement.
    ImportIdentifier(Ref),
    Boolean(bool),
    Super,
    Null,
    Undefined,
    This,
    NewTarget,
    ImportMeta,
    PrivateIdentifier(Ref),
    Missing,
    Number(f64),
    BigInt(String),
    String(String),
    RegExp(String),
    Require {
        path: String,
    },
    RequireResolve {
        path: String,
    },
}
