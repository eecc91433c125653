//! JavaScript AST data model and traversal for the sqljoy compiler.
//!
//! The host bundler parses modules; this crate defines the shape those
//! parsed modules take on our side of the fence: arena-allocated
//! expression/statement nodes addressed by slot ids, per-module symbol
//! tables and import/export records, and a depth-first walker that threads
//! `(stmt, decl, parents[])` context to visitor hooks.
//!
//! Node payloads are replaced in place by slot id, which is what lets one
//! parsed tree serve both the client and the server emit passes.

pub mod ast;
pub mod builder;
pub mod clone;
pub mod expr;
pub mod refs;
pub mod stmt;
pub mod walker;

pub use ast::{Ast, ImportRecord, Module, NamedImport, Part, PartId, Source, Symbol};
pub use builder::ModuleBuilder;
pub use expr::{
    Arg, BinOp, Binding, BindingData, Class, Expr, ExprData, ExprId, Fn, Property, TemplatePart,
    UnOp,
};
pub use refs::{INLINE_REF_BASE, Loc, Ref};
pub use stmt::{
    Case, Catch, ClauseItem, Decl, EnumValue, ExportDefaultValue, Finally, LocalKind, Stmt,
    StmtData, StmtId,
};
pub use walker::{Visit, Visitor, walk_module};
