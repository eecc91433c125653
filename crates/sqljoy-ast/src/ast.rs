//! Per-module AST arena and parse-time metadata.
//!
//! Everything the host bundler produces at parse time (symbols, import
//! records, named imports/exports) is immutable during a build. The only
//! thing that changes afterwards is node payloads, replaced in place through
//! slot ids so the same tree can be serialized twice.

use indexmap::IndexMap;

use crate::expr::{Expr, ExprData, ExprId};
use crate::refs::{Loc, Ref};
use crate::stmt::{Stmt, StmtData, StmtId};

/// One declared name in a module's symbol table.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub original_name: String,
    /// Approximate number of references, maintained by the host parser and
    /// decremented when call sites are rewritten away.
    pub use_count_estimate: u32,
}

/// A named import binding: the local ref maps to `alias` within the module
/// named by the import record.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedImport {
    pub alias: String,
    pub import_record_index: u32,
}

/// One `import`/`export ... from` record.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub path: String,
    /// Resolved source index, when the path resolved inside the bundle.
    pub source_index: Option<u32>,
}

/// A group of top-level statements the bundler tree-shakes as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub stmts: Vec<StmtId>,
    /// When set, the tree-shaker drops this part regardless of use counts.
    pub force_remove: bool,
}

/// Index of a part in a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartId(pub(crate) u32);

impl PartId {
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ast {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    pub parts: Vec<Part>,
    pub symbols: Vec<Symbol>,
    pub named_imports: IndexMap<Ref, NamedImport>,
    pub named_exports: IndexMap<String, Ref>,
    pub import_records: Vec<ImportRecord>,
    /// Indices into `import_records` for `export * from` statements.
    pub export_star_import_records: Vec<u32>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_expr(&mut self, loc: Loc, data: ExprData) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr { loc, data });
        id
    }

    pub fn alloc_stmt(&mut self, loc: Loc, data: StmtData) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(Stmt { loc, data });
        id
    }

    pub fn add_part(&mut self, stmts: Vec<StmtId>) -> PartId {
        let id = PartId(self.parts.len() as u32);
        self.parts.push(Part {
            stmts,
            force_remove: false,
        });
        id
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.index()]
    }

    pub fn part(&self, id: PartId) -> &Part {
        &self.parts[id.index()]
    }

    pub fn part_mut(&mut self, id: PartId) -> &mut Part {
        &mut self.parts[id.index()]
    }

    /// The declared name behind a ref, for refs pointing into this module.
    pub fn symbol_name(&self, r: Ref) -> Option<&str> {
        self.symbols
            .get(r.inner as usize)
            .map(|s| s.original_name.as_str())
    }
}

/// A source file as presented by the host bundler.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub index: u32,
    /// Absolute key path within the bundler's namespace.
    pub key_path: String,
    /// Path as shown in output (relative, no leading slash).
    pub pretty_path: String,
    pub contents: String,
}

impl Source {
    /// 1-based line number of a byte offset.
    pub fn line_of(&self, loc: Loc) -> u32 {
        let end = (loc.0 as usize).min(self.contents.len());
        self.contents[..end].bytes().filter(|&b| b == b'\n').count() as u32 + 1
    }
}

/// One parsed module: source plus AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub source: Source,
    pub ast: Ast,
}
