//! Programmatic module construction.
//!
//! The bundler that hosts this compiler hands over already-parsed modules;
//! this builder is the in-crate way to produce the same shape, used by
//! embedders and throughout the test suites.
//!
//! Locations are line-oriented: the builder tracks a current line and
//! synthesizes source contents with one (empty) line per line number, so
//! `Source::line_of` round-trips without a real parser. `contents` can be
//! overridden when a test needs actual source text.

use crate::ast::{Ast, ImportRecord, Module, NamedImport, Source, Symbol};
use crate::expr::{Arg, Binding, BindingData, BinOp, ExprData, ExprId, Fn, Property, TemplatePart};
use crate::refs::{Loc, Ref};
use crate::stmt::{ClauseItem, Decl, LocalKind, StmtData, StmtId};

pub struct ModuleBuilder {
    index: u32,
    key_path: String,
    pretty_path: String,
    ast: Ast,
    line: u32,
    max_line: u32,
    contents: Option<String>,
}

impl ModuleBuilder {
    pub fn new(index: u32, key_path: &str) -> Self {
        Self {
            index,
            key_path: key_path.to_string(),
            pretty_path: key_path.trim_start_matches('/').to_string(),
            ast: Ast::new(),
            line: 1,
            max_line: 1,
            contents: None,
        }
    }

    /// Set the line subsequent nodes are located at.
    pub fn at_line(&mut self, line: u32) -> &mut Self {
        self.line = line;
        self.max_line = self.max_line.max(line);
        self
    }

    /// Override the synthesized source contents.
    pub fn contents(&mut self, text: &str) -> &mut Self {
        self.contents = Some(text.to_string());
        self
    }

    fn line_loc(&self) -> Loc {
        Loc(self.line - 1)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    // --- symbols and refs ---

    pub fn symbol(&mut self, name: &str) -> Ref {
        self.symbol_with_uses(name, 1)
    }

    pub fn symbol_with_uses(&mut self, name: &str, use_count_estimate: u32) -> Ref {
        let inner = self.ast.symbols.len() as u32;
        self.ast.symbols.push(Symbol {
            original_name: name.to_string(),
            use_count_estimate,
        });
        Ref::new(self.index, inner)
    }

    // --- parse-time metadata ---

    pub fn import_record(&mut self, path: &str, source_index: Option<u32>) -> u32 {
        let index = self.ast.import_records.len() as u32;
        self.ast.import_records.push(ImportRecord {
            path: path.to_string(),
            source_index,
        });
        index
    }

    pub fn named_import(&mut self, local: Ref, alias: &str, import_record_index: u32) {
        self.ast.named_imports.insert(
            local,
            NamedImport {
                alias: alias.to_string(),
                import_record_index,
            },
        );
    }

    pub fn named_export(&mut self, alias: &str, target: Ref) {
        self.ast.named_exports.insert(alias.to_string(), target);
    }

    // --- expressions ---

    pub fn expr(&mut self, data: ExprData) -> ExprId {
        let loc = self.line_loc();
        self.ast.alloc_expr(loc, data)
    }

    pub fn ident(&mut self, r: Ref) -> ExprId {
        self.expr(ExprData::Identifier(r))
    }

    pub fn import_ident(&mut self, r: Ref) -> ExprId {
        self.expr(ExprData::ImportIdentifier(r))
    }

    pub fn dot(&mut self, target: ExprId, name: &str) -> ExprId {
        self.expr(ExprData::Dot {
            target,
            name: name.to_string(),
        })
    }

    pub fn index_expr(&mut self, target: ExprId, index: ExprId) -> ExprId {
        self.expr(ExprData::Index { target, index })
    }

    pub fn call(&mut self, target: ExprId, args: Vec<ExprId>) -> ExprId {
        self.expr(ExprData::Call { target, args })
    }

    pub fn number(&mut self, value: f64) -> ExprId {
        self.expr(ExprData::Number(value))
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.expr(ExprData::String(value.to_string()))
    }

    pub fn binary(&mut self, op: BinOp, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprData::Binary { op, left, right })
    }

    pub fn ternary(&mut self, test: ExprId, yes: ExprId, no: ExprId) -> ExprId {
        self.expr(ExprData::If { test, yes, no })
    }

    pub fn object(&mut self, properties: Vec<(ExprId, ExprId)>) -> ExprId {
        let properties = properties
            .into_iter()
            .map(|(key, value)| Property {
                key,
                value: Some(value),
                initializer: None,
            })
            .collect();
        self.expr(ExprData::Object {
            properties,
            is_single_line: false,
        })
    }

    /// A template literal: `head` then `(expr, tail)` pairs.
    pub fn template(
        &mut self,
        tag: Option<ExprId>,
        head_raw: &str,
        parts: Vec<(ExprId, &str)>,
    ) -> ExprId {
        let parts = parts
            .into_iter()
            .map(|(value, tail_raw)| TemplatePart {
                value,
                tail_raw: tail_raw.to_string(),
            })
            .collect();
        self.expr(ExprData::Template {
            tag,
            head_raw: head_raw.to_string(),
            parts,
        })
    }

    pub fn arrow(&mut self, args: Vec<Arg>, body: Vec<StmtId>) -> ExprId {
        self.expr(ExprData::Arrow {
            args,
            body,
            is_async: true,
        })
    }

    pub fn arg(&mut self, binding: Ref) -> Arg {
        Arg {
            binding: Binding {
                loc: self.line_loc(),
                data: BindingData::Identifier(binding),
            },
            default: None,
        }
    }

    // --- statements ---

    /// Append a top-level statement; each one becomes its own part, which is
    /// the granularity the tree-shaker works at.
    pub fn top_level(&mut self, data: StmtData) -> StmtId {
        let loc = self.line_loc();
        let stmt = self.ast.alloc_stmt(loc, data);
        self.ast.add_part(vec![stmt]);
        stmt
    }

    /// Allocate a statement without adding it to a part (function bodies,
    /// nested blocks).
    pub fn stmt(&mut self, data: StmtData) -> StmtId {
        let loc = self.line_loc();
        self.ast.alloc_stmt(loc, data)
    }

    pub fn expr_stmt(&mut self, value: ExprId) -> StmtId {
        self.top_level(StmtData::Expr { value })
    }

    pub fn local(&mut self, kind: LocalKind, decls: Vec<(Ref, Option<ExprId>)>, is_export: bool) -> StmtId {
        let loc = self.line_loc();
        let decls = decls
            .into_iter()
            .map(|(r, value)| Decl {
                binding: Binding {
                    loc,
                    data: BindingData::Identifier(r),
                },
                value,
            })
            .collect();
        self.top_level(StmtData::Local {
            kind,
            decls,
            is_export,
        })
    }

    pub fn const_decl(&mut self, name: Ref, value: ExprId) -> StmtId {
        self.local(LocalKind::Const, vec![(name, Some(value))], false)
    }

    pub fn export_const(&mut self, name: Ref, value: ExprId) -> StmtId {
        self.local(LocalKind::Const, vec![(name, Some(value))], true)
    }

    pub fn function_stmt(
        &mut self,
        name: Ref,
        args: Vec<Arg>,
        body: Vec<StmtId>,
        is_export: bool,
    ) -> StmtId {
        self.top_level(StmtData::Function {
            func: Fn {
                name: Some(name),
                args,
                body,
                is_async: true,
            },
            is_export,
        })
    }

    pub fn import_stmt(&mut self, import_record_index: u32, items: Vec<ClauseItem>) -> StmtId {
        let namespace_ref = self.symbol("import_ns");
        self.top_level(StmtData::Import {
            namespace_ref,
            default_name: None,
            items,
            import_record_index,
        })
    }

    pub fn export_star(&mut self, import_record_index: u32) -> StmtId {
        let namespace_ref = self.symbol("export_star_ns");
        self.ast
            .export_star_import_records
            .push(import_record_index);
        self.top_level(StmtData::ExportStar {
            namespace_ref,
            alias: None,
            import_record_index,
        })
    }

    pub fn export_from(&mut self, import_record_index: u32, items: Vec<ClauseItem>) -> StmtId {
        let namespace_ref = self.symbol("export_from_ns");
        self.top_level(StmtData::ExportFrom {
            items,
            namespace_ref,
            import_record_index,
        })
    }

    pub fn clause_item(&self, alias: &str, original_name: &str, name: Ref) -> ClauseItem {
        ClauseItem {
            alias: alias.to_string(),
            original_name: original_name.to_string(),
            name,
        }
    }

    // --- finish ---

    pub fn finish(self) -> Module {
        let contents = self
            .contents
            .unwrap_or_else(|| "\n".repeat(self.max_line as usize));
        Module {
            source: Source {
                index: self.index,
                key_path: self.key_path,
                pretty_path: self.pretty_path,
                contents,
            },
            ast: self.ast,
        }
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn ast_mut(&mut self) -> &mut Ast {
        &mut self.ast
    }
}
