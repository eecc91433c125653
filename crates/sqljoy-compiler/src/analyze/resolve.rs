//! Canonical-ref resolution.
//!
//! Walks import/export/alias bridges until the declaration that actually
//! defines a value is reached. Every step either strictly advances to a
//! different ref or halts; a visited set stops re-export cycles at the
//! first revisited ref.

use std::collections::HashSet;

use sqljoy_ast::{Ast, ExprData, ExprId, Module, Ref};

use super::ModuleAnalyzer;

/// Extract `(ref, prop)` from the shapes the compiler can trace:
/// identifiers, import identifiers, `x.prop`, `x["prop"]`, and inline
/// templates (through the analyzer's synthesized-ref map). Anything else
/// yields an invalid ref.
pub fn ref_for_identifier_or_member(
    analyzer: Option<&ModuleAnalyzer>,
    ast: &Ast,
    expr: ExprId,
) -> (Ref, String) {
    match &ast.expr(expr).data {
        ExprData::Identifier(r) | ExprData::ImportIdentifier(r) => (*r, String::new()),
        ExprData::Dot { target, name } => {
            // A property access is allowed only when rooted at an
            // identifier, e.g. a namespace import.
            let r = match &ast.expr(*target).data {
                ExprData::Identifier(r) | ExprData::ImportIdentifier(r) => *r,
                _ => Ref::INVALID,
            };
            (r, name.clone())
        }
        ExprData::Index { target, index } => {
            let prop = match &ast.expr(*index).data {
                ExprData::String(s) => s.clone(),
                _ => String::new(),
            };
            let r = match &ast.expr(*target).data {
                ExprData::Identifier(r) | ExprData::ImportIdentifier(r) => *r,
                _ => Ref::INVALID,
            };
            (r, prop)
        }
        ExprData::Template { .. } => {
            let r = analyzer
                .and_then(|a| a.inline_templates.get(&expr).copied())
                .unwrap_or(Ref::INVALID);
            (r, String::new())
        }
        _ => (Ref::INVALID, String::new()),
    }
}

fn module<'m>(modules: &'m [Module], source: u32) -> Option<&'m Module> {
    modules.iter().find(|m| m.source.index == source)
}

/// Follow imports, re-exports, export/alias bridges, and namespace exports
/// to the declaring ref.
pub fn find_original_ref(
    analyzers: &[Option<ModuleAnalyzer>],
    modules: &[Module],
    mut r: Ref,
    mut prop: String,
) -> Ref {
    let mut visited: HashSet<Ref> = HashSet::new();

    while r.is_valid() && visited.insert(r) {
        let src = r.source as usize;
        let Some(Some(analyzer)) = analyzers.get(src) else {
            break;
        };
        let Some(ast) = module(modules, r.source).map(|m| &m.ast) else {
            break;
        };

        if let Some(import) = ast.named_imports.get(&r) {
            // Follow the import record to the exporter's named exports. A
            // re-export shows up as another import there and loops again.
            let record = &ast.import_records[import.import_record_index as usize];
            let Some(exporter_index) = record.source_index else {
                break;
            };
            if analyzers
                .get(exporter_index as usize)
                .is_none_or(|a| a.is_none())
            {
                break;
            }
            let Some(exporter) = module(modules, exporter_index) else {
                break;
            };

            if let Some(&target) = exporter.ast.named_exports.get(&import.alias) {
                r = target;
            } else if !prop.is_empty()
                && let Some(&target) = exporter.ast.named_exports.get(&prop)
            {
                r = target;
                prop = String::new();
            } else if !exporter.ast.export_star_import_records.is_empty() {
                let mut found = false;
                for &record_index in &exporter.ast.export_star_import_records {
                    let Some(star_index) =
                        exporter.ast.import_records[record_index as usize].source_index
                    else {
                        continue;
                    };
                    if analyzers
                        .get(star_index as usize)
                        .is_none_or(|a| a.is_none())
                    {
                        continue;
                    }
                    let Some(star) = module(modules, star_index) else {
                        continue;
                    };
                    if let Some(&target) = star.ast.named_exports.get(&import.alias) {
                        r = target;
                        found = true;
                        break;
                    }
                }
                if !found {
                    break;
                }
            } else {
                break;
            }
        } else if let Some(&target) = analyzer.exports.get(&r) {
            r = target;
        } else if let Some(&target) = analyzer.aliases.get(&r) {
            r = target;
        } else if !prop.is_empty() {
            let Some(&ns_index) = analyzer.exported_namespaces.get(&r) else {
                break;
            };
            if analyzers.get(ns_index as usize).is_none_or(|a| a.is_none()) {
                break;
            }
            let Some(ns) = module(modules, ns_index) else {
                break;
            };
            let Some(&target) = ns.ast.named_exports.get(&prop) else {
                break;
            };
            r = target;
            prop = String::new();
        } else {
            break;
        }
    }

    r
}
