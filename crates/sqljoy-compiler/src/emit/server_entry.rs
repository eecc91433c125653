//! Synthesis of the virtual server entry module.
//!
//! The server bundle starts from a generated source that imports every
//! server function and validator, exports `functions` (import hash ->
//! function) and `validators` (query hash -> composed validator calls).
//! Everything is ordered deterministically: module paths ascending, symbol
//! names ascending within a module, aliases numbered `_0, _1, ...` in
//! written order, validator map keys sorted by query hash.

use std::collections::BTreeMap;
use std::fmt::Write;

use sha2::{Digest, Sha256};

use super::base64url_30;

/// An imported server function or validator: the symbol name in its
/// module, the hash of `(module, name)`, and the alias assigned in the
/// synthesized source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    pub name: String,
    pub hash: String,
    pub alias: String,
}

/// Hash-identify a `(module, name)` pair.
pub fn new_import(module: &str, name: &str) -> ImportedName {
    let mut hasher = Sha256::new();
    hasher.update(module.as_bytes());
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    ImportedName {
        name: name.to_string(),
        hash: base64url_30(&digest),
        alias: String::new(),
    }
}

/// Relative path from `base` to `target` by path components. `None` when
/// no relative form exists (different roots).
pub fn relative_path(base: &str, target: &str) -> Option<String> {
    let base_abs = base.starts_with('/');
    if base_abs != target.starts_with('/') {
        return None;
    }
    let base_parts: Vec<&str> = base.split('/').filter(|c| !c.is_empty() && *c != ".").collect();
    let target_parts: Vec<&str> = target
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect();

    let common = base_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..base_parts.len() {
        parts.push("..");
    }
    parts.extend(&target_parts[common..]);
    if parts.is_empty() {
        return Some(".".to_string());
    }
    Some(parts.join("/"))
}

/// Synthesize the server entry source from the collected function and
/// validator imports.
pub fn synthesize_server_entry(
    functions: &BTreeMap<String, Vec<ImportedName>>,
    validators: &BTreeMap<String, Vec<ImportedName>>,
    validators_by_query: &BTreeMap<String, Vec<String>>,
) -> String {
    // Merge both import sets, deduplicated by (module, name); the hash is
    // a pure function of the pair so either copy is interchangeable.
    let mut merged: BTreeMap<&str, BTreeMap<&str, &str>> = BTreeMap::new();
    for (module, imports) in functions.iter().chain(validators.iter()) {
        let names = merged.entry(module.as_str()).or_default();
        for imp in imports {
            names.insert(imp.name.as_str(), imp.hash.as_str());
        }
    }

    let mut sb = String::new();
    let mut aliases_by_hash: BTreeMap<&str, String> = BTreeMap::new();
    let mut next_alias = 0usize;
    for (module, names) in &merged {
        sb.push_str("import { ");
        for (i, (name, hash)) in names.iter().enumerate() {
            if i != 0 {
                sb.push_str(", ");
            }
            let alias = format!("_{next_alias}");
            next_alias += 1;
            write!(sb, "{name} as {alias}").expect("String write never fails");
            aliases_by_hash.insert(*hash, alias);
        }
        writeln!(sb, " }} from \"{module}\";").expect("String write never fails");
    }

    sb.push_str("\nexport const functions = {\n");
    let mut i = 0;
    for imports in functions.values() {
        let mut ordered: Vec<&ImportedName> = imports.iter().collect();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));
        ordered.dedup_by(|a, b| a.hash == b.hash);
        for imp in ordered {
            if i != 0 {
                sb.push_str(",\n");
            }
            let alias = &aliases_by_hash[imp.hash.as_str()];
            write!(sb, "\t\"{}\": {}", imp.hash, alias).expect("String write never fails");
            i += 1;
        }
    }
    sb.push_str("\n};\n");

    sb.push_str("\nexport const validators = {\n");
    let mut i = 0;
    for (query_hash, validator_hashes) in validators_by_query {
        if validator_hashes.is_empty() {
            continue;
        }
        if i != 0 {
            sb.push_str(",\n");
        }
        write!(sb, "\t\"{query_hash}\": (e, s) => {{\n").expect("String write never fails");
        for validator_hash in validator_hashes {
            let alias = &aliases_by_hash[validator_hash.as_str()];
            writeln!(sb, "\t\t{alias}(e, s);").expect("String write never fails");
        }
        sb.push_str("\t}");
        i += 1;
    }
    sb.push_str("\n};\n");

    sb
}
