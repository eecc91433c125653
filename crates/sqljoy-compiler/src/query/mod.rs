//! Query model: parsed templates, variables, hashes, allow-list ordering.
//!
//! A `Query` is born from a tagged template (`new_query`), compiled by the
//! global pass (hash, fragment resolution, inlining), and finally rendered
//! into an allow-list entry and an AST replacement. Queries are shared
//! between the global map and fragment groups, so they live behind
//! `Rc<RefCell<..>>` for the duration of the single-threaded global pass.


use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use sqljoy_ast::{ExprData, Module, Ref};

use crate::analyze::{QueryTemplate, ref_for_identifier_or_member};
use crate::rewrite::ExprRef;

/// Statement type, sniffed from the first keyword of the stitched text.
/// The variant order is the allow-list sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum QueryType {
    #[default]
    Fragment,
    Select,
    Update,
    Delete,
    Insert,
    Other,
}

impl QueryType {
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            QueryType::Fragment => None,
            QueryType::Select => Some("select"),
            QueryType::Update => Some("update"),
            QueryType::Delete => Some("delete"),
            QueryType::Insert => Some("insert"),
            QueryType::Other => Some("other"),
        }
    }
}

static RE_QUERY_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)\A(?:\s*(?:--.*?$|/\*.*?\*/))*\s*(\w+)").expect("query type regex")
});

static RE_PERCENT_PARAMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\{([a-zA-Z0-9_.\-]+?)\}").expect("percent param regex"));

const SERVER_VARS: [&str; 2] = ["SESSION.", "ENV."];

/// Keyword sniff for the statement type. Leading whitespace and SQL
/// comments are skipped; no dialect parsing beyond that.
pub fn query_type_of(query: &str) -> QueryType {
    let Some(captures) = RE_QUERY_TYPE.captures(query) else {
        return QueryType::Other;
    };
    match captures[1].to_ascii_lowercase().as_str() {
        "select" => QueryType::Select,
        "update" => QueryType::Update,
        "insert" => QueryType::Insert,
        "delete" => QueryType::Delete,
        _ => QueryType::Other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryVarType {
    /// A `${expr}` interpolation; becomes a `$N` parameter unless it
    /// resolves to fragments.
    Var,
    /// A `%{name}` late-bound parameter, bound at `executeQuery` time.
    Param,
    /// A `%{SESSION.*}`/`%{ENV.*}` server-only variable.
    Server,
    /// A slot holding one or more resolved fragments.
    Fragment,
}

#[derive(Debug, Clone)]
pub struct QueryVar {
    pub var_ref: Ref,
    pub ty: QueryVarType,
    /// Optional `:label:` name for vars, the `%{...}` name otherwise.
    pub name: String,
    pub fragments: Vec<QueryRc>,
    pub expr: Option<ExprRef>,
}

/// Where a query is used: one `executeQuery` call site.
#[derive(Debug, Clone, Copy)]
pub struct QueryUsage {
    pub call: ExprRef,
    pub is_server: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub line: u32,
    #[serde(rename = "fileName")]
    pub file: String,
}

pub type QueryRc = Rc<RefCell<Query>>;

#[derive(Debug)]
pub struct Query {
    pub template: QueryTemplate,
    /// Base64url of the first 30 bytes of `bin_hash`; empty until compiled.
    pub hash: String,
    /// Full content digest; fragment hashes feed parent hashes raw.
    pub bin_hash: [u8; 32],
    /// The stitched SQL text; empty until the query is replaced.
    pub query_text: String,
    pub ty: QueryType,
    pub is_public: bool,
    pub server_references: u16,
    pub client_references: u16,
    pub inlined_client_count: u16,
    pub inlined_server_count: u16,
    pub defined_at: SourceLocation,
    pub usages: Vec<SourceLocation>,
    pub calls: Vec<QueryUsage>,
    /// Alternative groups at each fragment slot, in slot order.
    pub fragments: Vec<Vec<QueryRc>>,
    pub parts: Vec<String>,
    pub vars: Vec<QueryVar>,
}

impl Query {
    pub fn is_fragment(&self) -> bool {
        self.template.is_fragment
    }

    pub fn is_reachable(&self) -> bool {
        self.client_references != 0 || self.server_references != 0
    }

    pub fn is_inlined(&self) -> bool {
        self.inlined_client_count != 0 || self.inlined_server_count != 0
    }

    /// Names of late-bound parameters, for allow-list readers.
    pub fn param_names(&self) -> Vec<String> {
        self.vars
            .iter()
            .filter(|v| v.ty == QueryVarType::Param)
            .map(|v| v.name.clone())
            .collect()
    }

    /// Splice a fragment's parts and vars into this query at `index`,
    /// merging the surrounding text parts. Replacing one var with N vars
    /// and N+1 parts keeps the parts/vars invariant intact.
    pub fn insert(&mut self, index: usize, fragment: &Query) {
        self.parts[index] = format!(
            "{}{}{}",
            self.parts[index],
            fragment.parts[0],
            self.parts[index + 1]
        );

        let tail_vars = self.vars.split_off(index + 1);
        let tail_parts = self.parts.split_off(index + 2);

        self.vars.truncate(index);
        self.vars.extend(fragment.vars.iter().cloned());
        self.vars.extend(tail_vars);

        self.parts.truncate(index + 1);
        self.parts.extend(fragment.parts[1..].iter().cloned());
        self.parts.extend(tail_parts);

        if !fragment.is_public {
            self.is_public = false;
        }

        assert_eq!(
            self.parts.len(),
            self.vars.len() + 1,
            "number of template parts doesn't match template vars"
        );
    }
}

/// Parse a discovered template into an uncompiled query: scan raw text for
/// `%{name}` variables, collect `${expr}` slots, strip `:label:` names.
pub fn new_query(qt: &QueryTemplate, module: &Module) -> QueryRc {
    let expr = module.ast.expr(qt.expr);
    let ExprData::Template {
        head_raw,
        parts: template_parts,
        ..
    } = &expr.data
    else {
        panic!("query template ref does not point at a template literal");
    };

    let mut parts: Vec<String> = Vec::with_capacity(template_parts.len() + 1);
    let mut vars: Vec<QueryVar> = Vec::with_capacity(template_parts.len());

    let append_part = |s: &str, vars: &mut Vec<QueryVar>, parts: &mut Vec<String>| {
        let mut i = 0;
        for m in RE_PERCENT_PARAMS.captures_iter(s) {
            let whole = m.get(0).expect("capture 0 always present");
            parts.push(s[i..whole.start()].to_string());
            let var_name = &m[1];
            let ty = if SERVER_VARS.iter().any(|sv| var_name.starts_with(sv)) {
                QueryVarType::Server
            } else {
                QueryVarType::Param
            };
            vars.push(QueryVar {
                var_ref: Ref::INVALID,
                ty,
                name: var_name.to_string(),
                fragments: Vec::new(),
                expr: None,
            });
            i = whole.end();
        }
        parts.push(s[i..].to_string());
    };

    append_part(head_raw, &mut vars, &mut parts);
    for part in template_parts {
        let (var_ref, _) = ref_for_identifier_or_member(None, &module.ast, part.value);
        vars.push(QueryVar {
            var_ref,
            ty: QueryVarType::Var,
            name: String::new(),
            fragments: Vec::new(),
            expr: Some(ExprRef::new(qt.source_index, part.value)),
        });

        // A leading `:label:` names the preceding var and is not part of
        // the query text.
        let mut tail = part.tail_raw.as_str();
        if let Some(rest) = tail.strip_prefix(':')
            && let Some(end) = rest.find(':')
            && end > 0
        {
            vars.last_mut().expect("var just pushed").name = rest[..end].to_string();
            tail = &rest[end + 1..];
        }
        append_part(tail, &mut vars, &mut parts);
    }

    assert_eq!(
        parts.len(),
        vars.len() + 1,
        "number of template parts doesn't match template vars"
    );

    let defined_at = SourceLocation {
        line: module.source.line_of(expr.loc),
        file: module.source.pretty_path.clone(),
    };

    Rc::new(RefCell::new(Query {
        template: *qt,
        hash: String::new(),
        bin_hash: [0; 32],
        query_text: String::new(),
        ty: QueryType::Fragment,
        is_public: true,
        server_references: 0,
        client_references: 0,
        inlined_client_count: 0,
        inlined_server_count: 0,
        defined_at,
        usages: Vec::new(),
        calls: Vec::new(),
        fragments: Vec::new(),
        parts,
        vars,
    }))
}

/// Allow-list ordering: public first, then type, file, line.
pub fn whitelist_cmp(a: &Query, b: &Query) -> Ordering {
    b.is_public
        .cmp(&a.is_public)
        .then_with(|| a.ty.cmp(&b.ty))
        .then_with(|| a.defined_at.file.cmp(&b.defined_at.file))
        .then_with(|| a.defined_at.line.cmp(&b.defined_at.line))
}

pub fn sort_whitelist(queries: &mut [QueryRc]) {
    queries.sort_by(|a, b| whitelist_cmp(&a.borrow(), &b.borrow()));
}

/// Merge two whitelist-ordered candidate lists, discarding duplicates
/// (the same query reached through both branches of a conditional).
pub fn merge_candidates(a: Vec<QueryRc>, b: Vec<QueryRc>) -> Vec<QueryRc> {
    if b.is_empty() {
        return a;
    }
    if a.is_empty() {
        return b;
    }
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut left = a.into_iter().peekable();
    let mut right = b.into_iter().peekable();
    loop {
        match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => {
                if whitelist_cmp(&r.borrow(), &l.borrow()) == Ordering::Less {
                    let r = right.next().expect("peeked");
                    push_unique(&mut merged, r);
                } else {
                    let l = left.next().expect("peeked");
                    push_unique(&mut merged, l);
                }
            }
            (Some(_), None) => {
                let l = left.next().expect("peeked");
                push_unique(&mut merged, l);
            }
            (None, Some(_)) => {
                let r = right.next().expect("peeked");
                push_unique(&mut merged, r);
            }
            (None, None) => break,
        }
    }
    merged
}

fn push_unique(merged: &mut Vec<QueryRc>, q: QueryRc) {
    if !merged.iter().any(|m| Rc::ptr_eq(m, &q)) {
        merged.push(q);
    }
}
