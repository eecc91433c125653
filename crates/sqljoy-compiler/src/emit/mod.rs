//! Output generation: allow-list JSON and the server entry module.

pub mod server_entry;

#[cfg(test)]
mod emit_tests;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;

use crate::query::{Query, QueryRc, SourceLocation};

/// A file produced by the build (allow-lists, bundles).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: String,
    pub contents: Vec<u8>,
}

/// First 30 bytes of a digest as unpadded URL-safe base64 (40 chars).
/// sha256 has more entropy than the hashes need.
pub fn base64url_30(digest: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(&digest[..30])
}

/// One allow-list record. Zero values are omitted so the files stay
/// readable; fragments nest their own entries per alternative group.
#[derive(Debug, Clone, Serialize)]
pub struct WhitelistEntry {
    pub id: String,
    pub query: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<&'static str>,
    #[serde(rename = "isPublic", skip_serializing_if = "is_false")]
    pub is_public: bool,
    #[serde(rename = "serverReferences", skip_serializing_if = "is_zero")]
    pub server_references: u16,
    #[serde(rename = "clientReferences", skip_serializing_if = "is_zero")]
    pub client_references: u16,
    #[serde(rename = "definedAt")]
    pub defined_at: SourceLocation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub usages: Vec<SourceLocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fragments: Vec<Vec<WhitelistEntry>>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &u16) -> bool {
    *n == 0
}

fn entry_of(q: &Query) -> WhitelistEntry {
    WhitelistEntry {
        id: q.hash.clone(),
        query: q.query_text.clone(),
        ty: q.ty.as_str(),
        is_public: q.is_public,
        server_references: q.server_references,
        client_references: q.client_references,
        defined_at: q.defined_at.clone(),
        usages: q.usages.clone(),
        params: q.param_names(),
        fragments: q
            .fragments
            .iter()
            .map(|group| group.iter().map(|f| entry_of(&f.borrow())).collect())
            .collect(),
    }
}

/// Snapshot queries into plain serializable records (the serializers run
/// on their own tasks and share nothing with the query graph).
pub fn whitelist_entries(queries: &[QueryRc]) -> Vec<WhitelistEntry> {
    queries.iter().map(|q| entry_of(&q.borrow())).collect()
}

/// Tab-indented JSON, or `None` for an empty list (empty allow-lists are
/// not written).
pub fn serialize_whitelist(entries: &[WhitelistEntry]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    entries
        .serialize(&mut ser)
        .expect("allow-list entries always serialize");
    Some(String::from_utf8(buf).expect("serde_json emits UTF-8"))
}
