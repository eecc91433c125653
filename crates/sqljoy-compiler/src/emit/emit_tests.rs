use indoc::indoc;

use crate::emit::{WhitelistEntry, serialize_whitelist};
use crate::query::SourceLocation;

fn entry(id: &str, query: &str) -> WhitelistEntry {
    WhitelistEntry {
        id: id.to_string(),
        query: query.to_string(),
        ty: Some("select"),
        is_public: true,
        server_references: 0,
        client_references: 1,
        defined_at: SourceLocation {
            line: 1,
            file: "app.js".to_string(),
        },
        usages: vec![SourceLocation {
            line: 3,
            file: "app.js".to_string(),
        }],
        params: Vec::new(),
        fragments: Vec::new(),
    }
}

#[test]
fn empty_whitelist_is_omitted() {
    assert_eq!(serialize_whitelist(&[]), None);
}

#[test]
fn whitelist_json_uses_tabs_and_omits_zero_values() {
    let json = serialize_whitelist(&[entry("abc", "select 1")]).expect("non-empty");
    let expected = indoc! {r#"
        [
        	{
        		"id": "abc",
        		"query": "select 1",
        		"type": "select",
        		"isPublic": true,
        		"clientReferences": 1,
        		"definedAt": {
        			"line": 1,
        			"fileName": "app.js"
        		},
        		"usages": [
        			{
        				"line": 3,
        				"fileName": "app.js"
        			}
        		]
        	}
        ]"#};
    assert_eq!(json, expected);
    assert!(!json.contains("serverReferences"));
    assert!(!json.contains("params"));
    assert!(!json.contains("fragments"));
}

#[test]
fn fragment_entries_nest_and_omit_type() {
    let mut parent = entry("parent", "select * from t where ${fragment1}");
    let mut child = entry("child", "a = 1");
    child.ty = None;
    child.usages.clear();
    parent.fragments = vec![vec![child]];

    let json = serialize_whitelist(std::slice::from_ref(&parent)).expect("non-empty");
    assert!(json.contains("\"fragments\": ["));
    assert!(json.contains("\"id\": \"child\""));
    // Fragments carry no statement type.
    let child_part = &json[json.find("child").unwrap()..];
    assert!(!child_part.contains("\"type\""));
}
