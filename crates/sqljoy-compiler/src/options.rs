//! JSON configuration loading and validation.
//!
//! The configuration drives two bundler invocations (client and server)
//! plus the compiler's own filters. Options the underlying bundler would
//! accept but this pipeline cannot support are rejected up front.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// A configuration problem, reported verbatim to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConfigError {}

fn err(message: impl Into<String>) -> ConfigError {
    ConfigError(message.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Info,
    Warning,
    Error,
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeShaking {
    #[default]
    IgnoreAnnotations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Iife,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
}

/// Source handed to the bundler in place of an entry file (the synthesized
/// server entry module).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StdinOptions {
    pub contents: String,
    pub resolve_dir: String,
}

/// Options for one bundler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub entry_points: Vec<String>,
    pub external: Vec<String>,
    /// Flat compile-time defines; values are raw JSON so they can fold.
    pub define: BTreeMap<String, String>,
    pub log_level: LogLevel,
    pub bundle: bool,
    pub charset: Charset,
    pub minify_syntax: bool,
    pub minify_whitespace: bool,
    pub minify_identifiers: bool,
    pub tree_shaking: TreeShaking,
    pub outfile: String,
    pub write: bool,
    pub format: Format,
    pub stdin: Option<StdinOptions>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            entry_points: Vec::new(),
            external: Vec::new(),
            define: BTreeMap::new(),
            log_level: LogLevel::default(),
            bundle: true,
            charset: Charset::Utf8,
            minify_syntax: true,
            minify_whitespace: true,
            minify_identifiers: true,
            tree_shaking: TreeShaking::IgnoreAnnotations,
            outfile: String::new(),
            write: true,
            format: Format::Iife,
            stdin: None,
        }
    }
}

/// The full configuration file.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub client: BuildOptions,
    pub server: BuildOptions,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub account_id: String,
    pub account_secret: String,
    pub watch: bool,
    pub no_summary: bool,
}

impl Options {
    /// Parse and validate the JSON configuration. `cmd` is the CLI
    /// subcommand, reserved for command-specific defaults.
    pub fn from_json(json: &str, _cmd: &str) -> Result<Options, ConfigError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| err(format!("invalid configuration JSON: {e}")))?;
        let Some(root) = value.as_object() else {
            return Err(err("configuration must be a JSON object"));
        };

        let mut opts = Options {
            watch: root.get("watch").and_then(Value::as_bool).unwrap_or(false),
            account_id: string_field(root, "accountId")?.unwrap_or_default().to_string(),
            account_secret: string_field(root, "accountSecret")?
                .unwrap_or_default()
                .to_string(),
            ..Options::default()
        };

        let log_level = match root.get("logLevel").and_then(Value::as_str) {
            None | Some("") => LogLevel::default(),
            Some("info") => LogLevel::Info,
            Some("warning") => LogLevel::Warning,
            Some("error") => LogLevel::Error,
            Some("silent") => LogLevel::Silent,
            Some(other) => {
                return Err(err(format!(
                    "Invalid log level: {other:?} (valid: info, warning, error, silent)"
                )));
            }
        };
        opts.client.log_level = log_level;
        opts.server.log_level = log_level;

        // Environment defines stay flat (no objects or arrays) so the
        // bundler can inline them and constant-fold.
        let mut define = BTreeMap::new();
        if let Some(env) = root.get("env") {
            let Some(env) = env.as_object() else {
                return Err(err("env must be an object"));
            };
            for (key, value) in env {
                define.insert(key.clone(), value.to_string());
            }
        }
        define.insert(
            "ENV_ACCOUNT_ID".to_string(),
            format!("\"{}\"", opts.account_id),
        );
        opts.client.define = define.clone();
        opts.server.define = define;

        // Don't overwrite this, extend it.
        opts.server.external = vec!["sqljoy-runtime".to_string()];

        if let Some(include) = string_list(root, "include")? {
            opts.include = include;
        }
        if let Some(exclude) = string_list(root, "exclude")? {
            opts.exclude = exclude;
        }

        let empty = Map::new();
        let client_conf = object_field(root, "client")?.unwrap_or(&empty);
        let server_conf = object_field(root, "server")?.unwrap_or(&empty);
        unmarshal_build_opts(&mut opts.client, client_conf, false)?;
        unmarshal_build_opts(&mut opts.server, server_conf, true)?;

        Ok(opts)
    }
}

fn string_field<'v>(
    map: &'v Map<String, Value>,
    key: &str,
) -> Result<Option<&'v str>, ConfigError> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(err(format!("{key} must be a string, got {other}"))),
    }
}

fn object_field<'v>(
    map: &'v Map<String, Value>,
    key: &str,
) -> Result<Option<&'v Map<String, Value>>, ConfigError> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Object(o)) => Ok(Some(o)),
        Some(other) => Err(err(format!("{key} must be an object, got {other}"))),
    }
}

fn string_list(map: &Map<String, Value>, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
    let Some(value) = map.get(key) else {
        return Ok(None);
    };
    let Some(items) = value.as_array() else {
        return Err(err(format!("{key} must be an array")));
    };
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        let Some(s) = item.as_str() else {
            return Err(err(format!("{key}: expected string, got {item}")));
        };
        result.push(s.to_string());
    }
    Ok(Some(result))
}

fn unmarshal_build_opts(
    opts: &mut BuildOptions,
    conf: &Map<String, Value>,
    server: bool,
) -> Result<(), ConfigError> {
    // Disallowed bundler options: defines come from `env`, bundling and a
    // browser platform are structural requirements of the two-pass build.
    if conf.contains_key("inject") || conf.contains_key("define") {
        return Err(err(
            "inject/define is not currently supported, use banner/footer or env",
        ));
    }
    if conf.contains_key("bundle") {
        return Err(err("bundle must be true (the default)"));
    }
    if let Some(platform) = conf.get("platform")
        && platform != "browser"
    {
        return Err(err("only browser is supported for platform (the default)"));
    }

    opts.outfile = if server {
        "server.bundle.js".to_string()
    } else {
        "client.bundle.js".to_string()
    };

    match conf.get("minify") {
        None => {}
        Some(Value::Bool(minify)) => {
            opts.minify_syntax = *minify;
            opts.minify_whitespace = *minify;
            opts.minify_identifiers = *minify;
        }
        Some(Value::Object(minify)) => {
            if let Some(v) = minify.get("minifySyntax").and_then(Value::as_bool) {
                opts.minify_syntax = v;
            }
            if let Some(v) = minify.get("minifyWhitespace").and_then(Value::as_bool) {
                opts.minify_whitespace = v;
            }
            if let Some(v) = minify.get("minifyIdentifiers").and_then(Value::as_bool) {
                opts.minify_identifiers = v;
            }
        }
        Some(other) => return Err(err(format!("invalid argument type for minify: {other}"))),
    }

    match conf.get("treeShaking") {
        None | Some(Value::Null) => opts.tree_shaking = TreeShaking::IgnoreAnnotations,
        Some(Value::String(s)) if s == "ignoreAnnotations" => {
            opts.tree_shaking = TreeShaking::IgnoreAnnotations;
        }
        Some(other) => {
            return Err(err(format!("invalid argument {other} for tree shaking")));
        }
    }

    match conf.get("entryPoints") {
        Some(Value::Array(_)) => {
            let mut entry_points = string_list(conf, "entryPoints")?.expect("checked array");
            entry_points.append(&mut opts.entry_points);
            opts.entry_points = entry_points;
        }
        Some(other) => {
            return Err(err(format!("entryPoints must be an array, got {other}")));
        }
        None if !server => {
            return Err(err(
                "entryPoints is required in the client section of the config",
            ));
        }
        None => {}
    }

    match conf.get("external") {
        None => {}
        Some(Value::Array(_)) => {
            let mut external = string_list(conf, "external")?.expect("checked array");
            external.append(&mut opts.external);
            opts.external = external;
        }
        Some(other) => return Err(err(format!("external must be an array, got {other}"))),
    }

    match conf.get("write") {
        None | Some(Value::Bool(true)) => {}
        Some(Value::Bool(false)) => opts.write = false,
        Some(other) => return Err(err(format!("invalid type for write: {other}"))),
    }

    match conf.get("format").and_then(Value::as_str) {
        Some("cjs") => return Err(err("CommonJS output format is not supported")),
        Some("esm") => return Err(err("ESM output format is not supported")),
        _ => opts.format = Format::Iife,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_client_config() {
        let opts = Options::from_json(r#"{"client": {"entryPoints": ["src/app.js"]}}"#, "build")
            .expect("valid config");
        assert_eq!(opts.client.entry_points, ["src/app.js"]);
        assert_eq!(opts.client.outfile, "client.bundle.js");
        assert_eq!(opts.server.outfile, "server.bundle.js");
        assert!(opts.client.bundle);
        assert!(opts.client.minify_syntax);
        assert_eq!(opts.server.external, ["sqljoy-runtime"]);
    }

    #[test]
    fn entry_points_required_for_client() {
        let result = Options::from_json(r#"{"client": {}}"#, "build");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("entryPoints is required")
        );
    }

    #[test]
    fn invalid_log_level() {
        let result = Options::from_json(
            r#"{"logLevel": "verbose", "client": {"entryPoints": ["a.js"]}}"#,
            "build",
        );
        assert!(
            result
                .unwrap_err()
                .to_string()
                .starts_with("Invalid log level:")
        );
    }

    #[test]
    fn rejected_bundler_options() {
        for conf in [
            r#"{"client": {"entryPoints": ["a.js"], "define": {}}}"#,
            r#"{"client": {"entryPoints": ["a.js"], "inject": []}}"#,
            r#"{"client": {"entryPoints": ["a.js"], "bundle": true}}"#,
            r#"{"client": {"entryPoints": ["a.js"], "platform": "node"}}"#,
            r#"{"client": {"entryPoints": ["a.js"], "format": "cjs"}}"#,
            r#"{"client": {"entryPoints": ["a.js"], "format": "esm"}}"#,
            r#"{"client": {"entryPoints": ["a.js"], "treeShaking": "full"}}"#,
        ] {
            assert!(Options::from_json(conf, "build").is_err(), "{conf}");
        }
    }

    #[test]
    fn minify_object_form() {
        let opts = Options::from_json(
            r#"{"client": {"entryPoints": ["a.js"], "minify": {"minifyIdentifiers": false}}}"#,
            "build",
        )
        .expect("valid config");
        assert!(opts.client.minify_syntax);
        assert!(opts.client.minify_whitespace);
        assert!(!opts.client.minify_identifiers);
    }

    #[test]
    fn env_defines_are_raw_json() {
        let opts = Options::from_json(
            r#"{"accountId": "acct_1", "env": {"DEBUG": true, "NAME": "x"},
                "client": {"entryPoints": ["a.js"]}}"#,
            "build",
        )
        .expect("valid config");
        assert_eq!(opts.client.define["DEBUG"], "true");
        assert_eq!(opts.client.define["NAME"], "\"x\"");
        assert_eq!(opts.client.define["ENV_ACCOUNT_ID"], "\"acct_1\"");
    }
}
