//! `sjc`: configuration loading and dispatch for the sqljoy build.
//!
//! The compiler core runs behind a host bundler's compile hook; this
//! binary owns the user-facing side: reading `fsconfig.json`, validating
//! it, and handing the options to the build. Exit code 1 on configuration
//! or build errors.

use clap::{Arg, ArgAction, Command};
use sqljoy_compiler::Options;

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_name("PATH")
        .help("Configuration file (default fsconfig.json, or fsconfig.debug.json when DEBUG is set)")
}

fn cli() -> Command {
    Command::new("sjc")
        .about("Compile tagged SQL templates into secure client/server bundles")
        .arg(config_arg().global(true))
        .arg(
            Arg::new("no-summary")
                .long("no-summary")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Don't print the output file summary"),
        )
        .subcommand(Command::new("build").about("Build the client and server bundles"))
        .subcommand(Command::new("deploy").about("Build and deploy"))
        .subcommand(Command::new("watch").about("Rebuild on change"))
        .subcommand(Command::new("version").about("Print the version"))
}

fn default_config_file() -> &'static str {
    if std::env::var_os("DEBUG").is_some_and(|v| !v.is_empty()) {
        "fsconfig.debug.json"
    } else {
        "fsconfig.json"
    }
}

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let matches = cli().get_matches();
    let (cmd, matches) = match matches.subcommand() {
        Some((cmd, sub)) => (cmd, sub),
        None => ("build", &matches),
    };

    if cmd == "version" {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return 0;
    }

    let config_file = matches
        .get_one::<String>("config")
        .map(|s| s.to_string())
        .unwrap_or_else(|| default_config_file().to_string());

    let config_text = match std::fs::read_to_string(&config_file) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("cannot read config file {config_file:?}: {err}");
            return 1;
        }
    };

    let mut options = match Options::from_json(&config_text, cmd) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("config error: {err}");
            return 1;
        }
    };
    if cmd == "watch" {
        options.watch = true;
    }
    options.no_summary = matches.get_flag("no-summary");

    // The bundler is a host concern: the compiler transforms the parsed
    // module graph the bundler hands to its compile hook. This binary
    // validates the configuration; producing bundles requires an embedding
    // that links a bundler behind `sqljoy_compiler::Bundler`.
    eprintln!(
        "error: no bundler backend is linked into this sjc binary; \
         embed sqljoy-compiler behind your bundler's compile hook"
    );
    1
}
