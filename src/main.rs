//! Stencil CLI
//!
//! Usage:
//!   stencil [OPTIONS] <GROUP_FILE> <TEMPLATE>
//!
//! Options:
//!   -a, --attributes <FILE>  Attribute values (TOML format)
//!   -i, --import <FILE>      Group file to import (repeatable, searched in order)
//!   -c, --config <FILE>      Engine configuration (TOML format)
//!   --trace                  Log template enter/exit at trace level
//!   --pretty                 Print diagnostics as annotated reports
//!   --strict                 Exit with status 2 when any diagnostic was reported
//!   -h, --help               Print help

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use stencil::config::load_attributes;
use stencil::{Diagnostic, DiagnosticSink, EngineConfig, Group, GroupError};

#[derive(Parser)]
#[command(name = "stencil")]
#[command(about = "Render a template from a template group")]
struct Cli {
    /// Group file defining the templates
    group: PathBuf,

    /// Name of the template to render
    template: String,

    /// Attribute values (TOML format)
    #[arg(short, long)]
    attributes: Option<PathBuf>,

    /// Group file to import; may be given several times
    #[arg(short, long = "import")]
    imports: Vec<PathBuf>,

    /// Engine configuration (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log template enter/exit events (use RUST_LOG=trace to see them)
    #[arg(long)]
    trace: bool,

    /// Print diagnostics as annotated reports
    #[arg(long)]
    pretty: bool,

    /// Exit with status 2 when any diagnostic was reported
    #[arg(long)]
    strict: bool,
}

/// Prints each diagnostic to stderr as it is reported
struct StderrSink {
    pretty: bool,
    count: usize,
}

impl DiagnosticSink for StderrSink {
    fn receive(&mut self, diagnostic: Diagnostic) {
        self.count += 1;
        if self.pretty {
            eprint!("{}", diagnostic.report());
        } else {
            eprintln!("{}", diagnostic);
        }
    }
}

fn main() {
    env_logger::Builder::from_default_env().init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    if cli.trace {
        config = config.with_trace(true);
    }

    // Load imported groups
    let mut imports = Vec::new();
    for path in &cli.imports {
        imports.push(Arc::new(load_group(path, &config)));
    }

    let mut group = load_group(&cli.group, &config);
    for import in imports {
        group.import(import);
    }
    let group = Arc::new(group);

    // Bind attributes
    let attributes = match &cli.attributes {
        Some(path) => match load_attributes(path) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("Error loading attributes '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Default::default(),
    };

    let Some(mut instance) = group.instance_of(&cli.template) else {
        eprintln!("Error: no such template: {}", cli.template);
        std::process::exit(1);
    };
    for (name, value) in attributes {
        if let Err(e) = instance.bind(&name, value) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    let mut sink = StderrSink {
        pretty: cli.pretty,
        count: 0,
    };
    let output = instance.render(&mut sink);
    println!("{}", output);

    if cli.strict && sink.count > 0 {
        std::process::exit(2);
    }
}

fn load_group(path: &Path, config: &EngineConfig) -> Group {
    let source = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    };

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "group".to_string());

    match Group::from_source_with_config(name, &source, config.clone()) {
        Ok(group) => group,
        Err(e) => {
            report_group_error(&e, path);
            std::process::exit(1);
        }
    }
}

fn report_group_error(error: &GroupError, path: &Path) {
    match error {
        GroupError::Duplicate { .. } => eprintln!("Error in '{}': {}", path.display(), error),
        _ => eprint!("{}", error.format(&path.display().to_string())),
    }
}
