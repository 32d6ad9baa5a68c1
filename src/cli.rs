//! CLI: schema → annotated Python declarations.
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use json_typesmith::{Diagnostic, FieldCase, Response, Settings, Severity, convert_str};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate typed declarations from a JSON Schema (2020-12) document
#[derive(Parser, Debug)]
#[command(name = "json-typesmith", version)]
pub struct CommandLineInterface {
    /// log resolver decisions to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// convert a schema and write the generated module
    Generate(GenerateOut),
    /// convert a schema and only report diagnostics
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct ConvertSettings {
    /// schema file, or '-' for stdin
    input: PathBuf,

    /// name the root type is bound to
    #[arg(long, default_value = "Model")]
    root_type: String,

    /// how property keys become field identifiers
    #[arg(long, value_enum, default_value_t = FieldCase::Preserve)]
    field_case: FieldCase,

    /// module providing the non-`annotated_types` constraint helpers
    #[arg(long, default_value = "schema_constraints")]
    runtime_module: String,

    /// maximum schema nesting depth
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// ignore `title` when naming declarations
    #[arg(long)]
    no_titles: bool,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    settings: ConvertSettings,

    /// output .py file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// overwrite an existing output file
    #[arg(long)]
    force: bool,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    settings: ConvertSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ConvertSettings {
    fn to_settings(&self) -> Settings {
        Settings::default()
            .with_root_name(self.root_type.clone())
            .with_field_case(self.field_case)
            .with_runtime_module(self.runtime_module.clone())
            .with_max_depth(self.max_depth)
            .with_titles(!self.no_titles)
    }

    fn convert(&self) -> anyhow::Result<Response> {
        let text = read_input(&self.input)?;
        let response = convert_str(&text, &self.to_settings())
            .with_context(|| format!("failed to convert {}", self.input.display()))?;
        Ok(response)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Returns `true` when no error-severity diagnostic was raised.
    pub fn run(&self) -> anyhow::Result<bool> {
        match &self.cmd {
            Command::Generate(target) => {
                if let Some(out) = target.out.as_ref() {
                    if out.exists() && !target.force {
                        bail!("{} already exists; pass --force to overwrite", out.display());
                    }
                }
                let response = target.settings.convert()?;
                report(response.diagnostics());
                let ok = !response.has_errors();
                match target.out.as_ref() {
                    Some(out) => write_output(out, response.source())?,
                    None => print!("{}", response.source()),
                }
                Ok(ok)
            }
            Command::Check(target) => {
                let response = target.settings.convert()?;
                report(response.diagnostics());
                if response.is_clean() {
                    eprintln!("{} {}", "ok".green().bold(), target.settings.input.display());
                }
                Ok(!response.has_errors())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("failed to read schema from stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_output(out: &Path, source: &str) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, source).with_context(|| format!("failed to write {}", out.display()))
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let level = match diagnostic.severity {
            Severity::Warning => "warning".yellow().bold(),
            Severity::Error => "error".red().bold(),
        };
        eprintln!("{level}: {} {}", diagnostic.message, diagnostic.pointer.dimmed());
    }
}
