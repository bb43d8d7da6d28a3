//! CLI: schema (generate | check) and upgrade.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::migrate::upgrade_to_latest;
use crate::schemas::{self, Mode, Outcome};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate versioned manifest schemas and upgrade manifests to the latest version
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    /// more logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// regenerate (or check) the JSON schema of every manifest version
    Schema(SchemaOut),
    /// upgrade manifests to the latest apiVersion
    Upgrade(UpgradeOut),
}

#[derive(Args, Debug)]
struct SchemaOut {
    /// directory holding one `<version>.yaml` type graph per version
    #[arg(long, default_value = "schemas/types")]
    types_dir: PathBuf,

    /// directory receiving one `<version>.json` schema per version
    #[arg(long, default_value = "schemas")]
    out_dir: PathBuf,

    /// only verify the schema files are current; exit non-zero otherwise
    #[arg(long)]
    check: bool,
}

#[derive(Args, Debug)]
struct UpgradeOut {
    /// One or more manifests. May be literal paths or quoted glob patterns
    #[arg(num_args = 1.., required = true)]
    input: Vec<String>,

    /// output file (stdout if omitted); needs a single input
    #[arg(short, long, conflicts_with = "in_place")]
    out: Option<PathBuf>,

    /// rewrite each input file
    #[arg(long)]
    in_place: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match self.verbose {
            0 => EnvFilter::new("warn,manifest_schema=info"),
            1 => EnvFilter::new("warn,manifest_schema=debug"),
            _ => EnvFilter::new("warn,manifest_schema=trace"),
        });
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    pub fn run(&self) -> anyhow::Result<ExitCode> {
        match &self.cmd {
            Command::Schema(target) => target.run(),
            Command::Upgrade(target) => target.run(),
        }
    }
}

impl SchemaOut {
    fn run(&self) -> anyhow::Result<ExitCode> {
        let mode = if self.check { Mode::Check } else { Mode::Write };
        let reports = schemas::run(&self.types_dir, &self.out_dir, mode)?;
        let mut current = true;
        for report in &reports {
            let path = report.target.output.display();
            let status = match report.outcome {
                Outcome::Unchanged => "up to date".green(),
                Outcome::Written => "written".cyan(),
                Outcome::Stale => "out of date".red(),
                Outcome::Missing => "missing".red(),
            };
            println!("{:<20} {status:<12} {path}", report.target.version.api_version);
            current &= report.is_current();
        }
        if current {
            return Ok(ExitCode::SUCCESS);
        }
        eprintln!("{}", "schemas are out of date, run `manifest-schema schema` to regenerate them".yellow());
        Ok(ExitCode::FAILURE)
    }
}

impl UpgradeOut {
    fn run(&self) -> anyhow::Result<ExitCode> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        if self.out.is_some() && source_paths.len() > 1 {
            bail!("--out takes a single input, got {}", source_paths.len());
        }
        let mut documents = Vec::with_capacity(source_paths.len());
        for source_path in &source_paths {
            let upgraded = upgrade_file(source_path)?;
            if self.in_place {
                std::fs::write(source_path, &upgraded)
                    .with_context(|| format!("failed to write {}", source_path.display()))?;
                info!(path = %source_path.display(), "upgraded in place");
            } else {
                documents.push(upgraded);
            }
        }
        match self.out.as_ref() {
            _ if self.in_place => {}
            Some(out) => {
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(out, documents.concat())
                    .with_context(|| format!("failed to write {}", out.display()))?;
            }
            None => print!("{}", documents.join("---\n")),
        }
        Ok(ExitCode::SUCCESS)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn upgrade_file(path: &Path) -> anyhow::Result<String> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let upgraded = upgrade_to_latest(&source).with_context(|| format!("failed to upgrade {}", path.display()))?;
    for warning in &upgraded.warnings {
        warn!(path = %path.display(), "{warning}");
    }
    serde_yaml::to_string(&upgraded.config).with_context(|| format!("failed to render {}", path.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
            out.push(entry?);
        }
        if out.len() == before {
            bail!("glob pattern matched no files: {pattern}");
        }
    }
    Ok(out)
}
