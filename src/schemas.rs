//! Per-version schema files: generate them all, or check they are current.
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::generator::{GenerateError, generate};
use crate::typegraph::{ReadError, TypeGraph};
use crate::versions::{self, VersionDescriptor};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Overwrite stale schema files.
    Write,
    /// Compare only; nothing is written.
    Check,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTarget {
    pub version: VersionDescriptor,
    /// `<types-dir>/<short>.yaml`
    pub types: PathBuf,
    /// `<out-dir>/<short>.json`
    pub output: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Written,
    /// Check mode: the file differs from the generated schema.
    Stale,
    /// Check mode: the file does not exist.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub target: SchemaTarget,
    pub outcome: Outcome,
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("generating {api_version}: {source}")]
    Generate {
        api_version: &'static str,
        #[source]
        source: GenerateError,
    },
    #[error("rendering {api_version}: {source}")]
    Render {
        api_version: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Report {
    pub fn is_current(&self) -> bool {
        matches!(self.outcome, Outcome::Unchanged | Outcome::Written)
    }
}

pub fn targets(types_dir: &Path, out_dir: &Path) -> Vec<SchemaTarget> {
    versions::all()
        .map(|version| SchemaTarget {
            version,
            types: types_dir.join(format!("{}.yaml", version.short_name())),
            output: out_dir.join(format!("{}.json", version.short_name())),
        })
        .collect()
}

/// Generates the schema text of one version.
pub fn render(target: &SchemaTarget) -> Result<String, SchemaError> {
    let api_version = target.version.api_version;
    let graph = TypeGraph::read(&target.types)?;
    let document = generate(&graph, target.version.strict)
        .map_err(|source| SchemaError::Generate { api_version, source })?;
    document.to_json().map_err(|source| SchemaError::Render { api_version, source })
}

/// Processes every version concurrently. Reports come back in version order.
pub fn run(types_dir: &Path, out_dir: &Path, mode: Mode) -> Result<Vec<Report>, SchemaError> {
    targets(types_dir, out_dir)
        .into_par_iter()
        .map(|target| process(target, mode))
        .collect()
}

fn process(target: SchemaTarget, mode: Mode) -> Result<Report, SchemaError> {
    let generated = render(&target)?;
    let existing = match std::fs::read_to_string(&target.output) {
        Ok(text) => Some(text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(source) => return Err(SchemaError::Io { path: target.output.clone(), source }),
    };
    let same = existing.as_deref().is_some_and(|text| normalize(text) == normalize(&generated));
    debug!(version = target.version.api_version, same, "compared schema");

    let outcome = match (same, mode, existing.is_some()) {
        (true, _, _) => Outcome::Unchanged,
        (false, Mode::Check, true) => Outcome::Stale,
        (false, Mode::Check, false) => Outcome::Missing,
        (false, Mode::Write, _) => {
            write_file(&target.output, &generated)?;
            info!(path = %target.output.display(), "wrote schema");
            Outcome::Written
        }
    };
    Ok(Report { target, outcome })
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
}

fn write_file(path: &Path, contents: &str) -> Result<(), SchemaError> {
    let io = |source| SchemaError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::write(path, contents).map_err(io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_follow_the_version_table() {
        let targets = targets(Path::new("types"), Path::new("out"));
        let files: Vec<_> = targets.iter().map(|t| (t.types.clone(), t.output.clone())).collect();
        assert_eq!(files, [
            (PathBuf::from("types/v1beta9.yaml"), PathBuf::from("out/v1beta9.json")),
            (PathBuf::from("types/v1beta10.yaml"), PathBuf::from("out/v1beta10.json")),
        ]);
        assert!(targets[1].version.strict);
    }

    #[test]
    fn line_endings_do_not_count_as_changes() {
        assert_eq!(normalize("{\r\n}\r\n"), normalize("{\n}\n"));
    }
}
