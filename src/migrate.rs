//! Manifest upgrades between consecutive versions.
//!
//! Each step converts one version into its successor by deep-copying the
//! sections that did not change through their serialized form and rewriting
//! the ones that did. [`upgrade_to_latest`] folds the steps over the version
//! chain.
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::{Header, v1beta9, v1beta10};
use crate::path_de::{PathError, from_value_with_path, from_yaml_str_with_path};
use crate::versions;

pub mod sync;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Manifest section converted through its serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Build,
    Test,
    Deploy,
    Profiles,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Build => "build config",
            Section::Test => "test config",
            Section::Deploy => "deploy config",
            Section::Profiles => "profiles",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("converting {section}: {source}")]
    Convert {
        section: Section,
        #[source]
        source: PathError,
    },
    #[error("parsing manifest: {0}")]
    Parse(#[source] PathError),
    #[error("unknown apiVersion `{0}`")]
    UnknownVersion(String),
    #[error("`{0}` is already the latest version")]
    AlreadyLatest(String),
}

/// Non-fatal outcome of an upgrade the user should review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Sync patterns whose copied layout will change.
    SyncSemantics { patterns: Vec<String> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SyncSemantics { patterns } => write!(
                f,
                "The semantics of sync has changed, the folder structure is no longer flattened but \
                 preserved (see the sync.manual rules and their `strip` option). The likely impacted \
                 patterns in your manifest are: {}",
                patterns.join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upgraded<T> {
    pub config: T,
    pub warnings: Vec<Warning>,
}

impl<T> Upgraded<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Upgraded<U> {
        Upgraded { config: f(self.config), warnings: self.warnings }
    }
}

/// A parsed manifest of any supported version.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyConfig {
    V1beta9(v1beta9::Config),
    V1beta10(v1beta10::Config),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl AnyConfig {
    /// Reads the `apiVersion` header, then parses the whole document with
    /// that version's model.
    pub fn parse(src: &str) -> Result<Self, MigrateError> {
        let header: Header = from_yaml_str_with_path(src).map_err(MigrateError::Parse)?;
        match header.api_version.as_str() {
            v1beta9::VERSION => from_yaml_str_with_path(src).map(AnyConfig::V1beta9),
            v1beta10::VERSION => from_yaml_str_with_path(src).map(AnyConfig::V1beta10),
            other => return Err(MigrateError::UnknownVersion(other.to_string())),
        }
        .map_err(MigrateError::Parse)
    }

    pub fn api_version(&self) -> &str {
        match self {
            AnyConfig::V1beta9(c) => &c.api_version,
            AnyConfig::V1beta10(c) => &c.api_version,
        }
    }

    /// True for the last entry of [`versions::SCHEMA_VERSIONS`].
    pub fn is_latest(&self) -> bool {
        versions::find(self.api_version()).is_some_and(|v| v.next().is_none())
    }

    /// Converts to the next version.
    pub fn upgrade(&self) -> Result<Upgraded<AnyConfig>, MigrateError> {
        match self {
            AnyConfig::V1beta9(c) => Ok(c.upgrade()?.map(AnyConfig::V1beta10)),
            AnyConfig::V1beta10(c) => Err(MigrateError::AlreadyLatest(c.api_version.clone())),
        }
    }
}

/// Upgrades a manifest document step by step to the latest version.
///
/// Warnings of every step are kept in order. A manifest that is already on
/// the latest version comes back unchanged and without warnings.
pub fn upgrade_to_latest(src: &str) -> Result<Upgraded<v1beta10::Config>, MigrateError> {
    let mut config = AnyConfig::parse(src)?;
    let mut warnings = Vec::new();
    while !config.is_latest() {
        let step = config.upgrade()?;
        info!(from = %config.api_version(), to = %step.config.api_version(), warnings = step.warnings.len(), "upgraded manifest");
        warnings.extend(step.warnings);
        config = step.config;
    }
    match config {
        AnyConfig::V1beta10(latest) => Ok(Upgraded { config: latest, warnings }),
        older => Err(MigrateError::UnknownVersion(older.api_version().to_string())),
    }
}

/// Deep copy between structurally compatible types of two versions.
pub fn clone_through<T, U>(value: &T, section: Section) -> Result<U, MigrateError>
where
    T: Serialize,
    U: DeserializeOwned,
{
    debug!(%section, "cloning through serialized form");
    let convert = |source| MigrateError::Convert { section, source };
    let tree = serde_json::to_value(value)
        .map_err(|err| convert(PathError { path: ".".to_string(), message: err.to_string() }))?;
    from_value_with_path(tree).map_err(convert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LEGACY: &str = r#"
apiVersion: shipyard/v1beta9
kind: Config
build:
  artifacts:
    - image: web
      context: frontend
      sync:
        "src/*.js": app/
        "app/*/*.html": out/
        "templates/***/page.html": views/
      docker:
        dockerfile: Dockerfile.dev
deploy:
  kubectl:
    manifests: ["k8s/*.yaml"]
"#;

    #[test]
    fn parse_dispatches_on_api_version() {
        let config = AnyConfig::parse(LEGACY).unwrap();
        assert_eq!(config.api_version(), v1beta9::VERSION);
        assert!(!config.is_latest());

        let err = AnyConfig::parse("apiVersion: shipyard/v0\nkind: Config\n").unwrap_err();
        assert!(matches!(err, MigrateError::UnknownVersion(v) if v == "shipyard/v0"));
    }

    #[test]
    fn parse_errors_carry_the_path() {
        let src = "apiVersion: shipyard/v1beta9\nbuild:\n  artifacts:\n    - image: web\n      colour: red\n";
        let MigrateError::Parse(err) = AnyConfig::parse(src).unwrap_err() else {
            panic!("expected a parse error");
        };
        assert!(err.path.starts_with("build.artifacts[0]"), "{}", err.path);
        assert!(err.message.contains("colour"));
    }

    #[test]
    fn upgrades_to_latest_with_one_aggregated_warning() {
        let upgraded = upgrade_to_latest(LEGACY).unwrap();
        let config = upgraded.config;
        assert_eq!(config.api_version, v1beta10::VERSION);
        assert_eq!(config.kind, "Config");

        let artifact = &config.build.artifacts[0];
        assert_eq!(artifact.context, "frontend");
        assert_eq!(artifact.docker.as_ref().unwrap().dockerfile, "Dockerfile.dev");
        let rules: Vec<_> = artifact.sync.as_ref().unwrap().manual.iter()
            .map(|r| (r.src.as_str(), r.dest.as_str(), r.strip.as_str()))
            .collect();
        assert_eq!(rules, [
            ("app/*/*.html", "out/", ""),
            ("src/*.js", "app/", "src/"),
            ("templates/**/page.html", "views/", "templates/"),
        ]);
        assert_eq!(config.deploy.kubectl.unwrap().manifests, ["k8s/*.yaml"]);

        assert_eq!(upgraded.warnings, [Warning::SyncSemantics { patterns: vec!["app/*/*.html".into()] }]);
        assert!(upgraded.warnings[0].to_string().ends_with("patterns in your manifest are: app/*/*.html"));
    }

    #[test]
    fn latest_passes_through_unchanged() {
        let src = "apiVersion: shipyard/v1beta10\nkind: Config\nbuild:\n  artifacts:\n    - image: web\n      sync:\n        manual:\n          - src: \"*.js\"\n            dest: .\n";
        let upgraded = upgrade_to_latest(src).unwrap();
        assert!(upgraded.warnings.is_empty());
        let AnyConfig::V1beta10(parsed) = AnyConfig::parse(src).unwrap() else {
            panic!("expected the latest version");
        };
        assert_eq!(upgraded.config, parsed);
        assert!(matches!(AnyConfig::V1beta10(parsed).upgrade(), Err(MigrateError::AlreadyLatest(_))));
    }

    #[test]
    fn clone_through_reports_the_section() {
        let value = serde_json::json!({ "manifests": "not-a-list" });
        let err = clone_through::<_, v1beta10::KubectlDeploy>(&value, Section::Deploy).unwrap_err();
        assert!(err.to_string().starts_with("converting deploy config: at path manifests"), "{err}");
    }
}
