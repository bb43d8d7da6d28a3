//! `shipyard/v1beta10` manifest model, the current version.
//!
//! Sync moves from a flat map to explicit rules that preserve the directory
//! structure below `strip`. Docker artifacts gain `networkMode`.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use super::v1beta9::{
    BazelArtifact, DeployConfig, EnvTemplateTagger, GitTagger, HelmDeploy, HelmRelease, KubectlDeploy,
    ShaTagger, TagPolicy, TestCase,
};

pub const VERSION: &str = "shipyard/v1beta10";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test: Vec<TestCase>,
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<Profile>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_policy: Option<TagPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Artifact {
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<ArtifactSync>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bazel: Option<BazelArtifact>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactSync {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual: Vec<SyncRule>,
}

/// Copies files matching `src` into `dest`, keeping their path below `strip`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncRule {
    pub src: String,
    pub dest: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub strip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DockerArtifact {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dockerfile: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub build_args: BTreeMap<String, Option<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cache_from: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test: Vec<TestCase>,
    #[serde(default)]
    pub deploy: DeployConfig,
}
