use std::collections::BTreeMap;

use tracing::debug;

use super::{BuildConfig, Config, Profile};
use crate::config::v1beta10 as next;
use crate::migrate::sync::{self, Rewrite};
use crate::migrate::{MigrateError, Section, Upgraded, Warning, clone_through};

impl Config {
    /// Converts this manifest to `shipyard/v1beta10`.
    ///
    /// Sync maps become `sync.manual` rules. Patterns without an equivalent
    /// rule are kept as-is and reported in a single warning, each pattern
    /// once, in the order first seen.
    pub fn upgrade(&self) -> Result<Upgraded<next::Config>, MigrateError> {
        let mut incompatible = Vec::new();

        let build = upgrade_build(&self.build, Section::Build, &mut incompatible)?;
        let test = clone_through(&self.test, Section::Test)?;
        let deploy = clone_through(&self.deploy, Section::Deploy)?;
        let profiles = self
            .profiles
            .as_ref()
            .map(|profiles| {
                profiles
                    .iter()
                    .map(|profile| upgrade_profile(profile, &mut incompatible))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        let mut warnings = Vec::new();
        if !incompatible.is_empty() {
            warnings.push(Warning::SyncSemantics { patterns: incompatible });
        }
        let config = next::Config {
            api_version: next::VERSION.to_string(),
            kind: self.kind.clone(),
            build,
            test,
            deploy,
            profiles,
        };
        Ok(Upgraded { config, warnings })
    }
}

fn upgrade_profile(profile: &Profile, incompatible: &mut Vec<String>) -> Result<next::Profile, MigrateError> {
    Ok(next::Profile {
        name: profile.name.clone(),
        build: upgrade_build(&profile.build, Section::Profiles, incompatible)?,
        test: clone_through(&profile.test, Section::Profiles)?,
        deploy: clone_through(&profile.deploy, Section::Profiles)?,
    })
}

/// Everything but sync goes through the serialized form. Sync is cleared on a
/// copy first and set on the converted artifacts afterwards.
fn upgrade_build(
    build: &BuildConfig,
    section: Section,
    incompatible: &mut Vec<String>,
) -> Result<next::BuildConfig, MigrateError> {
    let rules: Vec<Vec<next::SyncRule>> = build
        .artifacts
        .iter()
        .map(|artifact| convert_sync(&artifact.sync, incompatible))
        .collect();

    let mut without_sync = build.clone();
    for artifact in &mut without_sync.artifacts {
        artifact.sync.clear();
    }
    let mut converted: next::BuildConfig = clone_through(&without_sync, section)?;

    for (artifact, manual) in converted.artifacts.iter_mut().zip(rules) {
        if !manual.is_empty() {
            artifact.sync = Some(next::ArtifactSync { manual });
        }
    }
    Ok(converted)
}

fn convert_sync(entries: &BTreeMap<String, String>, incompatible: &mut Vec<String>) -> Vec<next::SyncRule> {
    entries
        .iter()
        .map(|(src, dest)| {
            let Rewrite { src: rule_src, dest, strip, compatible } = sync::rewrite(src, dest);
            if !compatible && !incompatible.contains(src) {
                debug!(pattern = %src, "sync pattern relies on flattening");
                incompatible.push(src.clone());
            }
            next::SyncRule { src: rule_src, dest, strip }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::{Artifact, DockerArtifact, HelmDeploy, HelmRelease, TestCase};
    use super::*;
    use crate::config::v1beta9::{DeployConfig, VERSION};
    use pretty_assertions::assert_eq;

    fn artifact(image: &str, sync: &[(&str, &str)]) -> Artifact {
        Artifact {
            image: image.to_string(),
            sync: sync.iter().map(|(s, d)| (s.to_string(), d.to_string())).collect(),
            docker: Some(DockerArtifact { dockerfile: "Dockerfile".into(), ..Default::default() }),
            ..Default::default()
        }
    }

    fn legacy() -> Config {
        Config {
            api_version: VERSION.to_string(),
            kind: "Config".to_string(),
            build: BuildConfig {
                artifacts: vec![
                    artifact("web", &[("static/css/*.css", "static/css/"), ("app/**/*.html", "out/")]),
                    artifact("worker", &[]),
                ],
                tag_policy: None,
            },
            test: vec![TestCase { image: "web".into(), structure_tests: vec!["./test/*".into()] }],
            deploy: DeployConfig {
                helm: Some(HelmDeploy {
                    releases: vec![HelmRelease { name: "web".into(), chart_path: "chart".into(), ..Default::default() }],
                }),
                ..Default::default()
            },
            profiles: Some(vec![Profile {
                name: "dev".to_string(),
                build: BuildConfig { artifacts: vec![artifact("web", &[("a/*/b", "c/")])], tag_policy: None },
                ..Default::default()
            }]),
        }
    }

    #[test]
    fn input_is_left_untouched() {
        let before = legacy();
        let input = before.clone();
        input.upgrade().unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn sync_maps_become_manual_rules() {
        let upgraded = legacy().upgrade().unwrap().config;
        let web = &upgraded.build.artifacts[0];
        assert_eq!(
            web.sync.as_ref().unwrap().manual,
            [
                next::SyncRule { src: "app/**/*.html".into(), dest: "out/".into(), strip: String::new() },
                next::SyncRule { src: "static/css/*.css".into(), dest: ".".into(), strip: String::new() },
            ]
        );
        assert_eq!(web.docker.as_ref().unwrap().network_mode, None);
        assert_eq!(upgraded.build.artifacts[1].sync, None);
    }

    #[test]
    fn unchanged_sections_are_copied() {
        let source = legacy();
        let upgraded = source.upgrade().unwrap().config;
        assert_eq!(upgraded.api_version, next::VERSION);
        assert_eq!(upgraded.test, source.test);
        assert_eq!(upgraded.deploy, source.deploy);
    }

    #[test]
    fn profiles_are_upgraded_and_share_the_warning() {
        let upgraded = legacy().upgrade().unwrap();
        let profile = &upgraded.config.profiles.as_ref().unwrap()[0];
        assert_eq!(profile.name, "dev");
        assert_eq!(profile.build.artifacts[0].sync.as_ref().unwrap().manual[0].src, "a/*/b");
        assert_eq!(
            upgraded.warnings,
            [Warning::SyncSemantics { patterns: vec!["app/**/*.html".into(), "a/*/b".into()] }]
        );
    }

    #[test]
    fn repeated_patterns_are_reported_once() {
        let mut config = legacy();
        config.build.artifacts[1].sync.insert("app/**/*.html".into(), "www/".into());
        config.profiles.as_mut().unwrap()[0].build.artifacts[0].sync.insert("app/**/*.html".into(), "out/".into());
        let upgraded = config.upgrade().unwrap();
        assert_eq!(
            upgraded.warnings,
            [Warning::SyncSemantics { patterns: vec!["app/**/*.html".into(), "a/*/b".into()] }]
        );
        let worker = &upgraded.config.build.artifacts[1].sync.as_ref().unwrap().manual;
        assert_eq!(worker[0].dest, "www/");
    }

    #[test]
    fn compatible_manifests_have_no_warnings() {
        let mut config = legacy();
        config.build.artifacts.truncate(1);
        config.build.artifacts[0].sync.remove("app/**/*.html");
        config.profiles = None;
        let upgraded = config.upgrade().unwrap();
        assert!(upgraded.warnings.is_empty());
        assert_eq!(upgraded.config.profiles, None);
    }
}
