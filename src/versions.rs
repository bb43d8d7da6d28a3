//! Known manifest versions, oldest first.
//!
//! Only the last (current) version is generated in strict mode.

pub const API_VERSION_PREFIX: &str = "shipyard/";

pub const SCHEMA_VERSIONS: &[&str] = &["shipyard/v1beta9", "shipyard/v1beta10"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionDescriptor {
    pub api_version: &'static str,
    pub position: usize,
    pub strict: bool,
}

impl VersionDescriptor {
    fn at(position: usize) -> Self {
        Self {
            api_version: SCHEMA_VERSIONS[position],
            position,
            strict: position + 1 == SCHEMA_VERSIONS.len(),
        }
    }

    /// Version without the tool prefix, used for file names.
    pub fn short_name(&self) -> &'static str {
        self.api_version.strip_prefix(API_VERSION_PREFIX).unwrap_or(self.api_version)
    }

    pub fn next(&self) -> Option<Self> {
        (self.position + 1 < SCHEMA_VERSIONS.len()).then(|| Self::at(self.position + 1))
    }
}

pub fn all() -> impl Iterator<Item = VersionDescriptor> {
    (0..SCHEMA_VERSIONS.len()).map(VersionDescriptor::at)
}

pub fn find(api_version: &str) -> Option<VersionDescriptor> {
    SCHEMA_VERSIONS.iter().position(|v| *v == api_version).map(VersionDescriptor::at)
}
