//! Frozen manifest models, one module per supported `apiVersion`.
//!
//! Each version is a snapshot: once a newer version exists, the older module
//! only changes through its `upgrade` step.
use serde::Deserialize;

pub mod v1beta10;
pub mod v1beta9;

/// The two header fields every manifest version shares.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
}
