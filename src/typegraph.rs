//! Type graph reader.
//!
//! A type graph is the declared shape of one manifest version: an ordered list
//! of named types, each either a record with fields or an alias of another type
//! expression. The first declared type is the primary (root) type of the graph.
//!
//! Graphs are read from YAML (JSON is accepted too):
//!
//! ```yaml
//! types:
//!   - name: Config
//!     doc: Config holds the fields parsed from the manifest.
//!     fields:
//!       - name: ApiVersion
//!         type: String
//!         tag: "apiVersion,required"
//!         doc: ApiVersion is the version of the configuration.
//!   - name: Tag
//!     type: String
//! ```
pub mod tag;
pub mod ty;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use tag::{FieldTag, TagError};
pub use ty::{Primitive, TypeRef, TypeRefError};

use crate::path_de::{from_yaml_str_with_path, PathError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// One structural field of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeField {
    /// Declared identifier, used for documentation checks.
    pub name: String,
    /// External key; empty or `-` when the field is not serialized.
    pub serialized_name: String,
    pub type_ref: TypeRef,
    pub doc_text: String,
    pub is_required: bool,
    pub is_inline: bool,
    pub one_of_group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    Record(Vec<TypeField>),
    Alias(TypeRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub doc_text: String,
    pub shape: TypeShape,
}

/// A resolved type graph, passed explicitly to the generator.
#[derive(Debug, Clone)]
pub struct TypeGraph {
    decls: Vec<TypeDecl>,
    index: HashMap<String, usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read type graph {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed type graph {origin}: {source}")]
    Syntax {
        origin: String,
        #[source]
        source: PathError,
    },
    #[error("type graph {origin} declares no types")]
    Empty { origin: String },
    #[error("type graph {origin}: type `{name}` is declared more than once")]
    Duplicate { origin: String, name: String },
    #[error("type graph {origin}: type `{name}` must declare either fields or a type, not both")]
    AmbiguousShape { origin: String, name: String },
}

// ————————————————————————————————————————————————————————————————————————————
// RAW FORMAT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGraph {
    types: Vec<RawType>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawType {
    name: String,
    #[serde(default)]
    doc: String,
    #[serde(default)]
    fields: Option<Vec<RawField>>,
    #[serde(rename = "type", default)]
    alias: Option<TypeRef>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    type_ref: TypeRef,
    #[serde(default)]
    tag: FieldTag,
    #[serde(default)]
    doc: String,
}

impl From<RawField> for TypeField {
    fn from(raw: RawField) -> Self {
        TypeField {
            name: raw.name,
            serialized_name: raw.tag.serialized_name,
            type_ref: raw.type_ref,
            doc_text: raw.doc,
            is_required: raw.tag.required,
            is_inline: raw.tag.inline,
            one_of_group: raw.tag.one_of,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeField {
    /// Empty and `-` names are not serialized.
    pub fn is_serialized(&self) -> bool {
        !self.serialized_name.is_empty() && self.serialized_name != "-"
    }
}

impl TypeDecl {
    pub fn fields(&self) -> &[TypeField] {
        match &self.shape {
            TypeShape::Record(fields) => fields,
            TypeShape::Alias(_) => &[],
        }
    }
}

impl TypeGraph {
    /// Builds a graph from declarations; the first one is the primary type.
    pub fn new(decls: Vec<TypeDecl>, origin: &str) -> Result<Self, ReadError> {
        if decls.is_empty() {
            return Err(ReadError::Empty { origin: origin.to_string() });
        }
        let mut index = HashMap::with_capacity(decls.len());
        for (i, decl) in decls.iter().enumerate() {
            if index.insert(decl.name.clone(), i).is_some() {
                return Err(ReadError::Duplicate {
                    origin: origin.to_string(),
                    name: decl.name.clone(),
                });
            }
        }
        Ok(Self { decls, index })
    }

    /// Parses a YAML or JSON type graph; `origin` names the input in errors.
    pub fn parse(src: &str, origin: &str) -> Result<Self, ReadError> {
        let raw: RawGraph = from_yaml_str_with_path(src).map_err(|source| ReadError::Syntax {
            origin: origin.to_string(),
            source,
        })?;
        let decls = raw
            .types
            .into_iter()
            .map(|t| {
                let shape = match (t.fields, t.alias) {
                    (Some(_), Some(_)) => {
                        return Err(ReadError::AmbiguousShape {
                            origin: origin.to_string(),
                            name: t.name,
                        });
                    }
                    (None, Some(alias)) => TypeShape::Alias(alias),
                    (fields, None) => {
                        TypeShape::Record(fields.unwrap_or_default().into_iter().map(TypeField::from).collect())
                    }
                };
                Ok(TypeDecl { name: t.name, doc_text: t.doc, shape })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(decls, origin)
    }

    pub fn read(path: &Path) -> Result<Self, ReadError> {
        let src = std::fs::read_to_string(path).map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&src, &path.display().to_string())
    }

    pub fn primary(&self) -> &TypeDecl {
        &self.decls[0]
    }

    pub fn get(&self, name: &str) -> Option<&TypeDecl> {
        self.index.get(name).map(|&i| &self.decls[i])
    }

    /// Declarations in declaration order.
    pub fn decls(&self) -> &[TypeDecl] {
        &self.decls
    }
}
