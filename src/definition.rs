//! Schema nodes and the document that holds them.
//!
//! A [`Definition`] always has exactly one [`Shape`]; the JSON form is written
//! by hand so that key order is fixed and identical across runs.
use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

pub const SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";
pub const DEF_PREFIX: &str = "#/definitions/";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Boolean,
    Number,
}

/// Properties of a closed object, in declaration order.
///
/// `preferredOrder` is the key order of `properties`, so the two can never
/// disagree. `additionalProperties` is always `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectShape {
    pub properties: IndexMap<String, Definition>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// No structural constraint.
    Any,
    /// `$ref` to a key of the document's `definitions`.
    Ref(String),
    Primitive(PrimitiveKind),
    /// `type: object` with nothing else: a type outside the graph.
    Opaque,
    Array(Box<Definition>),
    Object(ObjectShape),
    /// `type: object` whose values all follow the nested definition.
    Map(Box<Definition>),
    AnyOf(Vec<Definition>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub shape: Shape,
    pub description: String,
    pub html_description: String,
    pub default: Option<String>,
    pub examples: Vec<String>,
}

/// A generated schema: a root `anyOf` over the primary type plus every
/// definition reachable from it, keyed by type name.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    pub root: Definition,
    pub definitions: BTreeMap<String, Definition>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl PrimitiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Number => "number",
        }
    }
}

impl ObjectShape {
    pub fn preferred_order(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }
}

impl Definition {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            description: String::new(),
            html_description: String::new(),
            default: None,
            examples: Vec::new(),
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(Shape::Ref(name.into()))
    }

    pub fn object(object: ObjectShape) -> Self {
        Self::new(Shape::Object(object))
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn ref_name(&self) -> Option<&str> {
        match &self.shape {
            Shape::Ref(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectShape> {
        match &self.shape {
            Shape::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn any_of(&self) -> Option<&[Definition]> {
        match &self.shape {
            Shape::AnyOf(options) => Some(options),
            _ => None,
        }
    }

    /// Collects every `$ref` target in this subtree.
    pub fn collect_refs<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match &self.shape {
            Shape::Ref(name) => {
                out.insert(name.as_str());
            }
            Shape::Array(inner) | Shape::Map(inner) => inner.collect_refs(out),
            Shape::Object(object) => {
                for def in object.properties.values() {
                    def.collect_refs(out);
                }
            }
            Shape::AnyOf(options) => {
                for def in options {
                    def.collect_refs(out);
                }
            }
            Shape::Any | Shape::Primitive(_) | Shape::Opaque => {}
        }
    }

    fn write_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        if let Shape::Ref(name) = &self.shape {
            map.serialize_entry("$ref", &format!("{DEF_PREFIX}{name}"))?;
        }
        if let Shape::Array(items) = &self.shape {
            map.serialize_entry("items", items.as_ref())?;
        }
        if let Shape::Object(object) = &self.shape {
            if !object.required.is_empty() {
                map.serialize_entry("required", &object.required)?;
            }
            if !object.properties.is_empty() {
                map.serialize_entry("properties", &object.properties)?;
                let order: Vec<&str> = object.preferred_order().collect();
                map.serialize_entry("preferredOrder", &order)?;
            }
            map.serialize_entry("additionalProperties", &false)?;
        }
        if let Shape::Map(values) = &self.shape {
            map.serialize_entry("additionalProperties", values.as_ref())?;
        }
        let ty = match &self.shape {
            Shape::Primitive(kind) => Some(kind.as_str()),
            Shape::Array(_) => Some("array"),
            Shape::Object(_) | Shape::Map(_) | Shape::Opaque => Some("object"),
            Shape::Any | Shape::Ref(_) | Shape::AnyOf(_) => None,
        };
        if let Some(ty) = ty {
            map.serialize_entry("type", ty)?;
        }
        if let Shape::AnyOf(options) = &self.shape {
            map.serialize_entry("anyOf", options)?;
        }
        if !self.description.is_empty() {
            map.serialize_entry("description", &self.description)?;
        }
        if !self.html_description.is_empty() {
            map.serialize_entry("x-intellij-html-description", &self.html_description)?;
        }
        if let Some(default) = &self.default {
            map.serialize_entry("default", default)?;
        }
        if !self.examples.is_empty() {
            map.serialize_entry("examples", &self.examples)?;
        }
        Ok(())
    }
}

impl Serialize for Definition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.write_entries(&mut map)?;
        map.end()
    }
}

impl Serialize for SchemaDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.root.write_entries(&mut map)?;
        map.serialize_entry("$schema", SCHEMA_DRAFT)?;
        map.serialize_entry("definitions", &self.definitions)?;
        map.end()
    }
}

impl SchemaDocument {
    /// Root node: a single-alternative `anyOf` referencing `primary`.
    pub fn new(primary: &str, definitions: BTreeMap<String, Definition>) -> Self {
        Self {
            root: Definition::new(Shape::AnyOf(vec![Definition::reference(primary)])),
            definitions,
        }
    }

    /// Stable text form: 2-space indentation, HTML left as is, trailing newline.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// `$ref` targets that do not resolve to a key of `definitions`.
    pub fn dangling_refs(&self) -> Vec<&str> {
        let mut refs = BTreeSet::new();
        self.root.collect_refs(&mut refs);
        for def in self.definitions.values() {
            def.collect_refs(&mut refs);
        }
        refs.into_iter().filter(|name| !self.definitions.contains_key(*name)).collect()
    }
}
