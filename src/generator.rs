//! Schema generation from a type graph.
//!
//! Two passes:
//! 1. every declaration becomes a plain [`Definition`]; records that embed
//!    inline fields also leave a [`Layout`] in a side table, listing their
//!    properties and inline sources in declaration order;
//! 2. [`compose`] splices non-grouped inline sources into their owners and
//!    turns owners of `oneOf` groups into `anyOf` nodes.
//!
//! Only types reachable from the primary type through `$ref` end up in the
//! document, so types consumed purely as inline sources disappear.
pub mod compose;
pub mod docs;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use indexmap::IndexMap;
use tracing::{debug, debug_span};

use crate::definition::{Definition, ObjectShape, PrimitiveKind, SchemaDocument, Shape};
use crate::typegraph::{Primitive, TypeDecl, TypeGraph, TypeRef, TypeShape};

pub use docs::{Violation, ViolationKind, Violations};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("type `{owner}` refers to undeclared type `{name}`")]
    UnknownType { owner: String, name: String },
    #[error("inline field `{owner}.{field}` must have a declared type, found `{found}`")]
    InlineNotNamed { owner: String, field: String, found: String },
    #[error("type `{source_name}` is inlined into `{owner}` but is not a record")]
    InlineNotRecord { owner: String, source_name: String },
    #[error("inline cycle through type `{0}`")]
    InlineCycle(String),
    #[error("type `{owner}` declares property `{key}` more than once")]
    DuplicateProperty { owner: String, key: String },
    #[error("{0}")]
    Documentation(Violations),
}

/// One slot of a record that embeds inline fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Property(String),
    Inline(String),
}

/// Declaration-order slots of a record with inline fields.
pub type Layout = Vec<Slot>;

/// Pass-1 output: plain definitions plus the inline side table.
#[derive(Debug, Default)]
pub struct Pass1 {
    pub definitions: IndexMap<String, Definition>,
    pub layouts: HashMap<String, Layout>,
    pub violations: Vec<Violation>,
}

/// Generates the schema document of `graph`.
///
/// With `strict`, every documentation violation is collected and returned as
/// [`GenerateError::Documentation`] instead of a document.
pub fn generate(graph: &TypeGraph, strict: bool) -> Result<SchemaDocument, GenerateError> {
    let primary = graph.primary().name.clone();
    let _span = debug_span!("generate", primary = %primary, strict).entered();

    let pass1 = SchemaGenerator { graph, strict }.run()?;
    if !pass1.violations.is_empty() {
        return Err(GenerateError::Documentation(Violations(pass1.violations)));
    }
    let composed = compose::compose(graph, pass1.definitions, &pass1.layouts)?;
    let definitions = reachable(&primary, composed);
    Ok(SchemaDocument::new(&primary, definitions))
}

struct SchemaGenerator<'g> {
    graph: &'g TypeGraph,
    strict: bool,
}

impl SchemaGenerator<'_> {
    fn run(&self) -> Result<Pass1, GenerateError> {
        let mut out = Pass1::default();
        for decl in self.graph.decls() {
            debug!(type_name = %decl.name, "building definition");
            let def = self.declaration(decl, &mut out)?;
            out.definitions.insert(decl.name.clone(), def);
        }
        Ok(out)
    }

    fn declaration(&self, decl: &TypeDecl, out: &mut Pass1) -> Result<Definition, GenerateError> {
        let def = match &decl.shape {
            TypeShape::Alias(type_ref) => self.type_definition(&decl.name, type_ref)?,
            TypeShape::Record(fields) => {
                let mut object = ObjectShape::default();
                let mut layout = Layout::new();
                let mut has_inline = false;
                for field in fields {
                    if field.is_inline {
                        let source = field.type_ref.named().ok_or_else(|| GenerateError::InlineNotNamed {
                            owner: decl.name.clone(),
                            field: field.name.clone(),
                            found: field.type_ref.to_string(),
                        })?;
                        self.require_declared(&decl.name, source)?;
                        layout.push(Slot::Inline(source.to_string()));
                        has_inline = true;
                        continue;
                    }
                    if !field.is_serialized() {
                        continue;
                    }
                    let key = field.serialized_name.clone();
                    if object.properties.contains_key(&key) {
                        return Err(GenerateError::DuplicateProperty { owner: decl.name.clone(), key });
                    }
                    if field.is_required {
                        object.required.push(key.clone());
                    }
                    let def = self.type_definition(&decl.name, &field.type_ref)?;
                    let def = self.documented(def, &decl.name, &field.name, &field.doc_text, out);
                    object.properties.insert(key.clone(), def);
                    layout.push(Slot::Property(key));
                }
                if has_inline {
                    out.layouts.insert(decl.name.clone(), layout);
                }
                Definition::object(object)
            }
        };
        Ok(self.documented(def, &decl.name, &decl.name, &decl.doc_text, out))
    }

    fn require_declared(&self, owner: &str, name: &str) -> Result<(), GenerateError> {
        match self.graph.get(name) {
            Some(_) => Ok(()),
            None => Err(GenerateError::UnknownType { owner: owner.to_string(), name: name.to_string() }),
        }
    }

    /// Fixed mapping of a type expression, with structural defaults.
    fn type_definition(&self, owner: &str, type_ref: &TypeRef) -> Result<Definition, GenerateError> {
        Ok(match type_ref {
            TypeRef::Primitive(Primitive::String) => Definition::new(Shape::Primitive(PrimitiveKind::String)),
            TypeRef::Primitive(Primitive::Bool) => {
                Definition::new(Shape::Primitive(PrimitiveKind::Boolean)).with_default("false")
            }
            TypeRef::Primitive(Primitive::Integer) => Definition::new(Shape::Primitive(PrimitiveKind::Number)),
            TypeRef::Named(name) => {
                self.require_declared(owner, name)?;
                Definition::reference(name.as_str())
            }
            TypeRef::Opaque(_) => Definition::new(Shape::Opaque),
            TypeRef::Array(elem) => {
                let items = self.type_definition(owner, elem)?;
                let structural = items.ref_name().is_none();
                let def = Definition::new(Shape::Array(Box::new(items)));
                if structural { def.with_default("[]") } else { def }
            }
            TypeRef::Map(value) => {
                let values = self.type_definition(owner, value)?;
                Definition::new(Shape::Map(Box::new(values))).with_default("{}")
            }
        })
    }

    fn documented(&self, mut def: Definition, owner: &str, name: &str, raw: &str, out: &mut Pass1) -> Definition {
        let info = docs::extract(name, raw);
        if self.strict {
            out.violations.extend(docs::check(owner, name, raw, &info));
        }
        if info.default.is_some() {
            def.default = info.default;
        }
        def.examples = info.example.into_iter().collect();
        def.description = info.description;
        def.html_description = info.html_description;
        def
    }
}

/// Keeps the definitions reachable from `primary`, keyed by name.
fn reachable(primary: &str, mut all: IndexMap<String, Definition>) -> BTreeMap<String, Definition> {
    let mut seen = BTreeSet::new();
    let mut queue = vec![primary.to_string()];
    while let Some(name) = queue.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(def) = all.get(&name) {
            let mut refs = BTreeSet::new();
            def.collect_refs(&mut refs);
            queue.extend(refs.into_iter().filter(|r| !seen.contains(*r)).map(str::to_string));
        }
    }
    all.retain(|name, _| {
        let keep = seen.contains(name);
        if !keep {
            debug!(type_name = %name, "dropping unreferenced definition");
        }
        keep
    });
    all.into_iter().collect()
}
