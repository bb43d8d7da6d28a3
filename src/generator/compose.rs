//! Inline and `oneOf` composition (pass 2).
//!
//! For every record with a [`Layout`]:
//! - non-grouped inline sources are spliced in at their declared position, as
//!   if their fields had been declared directly;
//! - sources whose fields carry a `oneOf` group turn the owner into an `anyOf`
//!   node: the first alternative is the owner's merged properties, followed by
//!   one alternative per grouped field, each being the first alternative plus
//!   exactly that field;
//! - a source that is itself an `anyOf` (a grouped source inlined one level
//!   down) carries its alternatives up to the owner.
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use super::{GenerateError, Layout, Slot};
use crate::definition::{Definition, ObjectShape, Shape};
use crate::typegraph::TypeGraph;

pub fn compose(
    graph: &TypeGraph,
    definitions: IndexMap<String, Definition>,
    layouts: &HashMap<String, Layout>,
) -> Result<IndexMap<String, Definition>, GenerateError> {
    let mut composer = Composer {
        graph,
        layouts,
        definitions,
        done: HashSet::new(),
        visiting: HashSet::new(),
    };
    let owners: Vec<String> = composer
        .definitions
        .keys()
        .filter(|name| layouts.contains_key(*name))
        .cloned()
        .collect();
    for owner in &owners {
        composer.resolve(owner)?;
    }
    Ok(composer.definitions)
}

struct Composer<'a> {
    graph: &'a TypeGraph,
    layouts: &'a HashMap<String, Layout>,
    definitions: IndexMap<String, Definition>,
    done: HashSet<String>,
    visiting: HashSet<String>,
}

impl Composer<'_> {
    fn resolve(&mut self, name: &str) -> Result<(), GenerateError> {
        let layouts = self.layouts;
        let Some(layout) = layouts.get(name) else {
            return Ok(());
        };
        if self.done.contains(name) {
            return Ok(());
        }
        if !self.visiting.insert(name.to_string()) {
            return Err(GenerateError::InlineCycle(name.to_string()));
        }
        for slot in layout {
            if let Slot::Inline(source) = slot {
                self.resolve(source)?;
            }
        }
        let composed = self.compose_one(name, layout)?;
        self.definitions.insert(name.to_string(), composed);
        self.visiting.remove(name);
        self.done.insert(name.to_string());
        Ok(())
    }

    /// A source is grouped when any of its serialized fields names a group.
    fn is_grouped(&self, source: &str) -> bool {
        self.graph.get(source).is_some_and(|decl| {
            decl.fields().iter().any(|f| f.is_serialized() && f.one_of_group.is_some())
        })
    }

    /// What an inline source adds to its owner. A source already composed
    /// into an `anyOf` contributes its first alternative to every option and
    /// the extra keys of each other alternative as one variant each.
    fn contribution(&self, owner: &str, source: &str) -> Result<Contribution, GenerateError> {
        let not_record = || GenerateError::InlineNotRecord {
            owner: owner.to_string(),
            source_name: source.to_string(),
        };
        let def = self.definitions.get(source).ok_or_else(not_record)?;

        if let Some(options) = def.any_of() {
            let objects: Vec<&ObjectShape> =
                options.iter().map(Definition::as_object).collect::<Option<_>>().ok_or_else(not_record)?;
            let Some((first, rest)) = objects.split_first() else {
                return Err(not_record());
            };
            let variants = rest.iter().map(|alternative| extra_keys(first, alternative)).collect();
            return Ok(Contribution { common: (*first).clone(), variants });
        }

        let object = def.as_object().ok_or_else(not_record)?;
        if !self.is_grouped(source) {
            return Ok(Contribution { common: object.clone(), variants: Vec::new() });
        }
        let variants = object
            .properties
            .iter()
            .map(|(key, def)| ObjectShape {
                properties: IndexMap::from([(key.clone(), def.clone())]),
                required: object.required.iter().filter(|r| *r == key).cloned().collect(),
            })
            .collect();
        Ok(Contribution { common: ObjectShape::default(), variants })
    }

    fn compose_one(&self, owner: &str, layout: &Layout) -> Result<Definition, GenerateError> {
        let Some(owner_def) = self.definitions.get(owner) else {
            return Err(GenerateError::UnknownType { owner: owner.to_string(), name: owner.to_string() });
        };
        let duplicate = |key: &str| GenerateError::DuplicateProperty { owner: owner.to_string(), key: key.to_string() };
        let own = owner_def.as_object().cloned().unwrap_or_default();
        let mut required: HashSet<String> = own.required.iter().cloned().collect();
        let mut base = ObjectShape::default();
        let mut variants = Vec::new();

        for slot in layout {
            match slot {
                Slot::Property(key) => {
                    if let Some(def) = own.properties.get(key) {
                        base.properties.insert(key.clone(), def.clone());
                    }
                }
                Slot::Inline(source) => {
                    let contribution = self.contribution(owner, source)?;
                    debug!(owner, source = %source, variants = contribution.variants.len(), "splicing inline source");
                    for (key, def) in contribution.common.properties {
                        if base.properties.contains_key(&key) {
                            return Err(duplicate(&key));
                        }
                        base.properties.insert(key, def);
                    }
                    required.extend(contribution.common.required);
                    variants.extend(contribution.variants);
                }
            }
        }
        base.required = base.properties.keys().filter(|k| required.contains(*k)).cloned().collect();

        if variants.is_empty() {
            return Ok(Definition { shape: Shape::Object(base), ..owner_def.clone() });
        }

        let mut options = vec![Definition::object(base.clone())];
        for variant in variants {
            let mut alternative = base.clone();
            for (key, def) in variant.properties {
                if alternative.properties.contains_key(&key) {
                    return Err(duplicate(&key));
                }
                alternative.properties.insert(key, def);
            }
            alternative.required.extend(variant.required);
            options.push(Definition::object(alternative));
        }
        Ok(Definition { shape: Shape::AnyOf(options), ..owner_def.clone() })
    }
}

/// Properties spliced into every option, plus one entry per extra option.
struct Contribution {
    common: ObjectShape,
    variants: Vec<ObjectShape>,
}

/// Keys of `alternative` that `base` lacks.
fn extra_keys(base: &ObjectShape, alternative: &ObjectShape) -> ObjectShape {
    let properties: IndexMap<String, Definition> = alternative
        .properties
        .iter()
        .filter(|(key, _)| !base.properties.contains_key(*key))
        .map(|(key, def)| (key.clone(), def.clone()))
        .collect();
    let required = alternative.required.iter().filter(|k| properties.contains_key(*k)).cloned().collect();
    ObjectShape { properties, required }
}

#[cfg(test)]
mod tests {
    use super::super::generate;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ARTIFACTS: &str = r#"
types:
  - name: Artifact
    fields:
      - name: Image
        type: String
        tag: image,required
      - name: Workspace
        type: Workspace
        tag: ",inline"
      - name: Sync
        type: Map<String>
        tag: sync
      - name: ArtifactType
        type: ArtifactType
        tag: ",inline"
  - name: Workspace
    fields:
      - name: Context
        type: String
        tag: context
      - name: Dockerfile
        type: String
        tag: dockerfile,required
  - name: ArtifactType
    fields:
      - name: Docker
        type: DockerArtifact
        tag: docker,oneOf=artifact
      - name: Bazel
        type: BazelArtifact
        tag: bazel,oneOf=artifact
  - name: DockerArtifact
    fields:
      - name: Target
        type: String
        tag: target
  - name: BazelArtifact
    fields:
      - name: Target
        type: String
        tag: target,required
"#;

    fn keys(option: &serde_json::Value) -> Vec<String> {
        option["preferredOrder"].as_array().unwrap().iter().map(|k| k.as_str().unwrap().to_string()).collect()
    }

    #[test]
    fn plain_and_grouped_inline_sources() {
        let graph = TypeGraph::parse(ARTIFACTS, "test").unwrap();
        let doc = generate(&graph, false).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        let artifact = &value["definitions"]["Artifact"];

        for absent in ["properties", "preferredOrder", "additionalProperties", "required", "type"] {
            assert!(artifact.get(absent).is_none(), "{absent} should be cleared");
        }
        let options = artifact["anyOf"].as_array().unwrap();
        assert_eq!(options.len(), 3);

        assert_eq!(keys(&options[0]), ["image", "context", "dockerfile", "sync"]);
        assert_eq!(keys(&options[1]), ["image", "context", "dockerfile", "sync", "docker"]);
        assert_eq!(keys(&options[2]), ["image", "context", "dockerfile", "sync", "bazel"]);
        for option in options {
            assert_eq!(option["additionalProperties"], json!(false));
            assert_eq!(option["required"], json!(["image", "dockerfile"]));
        }
        assert_eq!(options[1]["properties"]["docker"], json!({ "$ref": "#/definitions/DockerArtifact" }));

        let names: Vec<_> = doc.definitions.keys().map(String::as_str).collect();
        assert_eq!(names, ["Artifact", "BazelArtifact", "DockerArtifact"]);
        assert!(doc.dangling_refs().is_empty());
    }

    #[test]
    fn plain_inline_only_stays_an_object() {
        let src = r#"
types:
  - name: Release
    fields:
      - name: Name
        type: String
        tag: name
      - name: Common
        type: Common
        tag: ",inline"
      - name: Namespace
        type: String
        tag: namespace
  - name: Common
    fields:
      - name: Flags
        type: Vec<String>
        tag: flags,required
"#;
        let graph = TypeGraph::parse(src, "test").unwrap();
        let value = serde_json::to_value(generate(&graph, false).unwrap()).unwrap();
        let release = &value["definitions"]["Release"];
        assert_eq!(keys(release), ["name", "flags", "namespace"]);
        assert_eq!(release["required"], json!(["flags"]));
        assert!(value["definitions"].get("Common").is_none());
    }

    #[test]
    fn inline_source_referenced_elsewhere_is_kept() {
        let src = r#"
types:
  - name: Root
    fields:
      - name: Shared
        type: Shared
        tag: ",inline"
      - name: Extra
        type: Shared
        tag: extra
  - name: Shared
    fields:
      - name: Value
        type: String
        tag: value
"#;
        let graph = TypeGraph::parse(src, "test").unwrap();
        let doc = generate(&graph, false).unwrap();
        assert!(doc.definitions.contains_key("Shared"));
        assert!(doc.dangling_refs().is_empty());
    }

    #[test]
    fn nested_inline_sources_resolve_first() {
        let src = r#"
types:
  - name: Outer
    fields:
      - name: Middle
        type: Middle
        tag: ",inline"
  - name: Middle
    fields:
      - name: Own
        type: String
        tag: own
      - name: Inner
        type: Inner
        tag: ",inline"
  - name: Inner
    fields:
      - name: Deep
        type: bool
        tag: deep
"#;
        let graph = TypeGraph::parse(src, "test").unwrap();
        let value = serde_json::to_value(generate(&graph, false).unwrap()).unwrap();
        assert_eq!(keys(&value["definitions"]["Outer"]), ["own", "deep"]);
    }

    #[test]
    fn grouped_source_behind_another_inline_keeps_its_alternatives() {
        let src = r#"
types:
  - name: Profile
    fields:
      - name: Name
        type: String
        tag: name,required
      - name: Pipeline
        type: Pipeline
        tag: ",inline"
  - name: Pipeline
    fields:
      - name: Stage
        type: String
        tag: stage
      - name: Kind
        type: Kind
        tag: ",inline"
  - name: Kind
    fields:
      - name: Docker
        type: String
        tag: docker,oneOf=k
      - name: Bazel
        type: String
        tag: bazel,required,oneOf=k
"#;
        let graph = TypeGraph::parse(src, "test").unwrap();
        let doc = generate(&graph, false).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        let options = value["definitions"]["Profile"]["anyOf"].as_array().unwrap();

        assert_eq!(options.len(), 3);
        assert_eq!(keys(&options[0]), ["name", "stage"]);
        assert_eq!(keys(&options[1]), ["name", "stage", "docker"]);
        assert_eq!(keys(&options[2]), ["name", "stage", "bazel"]);
        assert_eq!(options[1]["required"], json!(["name"]));
        assert_eq!(options[2]["required"], json!(["name", "bazel"]));

        let names: Vec<_> = doc.definitions.keys().map(String::as_str).collect();
        assert_eq!(names, ["Profile"]);
    }

    #[test]
    fn inline_cycles_are_errors() {
        let src = r#"
types:
  - name: A
    fields:
      - name: B
        type: B
        tag: ",inline"
  - name: B
    fields:
      - name: A
        type: A
        tag: ",inline"
"#;
        let graph = TypeGraph::parse(src, "test").unwrap();
        assert!(matches!(generate(&graph, false), Err(GenerateError::InlineCycle(_))));
    }

    #[test]
    fn inline_of_non_record_is_an_error() {
        let src = "types:\n  - name: A\n    fields:\n      - name: B\n        type: B\n        tag: \",inline\"\n  - name: B\n    type: String\n";
        let graph = TypeGraph::parse(src, "test").unwrap();
        assert!(matches!(generate(&graph, false), Err(GenerateError::InlineNotRecord { .. })));
    }

    #[test]
    fn inline_field_must_name_a_type() {
        let src = "types:\n  - name: A\n    fields:\n      - name: B\n        type: Vec<String>\n        tag: \",inline\"\n";
        let graph = TypeGraph::parse(src, "test").unwrap();
        assert!(matches!(generate(&graph, false), Err(GenerateError::InlineNotNamed { .. })));
    }
}
