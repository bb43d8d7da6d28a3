//! Documentation metadata: description, HTML form, default and example.
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static DEFAULTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Defaults to `([^`]*)`\.?").expect("defaults pattern"));
static EXAMPLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"For example: `([^`]*)`\.?").expect("example pattern"));

/// Linking verbs stripped after the leading name, longest alternative first.
const LINKING_VERBS: [&str; 5] = ["is the ", "is ", "are the ", "are ", "lists "];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocInfo {
    pub description: String,
    pub html_description: String,
    pub default: Option<String>,
    pub example: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    MissingNamePrefix,
    EmptyDescription,
    MissingPeriod,
}

/// One documentation rule broken by a declaration of the strict version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Enclosing type, or the type itself for type-level docs.
    pub owner: String,
    /// Declared identifier the doc belongs to.
    pub name: String,
    pub kind: ViolationKind,
}

/// A non-empty list of violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(pub Vec<Violation>);

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = if self.owner == self.name {
            format!("type `{}`", self.name)
        } else {
            format!("field `{}.{}`", self.owner, self.name)
        };
        match self.kind {
            ViolationKind::MissingNamePrefix => write!(f, "{what}: comment should start with `{} `", self.name),
            ViolationKind::EmptyDescription => write!(f, "{what}: no description"),
            ViolationKind::MissingPeriod => write!(f, "{what}: description should end with a period"),
        }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} documentation violation(s)", self.0.len())?;
        for v in &self.0 {
            write!(f, "\n  - {v}")?;
        }
        Ok(())
    }
}

/// Extracts the documentation metadata of the declaration `name`.
pub fn extract(name: &str, raw: &str) -> DocInfo {
    let text = raw.replace('\n', " ");
    let text = text.trim();

    let defaults = DEFAULTS.captures(text);
    let example = EXAMPLE.captures(text);
    let cut = [&defaults, &example]
        .into_iter()
        .flatten()
        .filter_map(|c| c.get(0))
        .map(|m| m.start())
        .min()
        .unwrap_or(text.len());

    let default = defaults.and_then(|c| c.get(1)).map(|m| m.as_str().to_string());
    let example = example.and_then(|c| c.get(1)).map(|m| m.as_str().to_string());

    let description = strip_name_prefix(name, text[..cut].trim());
    let html_description = render_html(&description);
    DocInfo { description, html_description, default, example }
}

/// Drops `<name> ` plus an optional linking verb, keeping a `*qualifier*`
/// directly after the name.
fn strip_name_prefix(name: &str, text: &str) -> String {
    if name.is_empty() {
        return text.to_string();
    }
    let Some(rest) = text.strip_prefix(name).and_then(|r| r.strip_prefix(' ')) else {
        return text.to_string();
    };
    let (qualifier, rest) = match rest.rfind("* ") {
        Some(end) if end > 0 && rest.starts_with('*') => rest.split_at(end + 2),
        _ => ("", rest),
    };
    let rest = LINKING_VERBS
        .iter()
        .find_map(|verb| rest.strip_prefix(verb))
        .unwrap_or(rest);
    format!("{qualifier}{rest}")
}

/// CommonMark to HTML, without paragraph tags since consumers render inline.
fn render_html(markdown: &str) -> String {
    if markdown.is_empty() {
        return String::new();
    }
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, pulldown_cmark::Parser::new(markdown));
    html.replace("<p>", "").replace("</p>", "").trim().to_string()
}

/// Strict-mode rules for the declaration `name` owned by `owner`.
pub fn check(owner: &str, name: &str, raw: &str, info: &DocInfo) -> Vec<Violation> {
    let violation = |kind| Violation { owner: owner.to_string(), name: name.to_string(), kind };
    let mut out = Vec::new();
    if !raw.starts_with(&format!("{name} ")) {
        out.push(violation(ViolationKind::MissingNamePrefix));
    }
    if info.description.is_empty() {
        out.push(violation(ViolationKind::EmptyDescription));
    } else if !info.description.ends_with('.') {
        out.push(violation(ViolationKind::MissingPeriod));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_and_examples_are_pulled_out() {
        let info = extract("Tag", "Tag Defaults to `latest`. For example: `v1.2.3`.");
        assert_eq!(info.description, "Tag");
        assert_eq!(info.default.as_deref(), Some("latest"));
        assert_eq!(info.example.as_deref(), Some("v1.2.3"));
    }

    #[test]
    fn example_before_default() {
        let info = extract("Port", "Port to forward. For example: `8080`. Defaults to `80`.");
        assert_eq!(info.description, "to forward.");
        assert_eq!(info.default.as_deref(), Some("80"));
        assert_eq!(info.example.as_deref(), Some("8080"));
    }

    #[test]
    fn captures_end_at_the_first_backtick() {
        let info = extract("Mode", "Mode Defaults to `fast`, use `slow` when debugging. For example: `fast` or `slow`.");
        assert_eq!(info.default.as_deref(), Some("fast"));
        assert_eq!(info.example.as_deref(), Some("fast"));
    }

    #[test]
    fn newlines_collapse_and_linking_verb_is_stripped() {
        let info = extract("Image", "Image is the name of the image\nto be built.\n");
        assert_eq!(info.description, "name of the image to be built.");
        let info = extract("Manifests", "Manifests lists the Kubernetes yaml files.");
        assert_eq!(info.description, "the Kubernetes yaml files.");
        let info = extract("Flags", "Flags are the additional flags.");
        assert_eq!(info.description, "additional flags.");
    }

    #[test]
    fn qualifier_survives_prefix_stripping() {
        let info = extract("Bazel", "Bazel *beta* requires bazel CLI to be installed.");
        assert_eq!(info.description, "*beta* requires bazel CLI to be installed.");
        assert_eq!(info.html_description, "<em>beta</em> requires bazel CLI to be installed.");
    }

    #[test]
    fn prefix_needs_the_exact_name() {
        let info = extract("Tag", "Tagger is something else.");
        assert_eq!(info.description, "Tagger is something else.");
    }

    #[test]
    fn html_keeps_inline_markup_without_paragraphs() {
        let info = extract("Dockerfile", "Dockerfile locates the `Dockerfile` relative to workspace.");
        assert_eq!(info.html_description, "locates the <code>Dockerfile</code> relative to workspace.");
    }

    #[test]
    fn strict_rules() {
        let raw = "Context directory containing the artifact sources";
        let info = extract("Context", raw);
        assert_eq!(
            check("Artifact", "Context", raw, &info).iter().map(|v| v.kind).collect::<Vec<_>>(),
            vec![ViolationKind::MissingPeriod]
        );

        let info = extract("Image", "");
        let kinds: Vec<_> = check("Artifact", "Image", "", &info).iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![ViolationKind::MissingNamePrefix, ViolationKind::EmptyDescription]);

        let raw = "Image is the image name.";
        assert!(check("Artifact", "Image", raw, &extract("Image", raw)).is_empty());
    }

    #[test]
    fn violation_messages_name_the_declaration() {
        let v = Violation { owner: "Artifact".into(), name: "Image".into(), kind: ViolationKind::EmptyDescription };
        assert_eq!(v.to_string(), "field `Artifact.Image`: no description");
        let v = Violation { owner: "Artifact".into(), name: "Artifact".into(), kind: ViolationKind::MissingPeriod };
        assert_eq!(v.to_string(), "type `Artifact`: description should end with a period");
    }
}
