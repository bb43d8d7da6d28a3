//! Legacy sync pattern classification and rewriting.
//!
//! Legacy sync entries map a source glob to a destination directory and copy
//! matched files flat into it. Sync rules instead keep the directory structure
//! below `strip`, so only some legacy patterns have an equivalent rule.
use once_cell::sync::Lazy;
use regex::Regex;

/// A star-free directory prefix followed by a basename with at most one `*`.
static SIMPLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^*]*/)?([^*/]*\*[^*/]*|[^*/]+)$").expect("simple sync pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternClass<'a> {
    /// Directory prefix (possibly empty) plus a simple basename.
    Simple { prefix: &'a str },
    /// Contains `***`; `prefix` is the text before the first occurrence.
    TripleStar { prefix: &'a str },
    /// `**` or a glob in a directory segment: relied on flattening.
    Incompatible,
}

/// One legacy entry rewritten as a sync rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub src: String,
    pub dest: String,
    pub strip: String,
    /// False when the rule only approximates the legacy behavior.
    pub compatible: bool,
}

pub fn classify(pattern: &str) -> PatternClass<'_> {
    if let Some(caps) = SIMPLE.captures(pattern) {
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        return PatternClass::Simple { prefix };
    }
    if let Some((prefix, _)) = pattern.split_once("***") {
        return PatternClass::TripleStar { prefix };
    }
    PatternClass::Incompatible
}

/// Folds `strip` into `dest` when `dest` already ends with it.
///
/// `dest` is compared with a trailing `/`, `strip` without its leading `/`.
/// An absorbed destination that becomes empty is `.`.
pub fn simplify(dest: &str, strip: &str) -> (String, String) {
    if strip.is_empty() || strip == "/" || dest.is_empty() {
        return (dest.to_string(), strip.to_string());
    }
    let padded = if dest.ends_with('/') { dest.to_string() } else { format!("{dest}/") };
    match padded.strip_suffix(strip.trim_start_matches('/')) {
        Some("") => (".".to_string(), String::new()),
        Some(rest) => (rest.to_string(), String::new()),
        None => (dest.to_string(), strip.to_string()),
    }
}

pub fn rewrite(src: &str, dest: &str) -> Rewrite {
    match classify(src) {
        PatternClass::Simple { prefix } => {
            let (dest, strip) = simplify(dest, prefix);
            Rewrite { src: src.to_string(), dest, strip, compatible: true }
        }
        PatternClass::TripleStar { prefix } => {
            let (dest, strip) = simplify(dest, prefix);
            Rewrite { src: src.replace("***", "**"), dest, strip, compatible: true }
        }
        PatternClass::Incompatible => Rewrite {
            src: src.to_string(),
            dest: dest.to_string(),
            strip: String::new(),
            compatible: false,
        },
    }
}
