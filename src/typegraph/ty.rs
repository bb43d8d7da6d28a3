use std::fmt;
use std::str::FromStr;

/// Scalar kinds with a fixed schema mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Bool,
    /// Any integer width.
    Integer,
}

/// A declared field or alias type.
///
/// Written in a compact Rust-like notation: `String`, `bool`, `i64`, `Vec<T>`,
/// `Map<T>` / `Map<String, T>`, `Option<T>` (nilable, maps like `T`),
/// `a::b::Qualified` (an external type the graph knows nothing about) or the
/// name of another declared type.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum TypeRef {
    Primitive(Primitive),
    Array(Box<TypeRef>),
    Map(Box<TypeRef>),
    Named(String),
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type expression `{expr}`: {reason}")]
pub struct TypeRefError {
    pub expr: String,
    pub reason: &'static str,
}

impl TypeRef {
    pub fn named(&self) -> Option<&str> {
        match self {
            TypeRef::Named(name) => Some(name),
            _ => None,
        }
    }
}

fn primitive(name: &str) -> Option<Primitive> {
    match name {
        "String" | "str" => Some(Primitive::String),
        "bool" => Some(Primitive::Bool),
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            Some(Primitive::Integer)
        }
        _ => None,
    }
}

/// Strips `Head<` ... `>` and returns the generic arguments.
fn generic_args<'a>(expr: &'a str, head: &str) -> Option<&'a str> {
    expr.strip_prefix(head)?
        .strip_prefix('<')?
        .strip_suffix('>')
        .map(str::trim)
}

/// Splits generic arguments on commas that are not nested in `<...>`.
fn split_top_level(args: &str) -> Vec<&str> {
    let mut depth = 0usize;
    let mut start = 0;
    let mut out = Vec::new();
    for (i, c) in args.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(args[start..].trim());
    out
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for TypeRef {
    type Err = TypeRefError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let expr = raw.trim();
        let err = |reason| TypeRefError { expr: raw.to_string(), reason };

        if expr.is_empty() {
            return Err(err("empty"));
        }
        if let Some(p) = primitive(expr) {
            return Ok(TypeRef::Primitive(p));
        }
        if let Some(inner) = generic_args(expr, "Option") {
            return inner.parse();
        }
        if let Some(inner) = generic_args(expr, "Vec") {
            return Ok(TypeRef::Array(Box::new(inner.parse()?)));
        }
        if let Some(args) = generic_args(expr, "Map") {
            return match split_top_level(args).as_slice() {
                [value] => Ok(TypeRef::Map(Box::new(value.parse()?))),
                [key, value] => {
                    if primitive(key) != Some(Primitive::String) {
                        return Err(err("map keys must be String"));
                    }
                    Ok(TypeRef::Map(Box::new(value.parse()?)))
                }
                _ => Err(err("Map takes one or two arguments")),
            };
        }
        if expr.contains("::") {
            if expr.split("::").all(is_ident) {
                return Ok(TypeRef::Opaque(expr.to_string()));
            }
            return Err(err("malformed qualified path"));
        }
        if is_ident(expr) {
            return Ok(TypeRef::Named(expr.to_string()));
        }
        Err(err("not a type name"))
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(Primitive::String) => f.write_str("String"),
            TypeRef::Primitive(Primitive::Bool) => f.write_str("bool"),
            TypeRef::Primitive(Primitive::Integer) => f.write_str("i64"),
            TypeRef::Array(inner) => write!(f, "Vec<{inner}>"),
            TypeRef::Map(inner) => write!(f, "Map<String, {inner}>"),
            TypeRef::Named(name) | TypeRef::Opaque(name) => f.write_str(name),
        }
    }
}
