use serde::de::DeserializeOwned;

/// A deserialization failure located inside the input document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("at path {path} → {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

impl PathError {
    fn from_track<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> Self {
        let path = err.path().to_string();
        Self { path, message: err.into_inner().to_string() }
    }
}

/// Deserialize YAML (or JSON, which YAML accepts) with path context in error messages.
pub fn from_yaml_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = serde_yaml::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(PathError::from_track)
}

/// Deserialize an in-memory JSON tree with path context in error messages.
pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, PathError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(PathError::from_track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Outer { inner: Vec<Inner> }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Inner { count: u32 }

    #[test]
    fn yaml_errors_carry_the_path() {
        let err = from_yaml_str_with_path::<Outer>("inner:\n  - count: 1\n  - count: nope\n").unwrap_err();
        assert_eq!(err.path, "inner[1].count");
    }

    #[test]
    fn value_errors_carry_the_path() {
        let value = serde_json::json!({ "inner": [{ "count": "x" }] });
        let err = from_value_with_path::<Outer>(value).unwrap_err();
        assert_eq!(err.path, "inner[0].count");
        assert!(err.to_string().starts_with("at path inner[0].count → "));
    }
}
