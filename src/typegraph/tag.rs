use std::str::FromStr;

/// Serialization metadata attached to a field: `<serializedName>[,flag]*`.
///
/// Flags: `inline`, `required`, `omitempty` and `oneOf=<group>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct FieldTag {
    pub serialized_name: String,
    pub required: bool,
    pub inline: bool,
    pub one_of: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("unknown tag flag `{0}`")]
    UnknownFlag(String),
    #[error("`oneOf` needs a group name")]
    EmptyGroup,
}

impl FromStr for FieldTag {
    type Err = TagError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.split(',').map(str::trim);
        let mut tag = FieldTag {
            serialized_name: parts.next().unwrap_or_default().to_string(),
            ..FieldTag::default()
        };
        for flag in parts {
            match flag {
                "" | "omitempty" => {}
                "inline" => tag.inline = true,
                "required" => tag.required = true,
                _ => match flag.strip_prefix("oneOf=") {
                    Some("") => return Err(TagError::EmptyGroup),
                    Some(group) => tag.one_of = Some(group.to_string()),
                    None => return Err(TagError::UnknownFlag(flag.to_string())),
                },
            }
        }
        Ok(tag)
    }
}

impl TryFrom<String> for FieldTag {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_flags() {
        let tag: FieldTag = "image,required,omitempty".parse().unwrap();
        assert_eq!(tag.serialized_name, "image");
        assert!(tag.required);
        assert!(!tag.inline);
        assert_eq!(tag.one_of, None);
    }

    #[test]
    fn inline_without_name() {
        let tag: FieldTag = ",inline".parse().unwrap();
        assert!(tag.inline);
        assert_eq!(tag.serialized_name, "");
    }

    #[test]
    fn one_of_group() {
        let tag: FieldTag = "docker,omitempty,oneOf=artifact".parse().unwrap();
        assert_eq!(tag.one_of.as_deref(), Some("artifact"));
    }

    #[test]
    fn dash_and_empty_names_are_kept_verbatim() {
        assert_eq!("-".parse::<FieldTag>().unwrap(), FieldTag { serialized_name: "-".into(), ..FieldTag::default() });
        assert_eq!("".parse::<FieldTag>().unwrap(), FieldTag::default());
    }

    #[test]
    fn rejects_unknown_flags() {
        assert_eq!("x,flatten".parse::<FieldTag>(), Err(TagError::UnknownFlag("flatten".into())));
        assert_eq!("x,oneOf=".parse::<FieldTag>(), Err(TagError::EmptyGroup));
    }
}
