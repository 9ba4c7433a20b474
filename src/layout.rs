//! Docstring layouts: built-in presets and user config files.
//!
//! A layout is five templates. Placeholders are `{word}` names; see
//! [`crate::render`] for which names each template receives. Tab
//! characters stand for one indentation unit of the target source.

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const DEFAULT_DESCRIPTION: &str = "{description}\n";
const DEFAULT_FIELDS: &str = "{prefix}\n{name}\n{suffix}\n{values}";
const DEFAULT_ITEMS: &str = "\t{name} : {type}\n\t\t{description}\n\t\t{default}";
const DEFAULT_PREFIX: &str = "";
const DEFAULT_SUFFIX: &str = "";

/// Immutable set of templates controlling rendered docstrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatLayout {
    description: String,
    fields: String,
    items: String,
    prefix: String,
    suffix: String,
}

impl Default for FormatLayout {
    fn default() -> Self {
        FormatLayout::simple()
    }
}

impl FormatLayout {
    pub fn new(
        description: impl Into<String>,
        fields: impl Into<String>,
        items: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        FormatLayout {
            description: description.into(),
            fields: fields.into(),
            items: items.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Plain headings, no decoration.
    pub fn simple() -> Self {
        FormatLayout::new(
            DEFAULT_DESCRIPTION,
            DEFAULT_FIELDS,
            DEFAULT_ITEMS,
            DEFAULT_PREFIX,
            DEFAULT_SUFFIX,
        )
    }

    /// Headings underlined with `-` as long as the heading (numpydoc look).
    pub fn emphasized() -> Self {
        FormatLayout {
            suffix: "-".to_string(),
            ..FormatLayout::simple()
        }
    }

    /// Look up a built-in layout by name.
    pub fn named(name: &str) -> Result<Self, ConfigError> {
        match name {
            "simple" => Ok(FormatLayout::simple()),
            "emphasized" | "numpy" => Ok(FormatLayout::emphasized()),
            other => Err(ConfigError::UnknownLayout(other.to_string())),
        }
    }

    /// Load a layout from a JSON (`.json`) or YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let values: BTreeMap<String, Option<String>> =
            decode(path, &content).map_err(|message| ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            })?;

        Self::from_values(&values).map_err(|key| ConfigError::MissingKey {
            path: path.to_path_buf(),
            key,
        })
    }

    /// Build a layout from key/value pairs. Every key must be present; a
    /// `None` value selects that key's default. Returns the first missing key.
    pub fn from_values(values: &BTreeMap<String, Option<String>>) -> Result<Self, &'static str> {
        let get = |key: &'static str, default: &str| {
            values
                .get(key)
                .ok_or(key)
                .map(|v| v.clone().unwrap_or_else(|| default.to_string()))
        };
        Ok(FormatLayout {
            description: get("description", DEFAULT_DESCRIPTION)?,
            fields: get("fields", DEFAULT_FIELDS)?,
            items: get("items", DEFAULT_ITEMS)?,
            prefix: get("prefix", DEFAULT_PREFIX)?,
            suffix: get("suffix", DEFAULT_SUFFIX)?,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fields(&self) -> &str {
        &self.fields
    }

    pub fn items(&self) -> &str {
        &self.items
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

/// Deserialize `content` as JSON when `path` ends in `.json`, else as YAML.
fn decode<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T, String> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(ext: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(ext).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn presets_differ_only_in_suffix() {
        let simple = FormatLayout::simple();
        let emphasized = FormatLayout::emphasized();
        assert_eq!(simple.suffix(), "");
        assert_eq!(emphasized.suffix(), "-");
        assert_eq!(simple.items(), emphasized.items());
    }

    #[test]
    fn named_presets() {
        assert_eq!(FormatLayout::named("simple").unwrap(), FormatLayout::simple());
        assert_eq!(FormatLayout::named("numpy").unwrap(), FormatLayout::emphasized());
        assert!(matches!(
            FormatLayout::named("google"),
            Err(ConfigError::UnknownLayout(_))
        ));
    }

    #[test]
    fn loads_json_config() {
        let file = config_file(
            ".json",
            r#"{"description": "{description}\n", "fields": "{name}:\n{values}",
                "items": "\t{name} ({type})", "prefix": "", "suffix": "="}"#,
        );
        let layout = FormatLayout::from_file(file.path()).unwrap();
        assert_eq!(layout.fields(), "{name}:\n{values}");
        assert_eq!(layout.items(), "\t{name} ({type})");
        assert_eq!(layout.suffix(), "=");
    }

    #[test]
    fn loads_yaml_config_with_null_fallback() {
        let file = config_file(
            ".yaml",
            "description: null\nfields: ~\nitems: \"{name}\"\nprefix: \"*\"\nsuffix:\n",
        );
        let layout = FormatLayout::from_file(file.path()).unwrap();
        assert_eq!(layout.description(), DEFAULT_DESCRIPTION);
        assert_eq!(layout.fields(), DEFAULT_FIELDS);
        assert_eq!(layout.items(), "{name}");
        assert_eq!(layout.prefix(), "*");
        assert_eq!(layout.suffix(), DEFAULT_SUFFIX);
    }

    #[test]
    fn missing_key_is_reported() {
        let file = config_file(
            ".json",
            r#"{"description": null, "fields": null, "items": null, "prefix": null}"#,
        );
        match FormatLayout::from_file(file.path()) {
            Err(ConfigError::MissingKey { key, .. }) => assert_eq!(key, "suffix"),
            other => panic!("expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        let file = config_file(".json", "{\"description\": ");
        assert!(matches!(
            FormatLayout::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
        let file = config_file(".yml", "- just\n- a list\n");
        assert!(matches!(
            FormatLayout::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn unreadable_config_is_a_read_error() {
        let err = FormatLayout::from_file(Path::new("/nonexistent/docsplice/layout.json"));
        assert!(matches!(err, Err(ConfigError::Read { .. })));
    }
}
