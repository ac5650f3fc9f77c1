use crate::options;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("required option {0} is not set")]
    Missing(String),
    #[error("invalid option assignment '{0}', expected NAME=VALUE")]
    InvalidAssignment(String),
    #[error("option {option} has an invalid value: {reason}")]
    InvalidValue { option: String, reason: String },
}

/// A single option value as written in the option file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Text(String),
    List(Vec<String>),
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

impl From<&[&str]> for OptionValue {
    fn from(v: &[&str]) -> Self {
        Self::List(v.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for OptionValue {
    fn from(v: [&str; N]) -> Self {
        Self::List(v.iter().map(|s| (*s).to_owned()).collect())
    }
}

/// On-disk layout of the option file.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentSection>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ComponentSection {
    #[serde(default)]
    pub group: Option<String>,
}

/// An installable component and the group it packages with, if any.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Component {
    pub name: String,
    pub group: Option<String>,
}

/// Immutable option store for one packaging run.
///
/// Values are looked up by option name. Strings follow the list convention
/// of [`expand_list`] and the boolean convention of [`is_truthy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    options: BTreeMap<String, OptionValue>,
    components: BTreeMap<String, ComponentSection>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(file: ConfigFile) -> Self {
        Self {
            options: file.options,
            components: file.components,
        }
    }

    pub fn parse_str(input: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(input)?;
        Ok(Self::from_file(file))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    /// Return a copy with one option replaced.
    #[must_use]
    pub fn with_option(mut self, name: &str, value: impl Into<OptionValue>) -> Self {
        self.options.insert(name.to_owned(), value.into());
        self
    }

    /// Return a copy with one component declared.
    #[must_use]
    pub fn with_component(mut self, name: &str, group: Option<&str>) -> Self {
        self.components.insert(
            name.to_owned(),
            ComponentSection {
                group: group.map(str::to_owned),
            },
        );
        self
    }

    pub fn raw(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// Scalar value of an option, or `None` when unset or empty.
    ///
    /// Lists are joined back with `;`; booleans read as `ON`/`OFF`.
    pub fn value(&self, name: &str) -> Option<String> {
        let value = match self.options.get(name)? {
            OptionValue::Bool(true) => "ON".to_owned(),
            OptionValue::Bool(false) => "OFF".to_owned(),
            OptionValue::Integer(i) => i.to_string(),
            OptionValue::Text(s) => s.trim().to_owned(),
            OptionValue::List(items) => normalize_items(items).join(";"),
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// List value of an option. Unset options yield an empty list.
    pub fn list(&self, name: &str) -> Vec<String> {
        match self.options.get(name) {
            None => Vec::new(),
            Some(OptionValue::Text(s)) => expand_list(s),
            Some(OptionValue::List(items)) => normalize_items(items),
            Some(_) => self.value(name).into_iter().collect(),
        }
    }

    pub fn is_on(&self, name: &str) -> bool {
        match self.options.get(name) {
            Some(OptionValue::Bool(b)) => *b,
            Some(OptionValue::Integer(i)) => *i != 0,
            Some(OptionValue::Text(s)) => is_truthy(s),
            Some(OptionValue::List(_)) | None => false,
        }
    }

    pub fn require(&self, name: &str) -> Result<String, ConfigError> {
        self.value(name)
            .ok_or_else(|| ConfigError::Missing(name.to_owned()))
    }

    /// All declared components, sorted by name.
    ///
    /// Components come from the `[components]` table and from the
    /// `COMPONENTS` list option. A table entry's `group` wins over a
    /// `COMPONENT_<NAME>_GROUP` option.
    pub fn components(&self) -> Vec<Component> {
        let mut names: BTreeMap<String, Option<String>> = self
            .components
            .iter()
            .map(|(name, section)| (name.clone(), section.group.clone()))
            .collect();
        for name in self.list(options::COMPONENTS) {
            names.entry(name).or_insert(None);
        }

        names
            .into_iter()
            .map(|(name, group)| {
                let group = group
                    .map(|g| g.trim().to_owned())
                    .filter(|g| !g.is_empty())
                    .or_else(|| self.value(&options::component_group_option(&name)));
                Component { name, group }
            })
            .collect()
    }

    /// Base name for produced artifacts.
    pub fn package_file_name(&self) -> String {
        if let Some(name) = self.value(options::PACKAGE_FILE_NAME) {
            return name;
        }
        match (
            self.value(options::CONTAINER_NAME),
            self.value(options::CONTAINER_VERSION),
        ) {
            (Some(name), Some(version)) => format!("{name}-{version}"),
            (Some(name), None) => name,
            _ => "package".to_owned(),
        }
    }

    /// External image builder executable.
    pub fn builder(&self) -> String {
        self.value(options::BUILDER_EXECUTABLE)
            .unwrap_or_else(|| options::DEFAULT_BUILDER.to_owned())
    }
}

/// Expand a `;`-separated list. Empty elements are dropped and `\;` stands
/// for a literal semicolon.
pub fn expand_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&';') => {
                current.push(';');
                chars.next();
            }
            ';' => items.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    items.push(current);
    normalize_items(&items)
}

/// Boolean convention: `ON`, `1`, `YES`, `TRUE`, `Y` in any case.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_uppercase().as_str(),
        "ON" | "1" | "YES" | "TRUE" | "Y"
    )
}

/// Parse a `NAME=VALUE` command-line override.
pub fn parse_assignment(input: &str) -> Result<(String, String), ConfigError> {
    match input.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_owned(), value.to_owned()))
        }
        _ => Err(ConfigError::InvalidAssignment(input.to_owned())),
    }
}

fn normalize_items(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_option_file() {
        let input = r#"
[options]
BASE_IMAGE = "debian:bookworm"
MAINTAINER = "Jane Doe <jane@example.com>"
PACKAGE_DEPENDS = ["libssl3=3.0.11", "curl"]
RUN_POSTDEPENDS = "ldconfig;useradd app"
BUILD_CONTAINER = true
EXPOSE = 8080

[components]
runtime = { group = "base" }
docs = {}
"#;
        let config = Configuration::parse_str(input).expect("should parse");
        assert_eq!(config.value("BASE_IMAGE").as_deref(), Some("debian:bookworm"));
        assert_eq!(config.list("PACKAGE_DEPENDS"), vec!["libssl3=3.0.11", "curl"]);
        assert_eq!(config.list("RUN_POSTDEPENDS"), vec!["ldconfig", "useradd app"]);
        assert!(config.is_on("BUILD_CONTAINER"));
        assert_eq!(config.list("EXPOSE"), vec!["8080"]);

        let components = config.components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].name, "docs");
        assert_eq!(components[0].group, None);
        assert_eq!(components[1].group.as_deref(), Some("base"));
    }

    #[test]
    fn rejects_unknown_tables() {
        let input = r#"
[options]
BASE_IMAGE = "alpine"

[mystery]
x = 1
"#;
        assert!(Configuration::parse_str(input).is_err());
    }

    #[test]
    fn empty_values_read_as_unset() {
        let config = Configuration::new()
            .with_option("MAINTAINER", "   ")
            .with_option("VOLUME", OptionValue::List(vec![" ".to_owned()]));
        assert_eq!(config.value("MAINTAINER"), None);
        assert_eq!(config.value("VOLUME"), None);
        assert!(config.list("VOLUME").is_empty());
        assert!(config.list("UNSET").is_empty());
    }

    #[test]
    fn require_reports_option_name() {
        let err = Configuration::new().require("BASE_IMAGE").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref name) if name == "BASE_IMAGE"));
        assert!(err.to_string().contains("BASE_IMAGE"));
    }

    #[test]
    fn list_expansion_drops_empty_elements() {
        assert_eq!(expand_list("a;;b; ;c"), vec!["a", "b", "c"]);
        assert!(expand_list("").is_empty());
    }

    #[test]
    fn list_expansion_honors_escaped_semicolon() {
        assert_eq!(
            expand_list(r"echo a\; echo b;true"),
            vec!["echo a; echo b", "true"]
        );
    }

    #[test]
    fn truthiness_convention() {
        for on in ["ON", "on", "1", "yes", "TRUE", "y"] {
            assert!(is_truthy(on), "{on} should be true");
        }
        for off in ["OFF", "0", "no", "false", "", "maybe"] {
            assert!(!is_truthy(off), "{off} should be false");
        }
    }

    #[test]
    fn components_from_list_option_and_group_options() {
        let config = Configuration::new()
            .with_option("COMPONENTS", "A;B;C")
            .with_option("COMPONENT_A_GROUP", "G")
            .with_option("COMPONENT_B_GROUP", "G");
        let components = config.components();
        assert_eq!(
            components,
            vec![
                Component {
                    name: "A".to_owned(),
                    group: Some("G".to_owned())
                },
                Component {
                    name: "B".to_owned(),
                    group: Some("G".to_owned())
                },
                Component {
                    name: "C".to_owned(),
                    group: None
                },
            ]
        );
    }

    #[test]
    fn table_group_wins_over_group_option() {
        let config = Configuration::new()
            .with_component("lib", Some("core"))
            .with_option("COMPONENT_LIB_GROUP", "other");
        assert_eq!(config.components()[0].group.as_deref(), Some("core"));
    }

    #[test]
    fn package_file_name_defaults() {
        assert_eq!(Configuration::new().package_file_name(), "package");
        let config = Configuration::new()
            .with_option("CONTAINER_NAME", "app")
            .with_option("CONTAINER_VERSION", "1.2");
        assert_eq!(config.package_file_name(), "app-1.2");
        let config = config.with_option("PACKAGE_FILE_NAME", "custom");
        assert_eq!(config.package_file_name(), "custom");
    }

    #[test]
    fn builder_defaults_to_docker() {
        assert_eq!(Configuration::new().builder(), "docker");
        let config = Configuration::new().with_option("BUILDER_EXECUTABLE", "podman");
        assert_eq!(config.builder(), "podman");
    }

    #[test]
    fn assignment_parsing() {
        assert_eq!(
            parse_assignment("USER=app").unwrap(),
            ("USER".to_owned(), "app".to_owned())
        );
        assert_eq!(
            parse_assignment("ENV=A=1;B=2").unwrap().1,
            "A=1;B=2".to_owned()
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn invalid_value_names_option() {
        let err = ConfigError::InvalidValue {
            option: "PACKAGE_FILE_NAME".to_owned(),
            reason: "'../x' is not a plain file name".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PACKAGE_FILE_NAME"));
        assert!(msg.contains("../x"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stevedore.toml");
        std::fs::write(&path, "[options]\nBASE_IMAGE = \"alpine:3.20\"\n").unwrap();
        let config = Configuration::load(&path).unwrap();
        assert_eq!(config.require("BASE_IMAGE").unwrap(), "alpine:3.20");
    }
}
