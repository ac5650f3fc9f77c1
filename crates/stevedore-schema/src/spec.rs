use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("'{raw}' has {separators} '=' separators, expected at most one")]
    Malformed { raw: String, separators: usize },
}

/// Split a raw `name[=value]` entry on `=`.
///
/// Zero separators yield no value, exactly one yields a value, more than one
/// is malformed.
pub fn split_spec(raw: &str) -> Result<(&str, Option<&str>), SpecError> {
    let separators = raw.matches('=').count();
    match separators {
        0 => Ok((raw, None)),
        1 => {
            let (name, value) = raw.split_once('=').unwrap_or((raw, ""));
            Ok((name, Some(value)))
        }
        n => Err(SpecError::Malformed {
            raw: raw.to_owned(),
            separators: n,
        }),
    }
}

/// A package dependency, optionally pinned to a version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencySpec {
    pub name: String,
    pub version: Option<String>,
}

impl DependencySpec {
    pub fn parse(raw: &str) -> Result<Self, SpecError> {
        let (name, version) = split_spec(raw)?;
        Ok(Self {
            name: name.to_owned(),
            version: version.map(str::to_owned),
        })
    }
}

impl FromStr for DependencySpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}={v}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A custom image label: `key=value` or a bare `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpec {
    pub key: String,
    pub value: Option<String>,
}

impl LabelSpec {
    pub fn parse(raw: &str) -> Result<Self, SpecError> {
        let (key, value) = split_spec(raw)?;
        Ok(Self {
            key: key.trim().to_owned(),
            value: value.map(str::to_owned),
        })
    }
}

impl FromStr for LabelSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_has_no_version() {
        let dep = DependencySpec::parse("curl").unwrap();
        assert_eq!(dep.name, "curl");
        assert_eq!(dep.version, None);
        assert_eq!(dep.to_string(), "curl");
    }

    #[test]
    fn single_separator_pins_version() {
        let dep: DependencySpec = "libssl3=3.0.11-1".parse().unwrap();
        assert_eq!(dep.name, "libssl3");
        assert_eq!(dep.version.as_deref(), Some("3.0.11-1"));
        assert_eq!(dep.to_string(), "libssl3=3.0.11-1");
    }

    #[test]
    fn empty_version_is_still_a_version() {
        let dep = DependencySpec::parse("pkg=").unwrap();
        assert_eq!(dep.version.as_deref(), Some(""));
    }

    #[test]
    fn multiple_separators_are_malformed() {
        let err = DependencySpec::parse("a=1=2").unwrap_err();
        assert_eq!(
            err,
            SpecError::Malformed {
                raw: "a=1=2".to_owned(),
                separators: 2
            }
        );
        assert!(err.to_string().contains("a=1=2"));
    }

    #[test]
    fn label_with_value() {
        let label = LabelSpec::parse("org.opencontainers.image.vendor=ACME").unwrap();
        assert_eq!(label.key, "org.opencontainers.image.vendor");
        assert_eq!(label.value.as_deref(), Some("ACME"));
    }

    #[test]
    fn bare_label_key() {
        let label: LabelSpec = "experimental".parse().unwrap();
        assert_eq!(label.key, "experimental");
        assert!(label.value.is_none());
    }

    #[test]
    fn malformed_label() {
        assert!(LabelSpec::parse("a=b=c").is_err());
    }
}
