//! Newtype wrappers for string identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_newtype!(
    /// Name of one packaging partition: a component, a component group, or
    /// the all-in-one bucket.
    PartitionName
);

string_newtype!(
    /// Container image tag. Always lower case, since image references
    /// reject upper-case repository names.
    ImageTag
);

impl PartitionName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl From<&str> for PartitionName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl ImageTag {
    /// Derive a tag from an artifact name by stripping the generator's
    /// output extension and case-folding.
    pub fn from_artifact(artifact_name: &str, extension: &str) -> Self {
        let stem = if extension.is_empty() {
            artifact_name
        } else {
            artifact_name
                .strip_suffix(extension)
                .unwrap_or(artifact_name)
        };
        Self(stem.to_lowercase())
    }
}
