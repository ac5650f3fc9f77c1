//! Configuration schema and spec parsing for Stevedore.
//!
//! This crate defines the input layer: the immutable option store
//! (`Configuration`) loaded from a TOML option file, the list and boolean
//! conventions used to read option values, component declarations,
//! `name[=version]` spec parsing for dependencies and labels, and the
//! `Diagnostics` sink that records recoverable problems while they are logged.

pub mod config;
pub mod diagnostics;
pub mod options;
pub mod spec;
pub mod types;

pub use config::{
    expand_list, is_truthy, parse_assignment, Component, ComponentSection, ConfigError, ConfigFile,
    Configuration, OptionValue,
};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use spec::{split_spec, DependencySpec, LabelSpec, SpecError};
pub use types::{ImageTag, PartitionName};
