//! Splitting an installed staging tree into packaging units.

use crate::CoreError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path};
use stevedore_schema::{options, Configuration, ConfigError, PartitionName};
use tracing::{debug, info, warn};

/// Partition name used when every component goes into one package.
pub const ALL_IN_ONE: &str = "ALL_COMPONENTS_IN_ONE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackagingMode {
    /// The whole staging tree is one package.
    Monolithic,
    /// All components merged into one package.
    AllInOne,
    /// One package per component, groups ignored.
    PerComponent,
    /// One package per group plus one per ungrouped component.
    Grouped,
}

impl PackagingMode {
    pub fn select(config: &Configuration, supports_components: bool) -> Self {
        if !supports_components || !config.is_on(options::COMPONENT_INSTALL) {
            Self::Monolithic
        } else if config.is_on(options::COMPONENTS_ALL_IN_ONE_PACKAGE) {
            Self::AllInOne
        } else if config.is_on(options::COMPONENTS_IGNORE_GROUPS) {
            Self::PerComponent
        } else {
            Self::Grouped
        }
    }

    fn is_single(self) -> bool {
        matches!(self, Self::Monolithic | Self::AllInOne)
    }
}

/// What a partition takes from the staging directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "components", rename_all = "snake_case")]
pub enum PartitionSource {
    /// The staging directory itself.
    WholeTree,
    /// The per-component subdirectories with these names.
    Components(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionPlan {
    pub name: PartitionName,
    pub source: PartitionSource,
    /// Name of the produced artifact, extension included.
    pub artifact_name: String,
}

/// Work out the partitions for one run, sorted by name.
pub fn plan_partitions(
    config: &Configuration,
    supports_components: bool,
    extension: &str,
) -> Result<(PackagingMode, Vec<PartitionPlan>), CoreError> {
    let mode = PackagingMode::select(config, supports_components);
    let base = config.package_file_name();
    ensure_plain_name(&base, options::PACKAGE_FILE_NAME)?;
    info!("packaging mode: {mode:?}");

    if mode == PackagingMode::Monolithic {
        let artifact_name = format!("{base}{extension}");
        ensure_plain_name(&artifact_name, options::PACKAGE_FILE_NAME)?;
        let plan = PartitionPlan {
            name: PartitionName::new(base.clone()),
            source: PartitionSource::WholeTree,
            artifact_name,
        };
        return Ok((mode, vec![plan]));
    }

    let components = config.components();
    if components.is_empty() {
        return Err(ConfigError::Missing(options::COMPONENTS.to_owned()).into());
    }

    let mut members: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut orphans = BTreeSet::new();
    let mut groups = BTreeSet::new();
    for component in components {
        ensure_plain_name(&component.name, options::COMPONENTS)?;
        if let Some(group) = &component.group {
            ensure_plain_name(group, &options::component_group_option(&component.name))?;
        }
        let key = match (mode, &component.group) {
            (PackagingMode::AllInOne, _) => ALL_IN_ONE.to_owned(),
            (PackagingMode::Grouped, Some(group)) => {
                debug!("component {} packages with group {group}", component.name);
                groups.insert(group.clone());
                group.clone()
            }
            (PackagingMode::Grouped, None) => {
                debug!(
                    "component {} does not belong to any group, packaging it separately",
                    component.name
                );
                orphans.insert(component.name.clone());
                component.name.clone()
            }
            _ => component.name.clone(),
        };
        members.entry(key).or_default().push(component.name);
    }
    for name in orphans.intersection(&groups) {
        warn!("component {name} shares its name with a group, packaging them together");
    }

    let mut plans = Vec::with_capacity(members.len());
    for (name, mut components) in members {
        components.sort();
        let artifact_name = if mode.is_single() {
            format!("{base}{extension}")
        } else {
            format!("{base}-{name}{extension}")
        };
        ensure_plain_name(&artifact_name, options::PACKAGE_FILE_NAME)?;
        plans.push(PartitionPlan {
            name: PartitionName::new(name),
            source: PartitionSource::Components(components),
            artifact_name,
        });
    }
    Ok((mode, plans))
}

/// Names become directories under the output root, so each must be exactly
/// one ordinary path component.
fn ensure_plain_name(name: &str, option: &str) -> Result<(), ConfigError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(ConfigError::InvalidValue {
            option: option.to_owned(),
            reason: format!("'{name}' is not a plain file name"),
        }),
    }
}
