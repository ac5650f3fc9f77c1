use crate::command::{CommandRunner, CommandSpec};
use crate::RuntimeError;
use serde::Serialize;
use std::fmt;
use stevedore_schema::{options, split_spec, Configuration, Diagnostics, SpecError};
use tracing::{debug, error};

/// How a manager expresses "this package at this version".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPin {
    /// `name=version`
    Equals,
    /// `name-version`
    Dash,
    /// No pinning syntax: the version is dropped.
    Unsupported,
}

/// Install tool used inside the base image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum PackageManager {
    AptGet,
    Yum,
    Pacman,
    /// A manager named explicitly in the configuration that has no built-in
    /// profile.
    Other(String),
}

impl From<PackageManager> for String {
    fn from(pm: PackageManager) -> Self {
        pm.name().to_owned()
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PackageManager {
    /// Managers probed during detection, in probe order.
    pub const PROBE_ORDER: [Self; 3] = [Self::AptGet, Self::Yum, Self::Pacman];

    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "apt-get" => Self::AptGet,
            "yum" => Self::Yum,
            "pacman" => Self::Pacman,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::AptGet => "apt-get",
            Self::Yum => "yum",
            Self::Pacman => "pacman",
            Self::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    pub fn version_pin(&self) -> Option<VersionPin> {
        match self {
            Self::AptGet => Some(VersionPin::Equals),
            Self::Yum => Some(VersionPin::Dash),
            Self::Pacman => Some(VersionPin::Unsupported),
            Self::Other(_) => None,
        }
    }

    /// Command line that refreshes metadata and starts a non-interactive
    /// install; package names are appended to it.
    pub fn install_preamble(&self) -> Option<&'static str> {
        match self {
            Self::AptGet => Some("apt-get update && apt-get install -y"),
            Self::Yum => Some("yum update -y && yum install -y"),
            Self::Pacman => Some("pacman -Syu --noconfirm && pacman -S --noconfirm"),
            Self::Other(_) => None,
        }
    }

    /// Arguments run inside the base image to test for this manager.
    ///
    /// pacman's version query is not used: `pacman -Q pacman` asks the local
    /// database for its own package, which is non-interactive and exits 0
    /// exactly when pacman is installed.
    pub fn probe_args(&self) -> &'static [&'static str] {
        match self {
            Self::AptGet => &["apt-get", "--version"],
            Self::Yum => &["yum", "--version"],
            Self::Pacman => &["pacman", "-Q", "pacman"],
            Self::Other(_) => &[],
        }
    }
}

/// Determine the package manager of the configured base image.
///
/// An explicit `PACKAGE_MANAGER` option is trusted as-is. Otherwise each
/// known manager is probed inside the base image with the configured builder.
pub fn detect(
    config: &Configuration,
    runner: &dyn CommandRunner,
) -> Result<PackageManager, RuntimeError> {
    if let Some(name) = config.value(options::PACKAGE_MANAGER) {
        debug!("using configured package manager {name}");
        return Ok(PackageManager::from_name(&name));
    }

    let image = config.require(options::BASE_IMAGE)?;
    let builder = config.builder();
    for candidate in PackageManager::PROBE_ORDER {
        let spec = CommandSpec::new(&builder)
            .args(["run", "--rm", image.as_str()])
            .args(candidate.probe_args().iter().copied());
        match runner.run(&spec) {
            Ok(out) if out.success() => {
                debug!("detected package manager {candidate} in {image}");
                return Ok(candidate);
            }
            Ok(out) => debug!("probe '{spec}' failed: {}", out.status_text()),
            Err(e) => error!("problem running '{spec}': {e}"),
        }
    }

    error!("could not automatically determine the package manager of {image}");
    Err(RuntimeError::UnknownPackageManager(image))
}

/// Rewrite a `name[=version]` dependency in the manager's pinning syntax.
///
/// Never fails: unsupported managers and malformed specs are recorded in
/// `diagnostics` and the input is returned unchanged.
pub fn version_syntax(dep: &str, manager: &PackageManager, diagnostics: &mut Diagnostics) -> String {
    match split_spec(dep) {
        Ok((_, None)) => dep.to_owned(),
        Ok((name, Some(version))) => match manager.version_pin() {
            Some(VersionPin::Equals) => format!("{name}={version}"),
            Some(VersionPin::Dash) => format!("{name}-{version}"),
            Some(VersionPin::Unsupported) => name.to_owned(),
            None => {
                diagnostics.warn(format!(
                    "cannot determine the version operator of package manager '{manager}', \
                     passing '{dep}' through"
                ));
                dep.to_owned()
            }
        },
        Err(SpecError::Malformed { separators, .. }) => {
            diagnostics.error(format!(
                "dependency '{dep}' has {separators} version separators, passing it through"
            ));
            dep.to_owned()
        }
    }
}

/// Command that empties the manager's download cache after installing.
pub fn cleanup_command(manager: &PackageManager, diagnostics: &mut Diagnostics) -> String {
    match manager {
        PackageManager::AptGet => "rm -rf /var/lib/apt/lists/*".to_owned(),
        PackageManager::Yum => "yum clean all".to_owned(),
        PackageManager::Pacman => "pacman -Scc --noconfirm".to_owned(),
        PackageManager::Other(name) => {
            diagnostics.warn(format!(
                "cannot determine how to clear the cache of package manager '{name}'"
            ));
            String::new()
        }
    }
}

/// A dependency install step: preamble, one package per line, cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallBlock {
    pub preamble: String,
    pub packages: Vec<String>,
    pub cleanup: Option<String>,
}

/// Build the dependency install step for `deps`.
///
/// Raw specs are sorted first so the output does not depend on option order.
/// `install_override` replaces the manager preamble verbatim. Returns `None`
/// when there is nothing to install or no usable install command.
pub fn render_install(
    deps: &[String],
    manager: &PackageManager,
    install_override: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> Option<InstallBlock> {
    if deps.is_empty() {
        return None;
    }

    let preamble = match (install_override, manager.install_preamble()) {
        (Some(custom), _) => custom.to_owned(),
        (None, Some(default)) => default.to_owned(),
        (None, None) => {
            diagnostics.error(format!(
                "no install command known for package manager '{manager}' \
                 (set {}), omitting dependencies",
                options::PACKAGE_MANAGER_INSTALL
            ));
            return None;
        }
    };

    let mut sorted: Vec<&String> = deps.iter().collect();
    sorted.sort();
    let packages = sorted
        .into_iter()
        .map(|dep| version_syntax(dep, manager, diagnostics))
        .collect();

    let cleanup = cleanup_command(manager, diagnostics);
    Some(InstallBlock {
        preamble,
        packages,
        cleanup: (!cleanup.is_empty()).then_some(cleanup),
    })
}
