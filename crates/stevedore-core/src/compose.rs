use crate::dockerfile::{quote, Directive, DockerfileDocument};
use crate::CoreError;
use stevedore_runtime::{detect, render_install, CommandRunner, PackageManager, RuntimeError};
use stevedore_schema::{options, ConfigError, Configuration, Diagnostics, LabelSpec};
use tracing::debug;

pub const HEADER: &str = "Autogenerated Dockerfile - do not edit";

/// Per-partition inputs that do not come from the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeContext {
    /// Directory holding the installed tree, relative to the build context.
    pub install_tree: Option<String>,
}

impl ComposeContext {
    pub fn with_install_tree(dir: impl Into<String>) -> Self {
        Self {
            install_tree: Some(dir.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Composition {
    pub document: DockerfileDocument,
    pub text: String,
    /// The manager used for the dependency section, if one was rendered or
    /// detected.
    pub package_manager: Option<PackageManager>,
}

/// Render the Dockerfile described by `config`.
///
/// Only an unusable `BASE_IMAGE` is fatal. Every other problem is recorded in
/// `diagnostics` and the affected entry or section is degraded or omitted.
/// Values written unquoted must fit on one line; entries with a line break
/// are dropped with an error.
pub fn compose(
    config: &Configuration,
    context: &ComposeContext,
    runner: &dyn CommandRunner,
    diagnostics: &mut Diagnostics,
) -> Result<Composition, CoreError> {
    let base_image = config.require(options::BASE_IMAGE)?;
    if has_line_break(&base_image) {
        return Err(ConfigError::InvalidValue {
            option: options::BASE_IMAGE.to_owned(),
            reason: "image reference contains a line break".to_owned(),
        }
        .into());
    }
    let mut doc = DockerfileDocument::new().with_header(HEADER);

    doc.set(Directive::From(base_image));
    if let Some(maintainer) = single_line(config, options::MAINTAINER, diagnostics) {
        doc.set(Directive::Maintainer(maintainer));
    }

    let labels = labels(config, diagnostics);
    if !labels.is_empty() {
        doc.set(Directive::Label(labels));
    }

    let env = env_vars(config, diagnostics);
    if !env.is_empty() {
        doc.set(Directive::Env(env));
    }

    if let Some(tree) = &context.install_tree {
        let destination = single_line(config, options::INSTALL_PREFIX, diagnostics)
            .unwrap_or_else(|| "/".to_owned());
        doc.set(Directive::Copy {
            source: format!("{}/", tree.trim_end_matches('/')),
            destination,
        });
    }

    set_list(&mut doc, single_line_list(config, options::VOLUME, diagnostics), Directive::Volume);
    set_list(&mut doc, single_line_list(config, options::EXPOSE, diagnostics), Directive::Expose);
    set_list(
        &mut doc,
        single_line_list(config, options::RUN_PREDEPENDS, diagnostics),
        Directive::PreDepends,
    );

    let package_manager = dependencies(&mut doc, config, runner, diagnostics)?;

    if let Some(user) = single_line(config, options::USER, diagnostics) {
        doc.set(Directive::User(user));
    }
    if let Some(dir) = single_line(config, options::WORKDIR, diagnostics) {
        doc.set(Directive::Workdir(dir));
    }
    set_list(
        &mut doc,
        single_line_list(config, options::RUN_POSTDEPENDS, diagnostics),
        Directive::PostDepends,
    );
    set_list(&mut doc, single_line_list(config, options::ONBUILD, diagnostics), Directive::Onbuild);
    // exec form is JSON-encoded, line breaks included
    set_list(&mut doc, config.list(options::ENTRYPOINT), Directive::Entrypoint);
    set_list(&mut doc, config.list(options::CMD), Directive::Cmd);

    let text = doc.render();
    debug!("composed Dockerfile with {} sections", doc.len());
    Ok(Composition {
        document: doc,
        text,
        package_manager,
    })
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\n', '\r'])
}

fn single_line(config: &Configuration, option: &str, diagnostics: &mut Diagnostics) -> Option<String> {
    let value = config.value(option)?;
    if has_line_break(&value) {
        diagnostics.error(format!("{option} contains a line break, ignoring it"));
        return None;
    }
    Some(value)
}

fn single_line_list(config: &Configuration, option: &str, diagnostics: &mut Diagnostics) -> Vec<String> {
    config
        .list(option)
        .into_iter()
        .filter(|item| {
            if has_line_break(item) {
                diagnostics.error(format!("{option} entry {item:?} contains a line break, skipping it"));
                false
            } else {
                true
            }
        })
        .collect()
}

fn set_list(doc: &mut DockerfileDocument, items: Vec<String>, make: fn(Vec<String>) -> Directive) {
    if !items.is_empty() {
        doc.set(make(items));
    }
}

fn labels(config: &Configuration, diagnostics: &mut Diagnostics) -> Vec<String> {
    let mut entries: Vec<String> = [
        ("name", options::CONTAINER_NAME),
        ("version", options::CONTAINER_VERSION),
        ("description", options::CONTAINER_DESCRIPTION),
        ("website", options::CONTAINER_HOMEPAGE),
    ]
    .into_iter()
    .filter_map(|(key, option)| config.value(option).map(|v| format!("{key}={}", quote(&v))))
    .collect();

    for raw in config.list(options::LABEL) {
        match LabelSpec::parse(&raw) {
            Ok(label) if !label.key.is_empty() && !has_line_break(&label.key) => entries.push(format!(
                "{}={}",
                label.key,
                quote(label.value.as_deref().unwrap_or_default())
            )),
            _ if has_line_break(&raw) => {
                diagnostics.error(format!("label {raw:?} contains a line break, skipping it"));
            }
            Ok(_) => {
                diagnostics.warn(format!("label '{raw}' has an empty key, passing it through"));
                entries.push(raw);
            }
            Err(e) => {
                diagnostics.warn(format!("malformed label: {e}, passing it through"));
                entries.push(raw);
            }
        }
    }
    entries
}

fn env_vars(config: &Configuration, diagnostics: &mut Diagnostics) -> Vec<(String, String)> {
    let mut vars = Vec::new();
    for raw in config.list(options::ENV) {
        match raw.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() && !has_line_break(key) => {
                vars.push((key.trim().to_owned(), value.to_owned()));
            }
            _ => diagnostics.error(format!(
                "{} entry {raw:?} is not of the form KEY=VALUE, skipping it",
                options::ENV
            )),
        }
    }
    vars
}

/// Add the dependency install section. Detection runs only when there is
/// something to install.
fn dependencies(
    doc: &mut DockerfileDocument,
    config: &Configuration,
    runner: &dyn CommandRunner,
    diagnostics: &mut Diagnostics,
) -> Result<Option<PackageManager>, CoreError> {
    let deps = single_line_list(config, options::PACKAGE_DEPENDS, diagnostics);
    if deps.is_empty() {
        return Ok(config
            .value(options::PACKAGE_MANAGER)
            .map(|name| PackageManager::from_name(&name)));
    }

    let manager = match detect(config, runner) {
        Ok(manager) => manager,
        Err(RuntimeError::UnknownPackageManager(image)) => {
            diagnostics.error(format!(
                "could not determine the package manager of '{image}' (set {}), \
                 omitting dependencies",
                options::PACKAGE_MANAGER
            ));
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    debug!("package manager: {manager}");

    let install_override = single_line(config, options::PACKAGE_MANAGER_INSTALL, diagnostics);
    if let Some(block) = render_install(&deps, &manager, install_override.as_deref(), diagnostics) {
        doc.set(Directive::Dependencies(block));
    }
    Ok(Some(manager))
}
