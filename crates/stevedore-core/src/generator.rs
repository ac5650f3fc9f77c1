use crate::compose::{compose, ComposeContext, Composition};
use crate::CoreError;
use std::sync::Arc;
use stevedore_runtime::CommandRunner;
use stevedore_schema::{Configuration, Diagnostics};

/// Names accepted by [`select_generator`].
pub const GENERATORS: &[&str] = &["docker"];

/// A packaging back end: turns a configuration into a build script.
pub trait PackageGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Suffix appended to artifact names.
    fn output_extension(&self) -> &str {
        ""
    }

    fn supports_components(&self) -> bool;

    fn compose(
        &self,
        config: &Configuration,
        context: &ComposeContext,
        diagnostics: &mut Diagnostics,
    ) -> Result<Composition, CoreError>;
}

/// Produces Dockerfiles. Package-manager detection runs through the
/// injected runner.
pub struct DockerGenerator {
    runner: Arc<dyn CommandRunner>,
}

impl DockerGenerator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl PackageGenerator for DockerGenerator {
    fn name(&self) -> &str {
        "docker"
    }

    fn supports_components(&self) -> bool {
        true
    }

    fn compose(
        &self,
        config: &Configuration,
        context: &ComposeContext,
        diagnostics: &mut Diagnostics,
    ) -> Result<Composition, CoreError> {
        compose(config, context, self.runner.as_ref(), diagnostics)
    }
}

pub fn select_generator(
    name: &str,
    runner: Arc<dyn CommandRunner>,
) -> Result<Box<dyn PackageGenerator>, CoreError> {
    match name {
        "docker" => Ok(Box::new(DockerGenerator::new(runner))),
        other => Err(CoreError::UnknownGenerator(other.to_owned())),
    }
}
