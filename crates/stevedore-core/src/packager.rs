use crate::compose::ComposeContext;
use crate::fsutil::{enumerate_files, relocate_tree_excluding, write_atomic};
use crate::generator::PackageGenerator;
use crate::partition::{plan_partitions, PackagingMode, PartitionPlan, PartitionSource};
use crate::CoreError;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stevedore_runtime::{BuildDriver, CommandRunner, StepStatus};
use stevedore_schema::{options, Configuration, Diagnostic, Diagnostics, ImageTag, PartitionName};
use tracing::{error, info, warn};

pub const DOCKERFILE_NAME: &str = "Dockerfile";
/// Directory inside each build context that holds the installed files.
pub const TREE_DIR: &str = "root";

/// What happened to one partition.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionOutcome {
    pub partition: PartitionName,
    pub artifact_name: String,
    /// Build context directory: `<output>/<artifact_name>`.
    pub context: PathBuf,
    pub dockerfile: Option<PathBuf>,
    /// Installed files, relative to the tree directory.
    pub files: Vec<PathBuf>,
    pub image_tag: ImageTag,
    pub package_manager: Option<String>,
    pub build: StepStatus,
    pub delete: StepStatus,
    pub diagnostics: Vec<Diagnostic>,
    pub error: Option<String>,
}

impl PartitionOutcome {
    fn new(plan: &PartitionPlan, context: PathBuf, image_tag: ImageTag) -> Self {
        Self {
            partition: plan.name.clone(),
            artifact_name: plan.artifact_name.clone(),
            context,
            dockerfile: None,
            files: Vec::new(),
            image_tag,
            package_manager: None,
            build: StepStatus::Skipped,
            delete: StepStatus::Skipped,
            diagnostics: Vec::new(),
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none() && !self.build.is_failed() && !self.delete.is_failed()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub generator: String,
    pub mode: PackagingMode,
    pub outcomes: Vec<PartitionOutcome>,
    /// True only when every partition succeeded.
    pub success: bool,
}

impl PackageReport {
    pub fn failed(&self) -> impl Iterator<Item = &PartitionOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

/// Runs a generator over every partition of a staging tree.
pub struct Packager {
    generator: Box<dyn PackageGenerator>,
    runner: Arc<dyn CommandRunner>,
}

impl Packager {
    pub fn new(generator: Box<dyn PackageGenerator>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { generator, runner }
    }

    pub fn generator(&self) -> &dyn PackageGenerator {
        self.generator.as_ref()
    }

    /// Package `staging` into per-partition build contexts under `output`.
    ///
    /// Configuration problems that affect every partition are returned as
    /// errors. A partition that fails is recorded in the report and the
    /// remaining partitions are still attempted.
    pub fn run(
        &self,
        config: &Configuration,
        staging: &Path,
        output: &Path,
    ) -> Result<PackageReport, CoreError> {
        config.require(options::BASE_IMAGE)?;
        if !staging.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("staging directory {} does not exist", staging.display()),
            )
            .into());
        }

        let extension = self.generator.output_extension();
        let (mode, plans) =
            plan_partitions(config, self.generator.supports_components(), extension)?;
        info!(
            "packaging {} partition(s) with the {} generator",
            plans.len(),
            self.generator.name()
        );

        let outcomes: Vec<PartitionOutcome> = plans
            .iter()
            .map(|plan| self.package_partition(config, plan, staging, output))
            .collect();
        let success = outcomes.iter().all(PartitionOutcome::succeeded);

        Ok(PackageReport {
            generator: self.generator.name().to_owned(),
            mode,
            outcomes,
            success,
        })
    }

    fn package_partition(
        &self,
        config: &Configuration,
        plan: &PartitionPlan,
        staging: &Path,
        output: &Path,
    ) -> PartitionOutcome {
        info!("packaging partition {}", plan.name);
        let context = output.join(&plan.artifact_name);
        let tag = ImageTag::from_artifact(&plan.artifact_name, self.generator.output_extension());
        let mut outcome = PartitionOutcome::new(plan, context, tag);
        let mut diagnostics = Diagnostics::new();

        match self.stage(config, plan, staging, output, &mut outcome, &mut diagnostics) {
            Ok(dockerfile) => self.build(config, &dockerfile, &mut outcome),
            Err(e) => {
                error!("partition {} failed: {e}", plan.name);
                outcome.error = Some(e.to_string());
            }
        }

        outcome.diagnostics = diagnostics.into_vec();
        outcome
    }

    /// Lay out the build context and write its Dockerfile.
    ///
    /// `output` may lie inside `staging`; it is left out of every copy.
    fn stage(
        &self,
        config: &Configuration,
        plan: &PartitionPlan,
        staging: &Path,
        output: &Path,
        outcome: &mut PartitionOutcome,
        diagnostics: &mut Diagnostics,
    ) -> Result<PathBuf, CoreError> {
        let context = outcome.context.clone();
        if context.exists() {
            fs::remove_dir_all(&context)?;
        }
        let tree = context.join(TREE_DIR);
        fs::create_dir_all(&tree)?;

        match &plan.source {
            PartitionSource::WholeTree => {
                relocate_tree_excluding(staging, &tree, &[output])?;
            }
            PartitionSource::Components(names) => {
                for name in names {
                    let src = staging.join(name);
                    if src.is_dir() {
                        relocate_tree_excluding(&src, &tree, &[output])?;
                    } else {
                        diagnostics.warn(format!(
                            "component {name} has no installed tree at {}",
                            src.display()
                        ));
                    }
                }
            }
        }

        let composition = self.generator.compose(
            config,
            &ComposeContext::with_install_tree(TREE_DIR),
            diagnostics,
        )?;
        outcome.package_manager = composition.package_manager.as_ref().map(ToString::to_string);

        let dockerfile = context.join(DOCKERFILE_NAME);
        write_atomic(&dockerfile, composition.text.as_bytes())?;
        outcome.dockerfile = Some(dockerfile.clone());

        let files = enumerate_files(&tree)?;
        if files.is_empty() {
            return Err(CoreError::DirectoryEnumeration {
                partition: plan.name.to_string(),
                path: tree,
            });
        }
        outcome.files = files;
        Ok(dockerfile)
    }

    fn build(&self, config: &Configuration, dockerfile: &Path, outcome: &mut PartitionOutcome) {
        if !config.is_on(options::BUILD_CONTAINER) {
            if config.is_on(options::DELETE_CONTAINER) {
                warn!(
                    "{} is set without {}, nothing to delete",
                    options::DELETE_CONTAINER,
                    options::BUILD_CONTAINER
                );
            }
            return;
        }

        let driver = BuildDriver::new(self.runner.as_ref(), config.builder());
        let built = driver.build(dockerfile, &outcome.context, &outcome.image_tag);
        outcome.build = StepStatus::from_result(&built);

        if built.is_ok() && config.is_on(options::DELETE_CONTAINER) {
            let deleted = driver.delete(&outcome.context, &outcome.image_tag);
            outcome.delete = StepStatus::from_result(&deleted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::DockerGenerator;
    use stevedore_runtime::MockRunner;

    fn packager(runner: Arc<MockRunner>) -> Packager {
        Packager::new(Box::new(DockerGenerator::new(runner.clone())), runner)
    }

    fn staging_with(components: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (component, file) in components {
            let path = dir.path().join(component).join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, component).unwrap();
        }
        dir
    }

    fn config() -> Configuration {
        Configuration::new()
            .with_option("BASE_IMAGE", "debian:bookworm")
            .with_option("PACKAGE_FILE_NAME", "app-1.0")
    }

    #[test]
    fn monolithic_run_writes_context() {
        let staging = staging_with(&[("usr", "bin/app")]);
        let out = tempfile::tempdir().unwrap();
        let runner = Arc::new(MockRunner::new());

        let report = packager(runner.clone())
            .run(&config(), staging.path(), out.path())
            .unwrap();

        assert!(report.success);
        assert_eq!(report.mode, PackagingMode::Monolithic);
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.context, out.path().join("app-1.0"));
        assert_eq!(outcome.files, vec![PathBuf::from("usr/bin/app")]);
        assert_eq!(outcome.build, StepStatus::Skipped);

        let dockerfile = fs::read_to_string(out.path().join("app-1.0/Dockerfile")).unwrap();
        assert!(dockerfile.contains("COPY root/ /\n"));
        assert!(out.path().join("app-1.0/root/usr/bin/app").is_file());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn missing_base_image_is_fatal() {
        let staging = staging_with(&[("usr", "bin/app")]);
        let out = tempfile::tempdir().unwrap();
        let result = packager(Arc::new(MockRunner::new())).run(
            &Configuration::new(),
            staging.path(),
            out.path(),
        );
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn missing_staging_is_fatal() {
        let out = tempfile::tempdir().unwrap();
        let result = packager(Arc::new(MockRunner::new())).run(
            &config(),
            &out.path().join("nope"),
            out.path(),
        );
        assert!(matches!(result, Err(CoreError::Io(_))));
    }

    #[test]
    fn empty_partition_fails_alone() {
        let staging = staging_with(&[("lib", "usr/lib/libapp.so")]);
        let out = tempfile::tempdir().unwrap();
        let config = config()
            .with_option("COMPONENT_INSTALL", "ON")
            .with_option("COMPONENTS_IGNORE_GROUPS", "ON")
            .with_option("COMPONENTS", "lib;docs");

        let report = packager(Arc::new(MockRunner::new()))
            .run(&config, staging.path(), out.path())
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.outcomes.len(), 2);
        let docs = &report.outcomes[0];
        assert_eq!(docs.partition, "docs");
        assert!(docs.error.as_deref().unwrap().contains("'docs'"));
        assert_eq!(docs.diagnostics.len(), 1);
        let lib = &report.outcomes[1];
        assert!(lib.succeeded());
        assert_eq!(report.failed().count(), 1);
    }

    #[test]
    fn build_and_delete_when_enabled() {
        let staging = staging_with(&[("usr", "bin/app")]);
        let out = tempfile::tempdir().unwrap();
        let runner = Arc::new(MockRunner::new());
        let config = config()
            .with_option("BUILD_CONTAINER", "ON")
            .with_option("DELETE_CONTAINER", "ON")
            .with_option("BUILDER_EXECUTABLE", "podman");

        let report = packager(runner.clone())
            .run(&config, staging.path(), out.path())
            .unwrap();

        assert!(report.success);
        let lines = runner.command_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("podman build -f "));
        assert!(lines[0].contains("-t app-1.0"));
        assert_eq!(lines[1], "podman rmi app-1.0");
        assert_eq!(report.outcomes[0].delete, StepStatus::Succeeded);
    }

    #[test]
    fn failed_build_skips_delete() {
        let staging = staging_with(&[("usr", "bin/app")]);
        let out = tempfile::tempdir().unwrap();
        let runner = Arc::new(MockRunner::new().on(" build ", 1, "boom"));
        let config = config()
            .with_option("BUILD_CONTAINER", "ON")
            .with_option("DELETE_CONTAINER", "ON");

        let report = packager(runner.clone())
            .run(&config, staging.path(), out.path())
            .unwrap();

        assert!(!report.success);
        let outcome = &report.outcomes[0];
        assert!(outcome.build.is_failed());
        assert_eq!(outcome.delete, StepStatus::Skipped);
        assert_eq!(runner.calls().len(), 1);
        assert!(out.path().join("app-1.0/Dockerfile").is_file());
        assert!(out.path().join("app-1.0/app-1.0-build.log").is_file());
    }

    #[test]
    fn output_inside_staging_is_not_copied() {
        let staging = staging_with(&[("usr", "bin/app")]);
        let out = staging.path().join("out");
        fs::create_dir_all(out.join("other-2.0/root")).unwrap();
        fs::write(out.join("other-2.0/root/leftover"), "x").unwrap();

        for _ in 0..2 {
            let report = packager(Arc::new(MockRunner::new()))
                .run(&config(), staging.path(), &out)
                .unwrap();
            assert!(report.success, "{:?}", report.outcomes[0].error);
            assert_eq!(report.outcomes[0].files, vec![PathBuf::from("usr/bin/app")]);
        }
    }

    #[test]
    fn escaping_package_file_name_touches_nothing() {
        let staging = staging_with(&[("usr", "bin/app")]);
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let precious = root.path().join("victim/precious.txt");
        fs::create_dir_all(precious.parent().unwrap()).unwrap();
        fs::write(&precious, "keep").unwrap();

        let config = config().with_option("PACKAGE_FILE_NAME", "../victim");
        let result = packager(Arc::new(MockRunner::new())).run(&config, staging.path(), &out);

        assert!(matches!(
            result,
            Err(CoreError::Config(stevedore_schema::ConfigError::InvalidValue { ref option, .. }))
                if option == "PACKAGE_FILE_NAME"
        ));
        assert_eq!(fs::read_to_string(&precious).unwrap(), "keep");
    }

    #[test]
    fn rerun_replaces_stale_context() {
        let staging = staging_with(&[("usr", "bin/app")]);
        let out = tempfile::tempdir().unwrap();
        let stale = out.path().join("app-1.0/root/old-file");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();

        let report = packager(Arc::new(MockRunner::new()))
            .run(&config(), staging.path(), out.path())
            .unwrap();
        assert_eq!(report.outcomes[0].files, vec![PathBuf::from("usr/bin/app")]);
        assert!(!stale.exists());
    }
}
