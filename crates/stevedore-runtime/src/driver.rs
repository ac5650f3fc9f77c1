use crate::command::{CommandOutput, CommandRunner, CommandSpec};
use crate::RuntimeError;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use stevedore_schema::ImageTag;
use tracing::{error, info, warn};

/// Result of an optional build or delete step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepStatus {
    Skipped,
    Succeeded,
    Failed {
        message: String,
        log: Option<PathBuf>,
    },
}

impl StepStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Map a step result onto a status.
    pub fn from_result(result: &Result<(), RuntimeError>) -> Self {
        match result {
            Ok(()) => Self::Succeeded,
            Err(e) => Self::Failed {
                message: e.to_string(),
                log: match e {
                    RuntimeError::CommandFailed { log, .. } => log.clone(),
                    _ => None,
                },
            },
        }
    }
}

/// Drives an external image builder (`docker`, `podman`, ...) over a
/// generated build context.
pub struct BuildDriver<'r> {
    runner: &'r dyn CommandRunner,
    builder: String,
}

impl<'r> BuildDriver<'r> {
    pub fn new(runner: &'r dyn CommandRunner, builder: impl Into<String>) -> Self {
        Self {
            runner,
            builder: builder.into(),
        }
    }

    pub fn build_command(&self, dockerfile: &Path, context: &Path, tag: &ImageTag) -> CommandSpec {
        CommandSpec::new(&self.builder)
            .arg("build")
            .arg("-f")
            .arg(dockerfile.to_string_lossy())
            .arg("-t")
            .arg(tag.as_str())
            .arg(context.to_string_lossy())
            .current_dir(context)
    }

    pub fn delete_command(&self, context: &Path, tag: &ImageTag) -> CommandSpec {
        CommandSpec::new(&self.builder)
            .arg("rmi")
            .arg(tag.as_str())
            .current_dir(context)
    }

    /// Build `tag` from `dockerfile`. On failure a `<tag>-build.log` is
    /// written into `context`.
    pub fn build(&self, dockerfile: &Path, context: &Path, tag: &ImageTag) -> Result<(), RuntimeError> {
        info!("building image {tag}");
        let spec = self.build_command(dockerfile, context, tag);
        self.run_logged(&spec, &context.join(format!("{tag}-build.log")))
    }

    /// Remove image `tag`. On failure a `<tag>-delete.log` is written into
    /// `context`.
    pub fn delete(&self, context: &Path, tag: &ImageTag) -> Result<(), RuntimeError> {
        info!("deleting image {tag}");
        let spec = self.delete_command(context, tag);
        self.run_logged(&spec, &context.join(format!("{tag}-delete.log")))
    }

    fn run_logged(&self, spec: &CommandSpec, log_path: &Path) -> Result<(), RuntimeError> {
        let (status, output) = match self.runner.run(spec) {
            Ok(out) if out.success() => return Ok(()),
            Ok(out) => (out.status_text(), Ok(out)),
            Err(e) => (format!("failed to start: {e}"), Err(e)),
        };

        let log = match write_diagnostic_log(log_path, spec, &status, output.as_ref().ok()) {
            Ok(()) => Some(log_path.to_path_buf()),
            Err(e) => {
                warn!("failed to write diagnostic log {}: {e}", log_path.display());
                None
            }
        };
        error!(
            "problem running '{spec}' ({status}), see {}",
            log.as_deref()
                .map_or_else(|| "the output above".to_owned(), |p| p.display().to_string())
        );
        Err(RuntimeError::CommandFailed {
            command: spec.command_line(),
            status,
            log,
        })
    }
}

fn write_diagnostic_log(
    path: &Path,
    spec: &CommandSpec,
    status: &str,
    output: Option<&CommandOutput>,
) -> Result<(), std::io::Error> {
    let mut body = String::new();
    let _ = writeln!(body, "# stevedore diagnostic log");
    let _ = writeln!(body, "# date: {}", chrono::Utc::now().to_rfc3339());
    let _ = writeln!(body, "# command: {}", spec.command_line());
    let _ = writeln!(
        body,
        "# working directory: {}",
        spec.cwd
            .as_deref()
            .map_or_else(|| ".".to_owned(), |p| p.display().to_string())
    );
    let _ = writeln!(body, "# status: {status}");
    let _ = writeln!(body, "# output:");
    if let Some(out) = output {
        body.push_str(&out.output);
        if !out.output.ends_with('\n') {
            body.push('\n');
        }
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body)
}
