//! External process plumbing for Stevedore.
//!
//! This crate implements everything that talks to the outside world through
//! commands: the `CommandRunner` capability (a real `SystemRunner` and a
//! scripted `MockRunner`), the package-manager adapter that detects the
//! install tool of a base image and renders manager-specific install syntax,
//! the `BuildDriver` that builds and deletes images with an external builder,
//! and builder prerequisite checks.

pub mod command;
pub mod driver;
pub mod mock;
pub mod package_manager;
pub mod prereq;

pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use driver::{BuildDriver, StepStatus};
pub use mock::MockRunner;
pub use package_manager::{
    cleanup_command, detect, render_install, version_syntax, InstallBlock, PackageManager,
    VersionPin,
};
pub use prereq::{check_builder_prereqs, format_missing, MissingPrereq};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] stevedore_schema::ConfigError),
    #[error("command execution failed: {0}")]
    ExecFailed(String),
    #[error("could not determine the package manager of image '{0}'")]
    UnknownPackageManager(String),
    #[error("command failed ({status}): {command}")]
    CommandFailed {
        command: String,
        status: String,
        log: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_display_has_command_line() {
        let e = RuntimeError::CommandFailed {
            command: "docker build -t app .".to_owned(),
            status: "exit status 1".to_owned(),
            log: None,
        };
        let msg = e.to_string();
        assert!(msg.contains("docker build -t app ."));
        assert!(msg.contains("exit status 1"));
    }

    #[test]
    fn unknown_package_manager_display_names_image() {
        let e = RuntimeError::UnknownPackageManager("scratch".to_owned());
        assert!(e.to_string().contains("scratch"));
    }
}
