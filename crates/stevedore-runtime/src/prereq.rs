use crate::command::{CommandRunner, CommandSpec};
use std::fmt;
use tracing::debug;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn responds_to_version(runner: &dyn CommandRunner, program: &str) -> bool {
    match runner.run(&CommandSpec::new(program).arg("--version")) {
        Ok(out) => {
            debug!("{program} --version: {}", out.output.trim());
            out.success()
        }
        Err(e) => {
            debug!("{program} unavailable: {e}");
            false
        }
    }
}

/// Check what building images with `builder` needs.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_builder_prereqs(runner: &dyn CommandRunner, builder: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !responds_to_version(runner, builder) {
        missing.push(MissingPrereq {
            name: builder.to_owned(),
            purpose: "building, probing and deleting container images",
            install_hint: "zypper install docker | apt install docker.io | dnf install podman | pacman -S docker, or set BUILDER_EXECUTABLE",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str(
        "\nStevedore needs an image builder to detect package managers and build images.",
    );
    msg
}
