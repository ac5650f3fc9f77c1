pub mod completions;
pub mod detect;
pub mod doctor;
pub mod package;
pub mod render;

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use stevedore_core::CoreError;
use stevedore_runtime::RuntimeError;
use stevedore_schema::{parse_assignment, Configuration};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_PARTITION_FAILURE: u8 = 3;

/// A command failure, classified by the exit code it maps to.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or incomplete configuration.
    Config(String),
    Failure(String),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => EXIT_CONFIG_ERROR,
            Self::Failure(_) => EXIT_FAILURE,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Failure(msg) => f.write_str(msg),
        }
    }
}

impl From<String> for CliError {
    fn from(msg: String) -> Self {
        Self::Failure(msg)
    }
}

impl From<RuntimeError> for CliError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::Config(inner) => Self::Config(inner.to_string()),
            other => Self::Failure(other.to_string()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Config(inner) => Self::Config(inner.to_string()),
            CoreError::Runtime(inner) => inner.into(),
            other => Self::Failure(other.to_string()),
        }
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Load the option file and apply `NAME=VALUE` overrides on top.
pub fn load_config(path: &Path, overrides: &[String]) -> Result<Configuration, CliError> {
    let mut config = Configuration::load(path)
        .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
    for raw in overrides {
        let (name, value) = parse_assignment(raw).map_err(|e| CliError::Config(e.to_string()))?;
        config = config.with_option(&name, value);
    }
    Ok(config)
}

/// `STEVEDORE_SKIP_PREREQS=1` disables the builder presence check.
pub fn skip_prereqs() -> bool {
    std::env::var("STEVEDORE_SKIP_PREREQS").as_deref() == Ok("1")
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

pub fn colorize_status(status: &str) -> String {
    use console::Style;
    match status {
        "ok" | "succeeded" => Style::new().green().apply_to(status).to_string(),
        "failed" | "error" => Style::new().red().bold().apply_to(status).to_string(),
        "skipped" => Style::new().dim().apply_to(status).to_string(),
        "warning" => Style::new().yellow().apply_to(status).to_string(),
        other => other.to_owned(),
    }
}
