use super::{
    colorize_status, json_pretty, load_config, skip_prereqs, spin_fail, spin_ok, spinner, CliError,
    EXIT_PARTITION_FAILURE, EXIT_SUCCESS,
};
use std::path::Path;
use std::sync::Arc;
use stevedore_core::{select_generator, PackageReport, Packager};
use stevedore_runtime::{check_builder_prereqs, format_missing, CommandRunner, StepStatus, SystemRunner};
use stevedore_schema::options;

pub fn run(
    config_path: &Path,
    overrides: &[String],
    staging: &Path,
    output: &Path,
    generator: &str,
    json: bool,
) -> Result<u8, CliError> {
    let config = load_config(config_path, overrides)?;
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());

    if config.is_on(options::BUILD_CONTAINER) && !skip_prereqs() {
        let missing = check_builder_prereqs(runner.as_ref(), &config.builder());
        if !missing.is_empty() {
            return Err(CliError::Failure(format_missing(&missing)));
        }
    }

    let generator = select_generator(generator, runner.clone())?;
    let packager = Packager::new(generator, runner);

    let pb = if json {
        None
    } else {
        Some(spinner("packaging..."))
    };
    let report = match packager.run(&config, staging, output) {
        Ok(r) => r,
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "packaging failed");
            }
            return Err(e.into());
        }
    };
    if let Some(ref pb) = pb {
        let failed = report.failed().count();
        if failed == 0 {
            spin_ok(pb, &format!("packaged {} partition(s)", report.outcomes.len()));
        } else {
            spin_fail(
                pb,
                &format!("{failed} of {} partition(s) failed", report.outcomes.len()),
            );
        }
    }

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(if report.success {
        EXIT_SUCCESS
    } else {
        EXIT_PARTITION_FAILURE
    })
}

fn step(status: &StepStatus) -> String {
    match status {
        StepStatus::Skipped => colorize_status("skipped"),
        StepStatus::Succeeded => colorize_status("ok"),
        StepStatus::Failed { log: Some(log), .. } => {
            format!("{} (see {})", colorize_status("failed"), log.display())
        }
        StepStatus::Failed { message, log: None } => {
            format!("{}: {message}", colorize_status("failed"))
        }
    }
}

fn print_report(report: &PackageReport) {
    for outcome in &report.outcomes {
        let status = if outcome.succeeded() { "ok" } else { "failed" };
        println!("{} [{}]", outcome.partition, colorize_status(status));
        println!("  context:    {}", outcome.context.display());
        println!("  files:      {}", outcome.files.len());
        if let Some(pm) = &outcome.package_manager {
            println!("  manager:    {pm}");
        }
        println!("  image:      {}", outcome.image_tag);
        println!("  build:      {}", step(&outcome.build));
        println!("  delete:     {}", step(&outcome.delete));
        for d in &outcome.diagnostics {
            println!("  {}: {}", colorize_status(&d.severity.to_string()), d.message);
        }
        if let Some(err) = &outcome.error {
            println!("  error:      {err}");
        }
    }
}
