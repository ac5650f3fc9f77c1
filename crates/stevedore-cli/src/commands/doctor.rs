use super::{CliError, EXIT_FAILURE, EXIT_SUCCESS};
use std::path::Path;
use stevedore_runtime::{check_builder_prereqs, format_missing, SystemRunner};
use stevedore_schema::{options, Configuration};

pub fn run(config_path: Option<&Path>, builder: Option<&str>, json_output: bool) -> Result<u8, CliError> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    let config = config_path.and_then(|path| check_config(path, &mut checks, &mut all_pass));
    let builder = builder.map_or_else(
        || {
            config
                .as_ref()
                .map_or_else(|| options::DEFAULT_BUILDER.to_owned(), Configuration::builder)
        },
        str::to_owned,
    );
    check_builder(&builder, &mut checks, &mut all_pass);

    print_results(&checks, all_pass, json_output)
}

fn check_config(path: &Path, checks: &mut Vec<Check>, all_pass: &mut bool) -> Option<Configuration> {
    let config = match Configuration::load(path) {
        Ok(config) => {
            checks.push(Check::pass(
                "config_parse",
                &format!("Option file {} parses", path.display()),
            ));
            config
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "config_parse",
                &format!("Option file {} is invalid: {e}", path.display()),
            ));
            return None;
        }
    };

    match config.value(options::BASE_IMAGE) {
        Some(image) => checks.push(Check::pass("base_image", &format!("Base image: {image}"))),
        None => {
            *all_pass = false;
            checks.push(Check::fail(
                "base_image",
                &format!("{} is not set", options::BASE_IMAGE),
            ));
        }
    }

    if config.is_on(options::COMPONENT_INSTALL) {
        let components = config.components();
        if components.is_empty() {
            *all_pass = false;
            checks.push(Check::fail(
                "components",
                &format!(
                    "{} is on but no components are declared",
                    options::COMPONENT_INSTALL
                ),
            ));
        } else {
            let grouped = components.iter().filter(|c| c.group.is_some()).count();
            checks.push(Check::info(
                "components",
                &format!("{} components ({grouped} grouped)", components.len()),
            ));
        }
    }

    if !config.list(options::PACKAGE_DEPENDS).is_empty()
        && config.value(options::PACKAGE_MANAGER).is_none()
    {
        checks.push(Check::info(
            "package_manager",
            "Package manager will be detected by probing the base image",
        ));
    }

    Some(config)
}

fn check_builder(builder: &str, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let missing = check_builder_prereqs(&SystemRunner::new(), builder);
    if missing.is_empty() {
        checks.push(Check::pass(
            "builder",
            &format!("Image builder '{builder}' is available"),
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail("builder", &format_missing(&missing)));
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, CliError> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("Stevedore Doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn pass(name: &'static str, message: &str) -> Self {
        Self {
            name,
            status: "pass",
            message: message.to_owned(),
        }
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self {
            name,
            status: "fail",
            message: message.to_owned(),
        }
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self {
            name,
            status: "info",
            message: message.to_owned(),
        }
    }
}
