use super::{json_pretty, load_config, CliError, EXIT_SUCCESS};
use std::path::Path;
use stevedore_runtime::{detect, SystemRunner};
use stevedore_schema::options;

pub fn run(config_path: &Path, overrides: &[String], json: bool) -> Result<u8, CliError> {
    let config = load_config(config_path, overrides)?;
    let manager = detect(&config, &SystemRunner::new())?;

    if json {
        let payload = serde_json::json!({
            "image": config.value(options::BASE_IMAGE),
            "package_manager": manager.name(),
            "known": manager.is_known(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{manager}");
    }
    Ok(EXIT_SUCCESS)
}
