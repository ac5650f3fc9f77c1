use super::{json_pretty, load_config, CliError, EXIT_SUCCESS};
use std::path::Path;
use stevedore_core::{compose, write_atomic, ComposeContext};
use stevedore_runtime::SystemRunner;
use stevedore_schema::Diagnostics;

pub fn run(
    config_path: &Path,
    overrides: &[String],
    install_tree: Option<&str>,
    output: Option<&Path>,
    json: bool,
) -> Result<u8, CliError> {
    let config = load_config(config_path, overrides)?;
    let context = ComposeContext {
        install_tree: install_tree.map(str::to_owned),
    };
    let mut diagnostics = Diagnostics::new();
    let composition = compose(&config, &context, &SystemRunner::new(), &mut diagnostics)?;

    if let Some(path) = output {
        write_atomic(path, composition.text.as_bytes())
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    }

    if json {
        let payload = serde_json::json!({
            "dockerfile": composition.text,
            "path": output,
            "package_manager": composition.package_manager.as_ref().map(ToString::to_string),
            "diagnostics": diagnostics.entries(),
        });
        println!("{}", json_pretty(&payload)?);
    } else if let Some(path) = output {
        println!("wrote {}", path.display());
    } else {
        print!("{}", composition.text);
    }
    Ok(EXIT_SUCCESS)
}
