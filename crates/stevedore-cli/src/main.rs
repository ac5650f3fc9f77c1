mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "stevedore",
    version,
    about = "Deterministic Dockerfile synthesis and component packaging"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Package a staging tree into one build context per partition.
    Package {
        /// Path to the option file.
        #[arg(short, long, default_value = "stevedore.toml")]
        config: PathBuf,
        /// Directory holding the installed tree (one subdirectory per
        /// component when component install is on).
        #[arg(long)]
        staging: PathBuf,
        /// Directory receiving the build contexts.
        #[arg(long)]
        output: PathBuf,
        /// Packaging generator to use.
        #[arg(long, default_value = "docker")]
        generator: String,
        /// Override an option, e.g. `--set BUILD_CONTAINER=ON`.
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
    },
    /// Print the Dockerfile for an option file.
    Render {
        /// Path to the option file.
        #[arg(short, long, default_value = "stevedore.toml")]
        config: PathBuf,
        /// Override an option, e.g. `--set USER=app`.
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
        /// Emit a COPY of this context-relative directory.
        #[arg(long)]
        install_tree: Option<String>,
        /// Write the Dockerfile to this path instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Detect the package manager of the configured base image.
    Detect {
        /// Path to the option file.
        #[arg(short, long, default_value = "stevedore.toml")]
        config: PathBuf,
        /// Override an option, e.g. `--set BASE_IMAGE=fedora:40`.
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
    },
    /// Run diagnostic checks on the builder and an option file.
    Doctor {
        /// Option file to validate.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Builder executable to check when no option file names one.
        #[arg(long)]
        builder: Option<String>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("STEVEDORE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Package {
            config,
            staging,
            output,
            generator,
            set,
        } => commands::package::run(&config, &set, &staging, &output, &generator, json_output),
        Commands::Render {
            config,
            set,
            install_tree,
            output,
        } => commands::render::run(
            &config,
            &set,
            install_tree.as_deref(),
            output.as_deref(),
            json_output,
        ),
        Commands::Detect { config, set } => commands::detect::run(&config, &set, json_output),
        Commands::Doctor { config, builder } => {
            commands::doctor::run(config.as_deref(), builder.as_deref(), json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
