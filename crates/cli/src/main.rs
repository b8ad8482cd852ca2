use std::{io::stderr, path::PathBuf};

use blaunch_telemetry::TelemetryConfig;
use clap::{ArgAction, Parser};
use tracing::debug;

use crate::{
    commands::{Commands, launch::picker::PickError},
    config::{Config, KnownDirs, Options},
    db::DbContext,
};

mod addons;
mod commands;
mod comms;
pub mod config;
pub mod db;
pub mod output;

#[derive(Parser)]
#[command(
    name = "blaunch",
    version,
    about = "Resolve, validate and launch Blender executables",
    propagate_version = true,
    flatten_help = true
)]
struct Cli {
    #[clap(flatten)]
    config: Options,

    /// Disable console logging.
    #[clap(short, long, action = ArgAction::SetTrue)]
    quiet: bool,

    #[clap(long)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() {
    blaunch_telemetry::install_error_handler();

    let cli = Cli::parse();

    let mut telemetry_config = TelemetryConfig::default();

    if !cli.quiet {
        telemetry_config = telemetry_config.with_console_writer(stderr);
    }

    if let Ok(log_file) = tempfile::tempfile() {
        telemetry_config = telemetry_config.with_file_writer(log_file);
    }

    let _telemetry_guard = blaunch_telemetry::install(telemetry_config);

    let known_dirs = KnownDirs::default();
    let config_sources = known_dirs
        .config_dirs()
        .map(|dir| dir.join("blaunch.toml").into_boxed_path())
        .chain(cli.config_file.map(PathBuf::into_boxed_path));

    let options = Options::from_files(config_sources).merge(cli.config);

    let config = Config {
        known_dirs,
        options,
    };

    let db = DbContext::new(&config);

    let result = blaunch_telemetry::with_root_span("blaunch", "run command", || {
        match cli.command {
            Commands::Launch(args) => commands::launch::launch(db, config, args),
            Commands::Debug(args) => commands::launch::debug(db, config, args),
            Commands::Run(args) => commands::launch::run_custom(db, args),
            Commands::Info => commands::info::info(db, config),
        }
    });

    match result {
        Ok(()) => {}
        // Dismissing a picker aborts the workflow without an error dialog.
        Err(report)
            if report
                .downcast_ref::<PickError>()
                .is_some_and(PickError::is_cancelled) =>
        {
            debug!("selection cancelled, nothing launched");
        }
        Err(report) => {
            eprintln!("Error: {report:?}");
            std::process::exit(1);
        }
    }
}
