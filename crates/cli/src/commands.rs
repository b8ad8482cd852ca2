use clap::*;
use launch::{DebugArgs, LaunchArgs, RunArgs};

pub mod info;
pub mod launch;

#[derive(Subcommand, Debug)]
#[command(flatten_help = true)]
pub enum Commands {
    /// Pick a Blender executable and launch it with the editor hook-up.
    #[clap(disable_version_flag = true)]
    Launch(LaunchArgs),

    /// Pick a debug build and launch it under a native debugger.
    #[clap(disable_version_flag = true)]
    Debug(DebugArgs),

    /// Run Blender with caller-supplied arguments instead of the editor defaults.
    #[clap(disable_version_flag = true)]
    Run(RunArgs),

    /// Show the resolved configuration, registry contents and search paths.
    #[clap(disable_version_flag = true)]
    Info,
}
