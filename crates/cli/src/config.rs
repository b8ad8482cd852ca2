use std::{
    fs, io,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::known_paths::OptionalPathExt;

pub mod known_paths;

pub use known_paths::KnownDirs;

#[derive(Debug, clap::Args, Deserialize, Default)]
#[group(multiple = true)]
#[serde(default)]
pub struct Options {
    /// Allow the driver script to install packages into the external Python
    /// environment?
    #[clap(long, help_heading = "Configuration", action = clap::ArgAction::SetTrue)]
    pub(crate) allow_modify_external_python: bool,

    /// Python environment passed to Blender via --env-system-python.
    #[clap(long, help_heading = "Configuration", value_hint = clap::ValueHint::DirPath)]
    pub(crate) python_env: Option<Box<Path>>,

    /// Override the path to the driver script injected with --python.
    #[clap(long, help_heading = "Configuration", value_hint = clap::ValueHint::FilePath)]
    pub(crate) driver_script: Option<Box<Path>>,

    /// Addon workspace folder probed for modules to load [repeatable option]
    #[clap(
        long("addon-dir"),
        action = clap::ArgAction::Append,
        help_heading = "Configuration",
        value_hint = clap::ValueHint::DirPath
    )]
    pub(crate) addon_dirs: Vec<PathBuf>,

    /// Fixed port for the editor communication server; ephemeral if unset.
    #[clap(long, help_heading = "Configuration")]
    pub(crate) editor_port: Option<u16>,

    /// Override the path to the executable registry file.
    #[clap(long, help_heading = "Configuration", value_hint = clap::ValueHint::FilePath)]
    pub(crate) registry_file: Option<Box<Path>>,
}

pub struct Config {
    pub options: Options,
    pub known_dirs: KnownDirs,
}

impl Config {
    pub fn log_dir(&self) -> Option<Box<Path>> {
        self.known_dirs.data_dir().join("logs")
    }

    /// Location of the writable executable registry.
    pub fn registry_file(&self) -> Option<Box<Path>> {
        self.options
            .registry_file
            .clone()
            .or_else(|| self.known_dirs.config_local_dir().join("executables.toml"))
    }

    pub fn python_env(&self) -> Option<&Path> {
        self.options.python_env.as_deref()
    }

    /// Resolve the driver script: explicit override first, then the first
    /// `launch.py` found across the known search directories.
    pub fn driver_script(&self) -> Option<Box<Path>> {
        self.options.driver_script.clone().or_else(|| {
            self.known_dirs
                .driver_script_dirs()
                .map(|dir| dir.join("launch.py").into_boxed_path())
                .find(|path| path.exists())
        })
    }

    pub fn addon_dirs(&self) -> &[PathBuf] {
        &self.options.addon_dirs
    }

    /// The workspace folder a launch was requested from.
    pub fn workspace_dir(&self) -> Box<Path> {
        self.known_dirs
            .cwd()
            .unwrap_or_else(|| Box::from(Path::new(".")))
    }
}

impl Options {
    pub fn merge(self, other: Self) -> Self {
        Self {
            allow_modify_external_python: other.allow_modify_external_python
                || self.allow_modify_external_python,
            python_env: other.python_env.or(self.python_env),
            driver_script: other.driver_script.or(self.driver_script),
            addon_dirs: if other.addon_dirs.is_empty() {
                self.addon_dirs
            } else {
                other.addon_dirs
            },
            editor_port: other.editor_port.or(self.editor_port),
            registry_file: other.registry_file.or(self.registry_file),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let encoded_toml = fs::read_to_string(path)?;
        let toml = toml::from_str(&encoded_toml)?;

        Ok(toml)
    }

    /// Layers options from every file in `files`, later files winning.
    /// Missing files are skipped; anything else unreadable is reported and
    /// merged as defaults.
    pub fn from_files<P: AsRef<Path>>(files: impl IntoIterator<Item = P>) -> Options {
        let mut config = Options::default();

        for file in files.into_iter() {
            let path = file.as_ref();
            debug!(?path, "searching for configuration in");

            match Options::from_file(path) {
                Ok(item) => config = config.merge(item),
                Err(error) => {
                    let missing = error
                        .downcast_ref::<io::Error>()
                        .is_some_and(|inner| inner.kind() == io::ErrorKind::NotFound);

                    if missing {
                        debug!(?path, "no configuration file present");
                    } else {
                        error!(?path, ?error, "failed to load configuration");
                    }
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use assert_fs::prelude::*;

    use super::*;

    #[test]
    fn later_options_win_when_merging() {
        let base = Options {
            allow_modify_external_python: false,
            python_env: Some(Box::from(Path::new("/env/base"))),
            editor_port: Some(6000),
            ..Default::default()
        };

        let overlay = Options {
            allow_modify_external_python: true,
            python_env: Some(Box::from(Path::new("/env/overlay"))),
            ..Default::default()
        };

        let merged = base.merge(overlay);

        assert!(merged.allow_modify_external_python);
        assert_eq!(merged.python_env.as_deref(), Some(Path::new("/env/overlay")));
        assert_eq!(merged.editor_port, Some(6000));
    }

    #[test]
    fn options_parse_from_a_toml_file() {
        let file = assert_fs::NamedTempFile::new("blaunch.toml").unwrap();
        file.write_str(
            r#"
            allow_modify_external_python = true
            python_env = "/home/user/.conda/envs/blender"
            addon_dirs = ["/w/my_addon"]
            editor_port = 6001
            "#,
        )
        .unwrap();

        let options = Options::from_file(file.path()).unwrap();

        assert!(options.allow_modify_external_python);
        assert_eq!(options.editor_port, Some(6001));
        assert_eq!(options.addon_dirs, [Path::new("/w/my_addon")]);
    }

    #[test]
    fn unreadable_files_merge_as_defaults() {
        let options = Options::from_files(["/does/not/exist/blaunch.toml"]);

        assert!(!options.allow_modify_external_python);
        assert!(options.python_env.is_none());
    }

    #[test]
    fn later_files_win_when_layering() {
        let base = assert_fs::NamedTempFile::new("base.toml").unwrap();
        base.write_str(
            r#"
            python_env = "/env/base"
            editor_port = 6000
            "#,
        )
        .unwrap();

        let overlay = assert_fs::NamedTempFile::new("overlay.toml").unwrap();
        overlay.write_str(r#"python_env = "/env/overlay""#).unwrap();

        let options = Options::from_files([base.path(), overlay.path()]);

        assert_eq!(options.python_env.as_deref(), Some(Path::new("/env/overlay")));
        assert_eq!(options.editor_port, Some(6000));
    }
}
