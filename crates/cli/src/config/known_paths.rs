use std::path::{Path, PathBuf};

use directories::ProjectDirs;

#[derive(Debug)]
pub struct KnownDirs {
    /// The current working directory we launched from.
    cwd: Option<Box<Path>>,

    /// The directory containing the binary we launched.
    exe_dir: Option<Box<Path>>,

    /// Linux installation prefix (defaults to /)
    #[cfg(target_os = "linux")]
    prefix: Option<Box<Path>>,

    project_dirs: Option<ProjectDirs>,
}

pub trait OptionalPathExt {
    fn join<P>(&self, path: P) -> Option<Box<Path>>
    where
        P: AsRef<Path>;
}

impl<S: AsRef<Path>> OptionalPathExt for Option<S> {
    fn join<P>(&self, path: P) -> Option<Box<Path>>
    where
        P: AsRef<Path>,
    {
        self.as_ref()
            .map(|parent| parent.as_ref().join(path).into_boxed_path())
    }
}

const PROJECT_QUALIFIER: &str = "com.github";
const PROJECT_ORG: &str = "blaunch";
const PROJECT_NAME: &str = "blaunch";

impl Default for KnownDirs {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir()
                .map(|cwd| cwd.into_boxed_path())
                .ok(),
            exe_dir: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
                .map(PathBuf::into_boxed_path),

            #[cfg(target_os = "linux")]
            prefix: Some(Box::from(Path::new("/"))),
            project_dirs: ProjectDirs::from(PROJECT_QUALIFIER, PROJECT_ORG, PROJECT_NAME),
        }
    }
}

impl KnownDirs {
    pub fn cwd(&self) -> Option<Box<Path>> {
        self.cwd.clone()
    }

    /// Discover the data directory. This location is used to store log files
    /// and bundled driver scripts.
    pub fn data_dir(&self) -> Option<Box<Path>> {
        self.project_dirs
            .as_ref()
            .map(|dirs| Box::from(dirs.data_local_dir()))
            .or(self.cwd.clone())
    }

    /// The writable per-user configuration directory. The executable registry
    /// lives here.
    pub fn config_local_dir(&self) -> Option<Box<Path>> {
        self.project_dirs
            .as_ref()
            .map(|dirs| Box::from(dirs.config_local_dir()))
    }

    /// Discover the candidate paths to blaunch configuration directories,
    /// ordered from least priority to highest.
    ///
    /// These can be one of the following:
    ///
    /// - $PREFIX/etc/blaunch (Linux)
    /// - ./blaunch.toml
    /// - $XDG_CONFIG_DIR:=$HOME/.config/blaunch (Linux)
    /// - %LOCALAPPDATA%/blaunch/config (Windows)
    pub fn config_dirs(&self) -> impl Iterator<Item = Box<Path>> {
        let config_dirs = [
            #[cfg(target_os = "linux")]
            self.prefix.join("etc/blaunch"),
            self.cwd.clone(),
            self.project_dirs
                .as_ref()
                .map(|proj| Box::from(proj.config_local_dir())),
        ];

        config_dirs.into_iter().flatten()
    }

    /// Discover candidate directories holding the driver script, ordered from
    /// highest priority to lowest: the data dir, the directory next to the
    /// binary, then the working directory.
    pub fn driver_script_dirs(&self) -> impl Iterator<Item = Box<Path>> {
        let dirs = [self.data_dir(), self.exe_dir.clone(), self.cwd.clone()];

        dirs.into_iter().flatten()
    }
}
