use std::{
    fs, io,
    path::{Path, PathBuf},
};

use blaunch_env::AddonToLoad;
use rayon::prelude::*;
use thiserror::Error;
use tracing::warn;

use crate::config::Config;

/// A workspace folder that may contain a Blender addon, either as an
/// `__init__.py` package or as a single-module script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonWorkspaceFolder {
    root: PathBuf,
}

#[derive(Debug, Error)]
pub enum AddonError {
    #[error("{0} is not a Blender addon: no module in it declares bl_info")]
    MissingBlInfo(PathBuf),

    #[error("{0} has no usable module name")]
    UnnamedFolder(PathBuf),

    #[error("unexpected IO error probing {path}: {inner}")]
    Io {
        path: PathBuf,
        #[source]
        inner: io::Error,
    },
}

impl AddonWorkspaceFolder {
    /// Every registered addon workspace folder that has an addon entry point.
    /// Folders without one are skipped with a warning; an empty configuration
    /// falls back to the invoking workspace folder.
    pub fn all(config: &Config) -> Vec<Self> {
        let mut roots: Vec<PathBuf> = config.addon_dirs().to_vec();

        if roots.is_empty() {
            roots.push(config.workspace_dir().into_path_buf());
        }

        roots
            .into_iter()
            .map(|root| Self { root })
            .filter(|folder| {
                let usable = folder.has_addon_entry_point();
                if !usable {
                    warn!(path = %folder.root.display(), "folder has no addon entry point, skipping");
                }
                usable
            })
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn has_addon_entry_point(&self) -> bool {
        self.root.join("__init__.py").is_file()
            || self
                .module_candidates()
                .map(|candidates| !candidates.is_empty())
                .unwrap_or(false)
    }

    /// Probes the folder and yields the directory Blender should load it from
    /// together with the addon's module name. A package takes its module name
    /// from the folder; a single-module script takes it from the file stem.
    pub fn load_directory_and_module_name(&self) -> Result<AddonToLoad, AddonError> {
        let package_entry = self.root.join("__init__.py");

        if package_entry.is_file() {
            if !declares_bl_info(&package_entry)? {
                return Err(AddonError::MissingBlInfo(self.root.clone()));
            }

            let module_name = self
                .root
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| AddonError::UnnamedFolder(self.root.clone()))?;

            return Ok(AddonToLoad {
                load_dir: self.root.clone(),
                module_name,
            });
        }

        // No package: the first script declaring bl_info is the addon.
        for candidate in self.module_candidates()? {
            if !declares_bl_info(&candidate)? {
                continue;
            }

            let module_name = candidate
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .ok_or_else(|| AddonError::UnnamedFolder(self.root.clone()))?;

            return Ok(AddonToLoad {
                load_dir: self.root.clone(),
                module_name,
            });
        }

        Err(AddonError::MissingBlInfo(self.root.clone()))
    }

    /// Top-level scripts that could hold a single-module addon, in a stable
    /// order.
    fn module_candidates(&self) -> Result<Vec<PathBuf>, AddonError> {
        let entries = fs::read_dir(&self.root).map_err(|inner| AddonError::Io {
            path: self.root.clone(),
            inner,
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "py") && path.is_file())
            .collect();

        candidates.sort();

        Ok(candidates)
    }
}

fn declares_bl_info(script: &Path) -> Result<bool, AddonError> {
    let source = fs::read_to_string(script).map_err(|inner| AddonError::Io {
        path: script.to_path_buf(),
        inner,
    })?;

    Ok(source.contains("bl_info"))
}

/// Probes every folder concurrently. The joined result keeps the input order
/// regardless of which probe finishes first.
pub fn addons_to_load(folders: &[AddonWorkspaceFolder]) -> Result<Vec<AddonToLoad>, AddonError> {
    folders
        .par_iter()
        .map(AddonWorkspaceFolder::load_directory_and_module_name)
        .collect()
}
