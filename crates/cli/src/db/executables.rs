use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::info;

/// A registered Blender executable.
///
/// `path` is the unique key within the registry. Entries are appended once a
/// new path passes validation and are never mutated or deleted by the launch
/// workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableEntry {
    pub path: PathBuf,

    /// Display label; an empty string means "use the path as the label".
    #[serde(default)]
    pub name: String,

    /// Marks a debug-capable build.
    #[serde(default)]
    pub is_debug: bool,
}

impl ExecutableEntry {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            name: String::new(),
            is_debug: false,
        }
    }

    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.path.display().to_string()
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    executables: Vec<ExecutableEntry>,
}

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("unexpected IO error accessing {path}: {inner}")]
    Io {
        path: Box<Path>,
        #[source]
        inner: io::Error,
    },

    #[error("registry file {path} is malformed: {inner}")]
    Malformed {
        path: Box<Path>,
        #[source]
        inner: toml::de::Error,
    },

    #[error("failed to encode registry: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// File-backed registry of known Blender executables.
pub struct ExecutableDb {
    file: Box<Path>,
}

impl ExecutableDb {
    pub fn new<P: Into<Box<Path>>>(file: P) -> Self {
        Self { file: file.into() }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Loads every registered entry. A missing registry file is an empty
    /// registry, not an error.
    pub fn load_all(&self) -> Result<Vec<ExecutableEntry>, RegistryError> {
        match fs::read_to_string(&self.file) {
            Ok(text) => toml::from_str::<RegistryDocument>(&text)
                .map(|document| document.executables)
                .map_err(|inner| RegistryError::Malformed {
                    path: self.file.clone(),
                    inner,
                }),
            Err(inner) if inner.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(inner) => Err(RegistryError::Io {
                path: self.file.clone(),
                inner,
            }),
        }
    }

    /// Registers `entry` unless an entry with the same path already exists,
    /// in which case the registry is left untouched.
    pub fn append(&self, entry: ExecutableEntry) -> Result<(), RegistryError> {
        let mut entries = self.load_all()?;

        if entries.iter().any(|existing| existing.path == entry.path) {
            return Ok(());
        }

        info!(path = %entry.path.display(), is_debug = entry.is_debug, "registering executable");

        entries.push(entry);
        self.save(&entries)
    }

    fn save(&self, entries: &[ExecutableEntry]) -> Result<(), RegistryError> {
        let document = RegistryDocument {
            executables: entries.to_vec(),
        };
        let encoded = toml::to_string_pretty(&document)?;

        let io_error = |inner| RegistryError::Io {
            path: self.file.clone(),
            inner,
        };

        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        fs::write(&self.file, encoded).map_err(io_error)
    }
}
