use std::{
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::debug;

/// Marker the probe expression prints when the candidate really is Blender.
pub const SENTINEL: &str = "###TEST_BLENDER###";

#[derive(thiserror::Error, Debug)]
pub enum ValidateError {
    #[error("expected executable name to begin with 'blender': {0}")]
    NameMismatch(PathBuf),

    #[error("failed to invoke {path}: {inner}")]
    Invocation {
        path: PathBuf,
        #[source]
        inner: io::Error,
    },

    #[error("{0} ran but never printed the Blender probe marker")]
    SentinelMissing(PathBuf),
}

/// Rewrites a macOS application bundle to the binary inside it; all other
/// paths pass through untouched.
pub fn resolve_bundle_path(path: PathBuf) -> PathBuf {
    let is_bundle = cfg!(target_os = "macos")
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("app"));

    if is_bundle {
        path.join("Contents/MacOS/blender")
    } else {
        path
    }
}

pub fn check_executable_name(path: &Path) -> Result<(), ValidateError> {
    let name_matches = path
        .file_name()
        .map(OsStr::to_string_lossy)
        .is_some_and(|name| name.to_lowercase().starts_with("blender"));

    if name_matches {
        Ok(())
    } else {
        Err(ValidateError::NameMismatch(path.to_path_buf()))
    }
}

/// Confirms `path` plausibly refers to Blender: the base name must carry the
/// expected prefix and a headless invocation must print [SENTINEL].
pub fn validate_blender_path(path: &Path) -> Result<(), ValidateError> {
    check_executable_name(path)?;

    let probe_expr = format!("import sys;print('{SENTINEL}');sys.stdout.flush();sys.exit()");

    let output = Command::new(path)
        .args(["--factory-startup", "-b", "--python-expr", &probe_expr])
        .output()
        .map_err(|inner| ValidateError::Invocation {
            path: path.to_path_buf(),
            inner,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    debug!(path = %path.display(), status = ?output.status, "validation probe finished");

    if stdout.contains(SENTINEL) {
        Ok(())
    } else {
        Err(ValidateError::SentinelMissing(path.to_path_buf()))
    }
}
