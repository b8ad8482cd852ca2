use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::Command,
};

use serde::Serialize;

/// A native debug-session request in the shape debug adapters expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugConfiguration {
    pub name: String,

    #[serde(rename = "type")]
    pub session_type: String,

    pub request: String,

    pub program: PathBuf,

    pub args: Vec<String>,

    pub env: BTreeMap<String, String>,

    pub stop_at_entry: bool,

    #[serde(rename = "MIMode")]
    pub mi_mode: String,

    pub cwd: PathBuf,
}

impl DebugConfiguration {
    pub fn new(
        program: PathBuf,
        args: Vec<String>,
        env: BTreeMap<String, String>,
        cwd: &Path,
    ) -> Self {
        Self {
            name: "Debug Blender".to_string(),
            session_type: "cppdbg".to_string(),
            request: "launch".to_string(),
            program,
            args,
            env,
            stop_at_entry: false,
            mi_mode: "gdb".to_string(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Builds the gdb invocation realizing this configuration.
    pub fn into_command(self) -> Command {
        let mut command = Command::new("gdb");

        command
            .arg("--quiet")
            .arg("--args")
            .arg(&self.program)
            .args(&self.args)
            .envs(&self.env)
            .current_dir(&self.cwd);

        command
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    fn configuration() -> DebugConfiguration {
        DebugConfiguration::new(
            PathBuf::from("/a/blender"),
            vec!["--debug".to_string(), "--python".to_string()],
            BTreeMap::from([("EDITOR_PORT".to_string(), "6001".to_string())]),
            Path::new("/workspace"),
        )
    }

    #[test]
    fn requests_serialize_with_adapter_field_names() {
        let encoded = serde_json::to_value(configuration()).unwrap();

        assert_eq!(encoded["type"], "cppdbg");
        assert_eq!(encoded["request"], "launch");
        assert_eq!(encoded["MIMode"], "gdb");
        assert_eq!(encoded["stopAtEntry"], false);
        assert_eq!(encoded["cwd"], "/workspace");
    }

    #[test]
    fn the_gdb_command_wraps_program_and_args() {
        let command = configuration().into_command();

        assert_eq!(command.get_program(), "gdb");

        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(
            args,
            ["--quiet", "--args", "/a/blender", "--debug", "--python"]
        );

        assert_eq!(command.get_current_dir(), Some(Path::new("/workspace")));
    }
}
