pub mod debugger;
pub mod picker;
pub mod validate;

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
    process::{Command, Stdio},
    sync::{Arc, Mutex},
    thread,
};

use blaunch_env::{CommandExt as _, EnvVars as _, LaunchVars};
use clap::{ArgAction, Args};
use color_eyre::eyre::{Context, OptionExt};
use tracing::{debug, error, info, warn};

use crate::{
    addons::{self, AddonWorkspaceFolder},
    commands::launch::{
        debugger::DebugConfiguration,
        picker::{Choice, ConsolePicker, ExecutablePicker, PickItem},
    },
    comms::EditorServer,
    config::Config,
    db::{DbContext, ExecutableEntry},
};

#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Name reported for the monitored task.
    #[clap(long, default_value = "blender")]
    task_name: String,
}

#[derive(Args, Debug)]
pub struct DebugArgs {
    /// Working directory of the debug session; defaults to the invoking
    /// workspace folder.
    #[clap(long, value_hint = clap::ValueHint::DirPath)]
    cwd: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Executable to run, skipping the interactive selection.
    #[clap(short('e'), long, value_hint = clap::ValueHint::FilePath)]
    exe: Option<PathBuf>,

    /// Name reported for the monitored task.
    #[clap(long, default_value = "blender")]
    task_name: String,

    /// Detach instead of waiting for the task to finish.
    #[clap(long, action = ArgAction::SetTrue)]
    background: bool,

    /// Arguments passed through to Blender.
    #[clap(last = true, required = true)]
    args: Vec<String>,
}

/// Which registry entries a selection run offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchKind {
    Any,
    Debug,
}

impl LaunchKind {
    fn offers(self, entry: &ExecutableEntry) -> bool {
        match self {
            LaunchKind::Any => true,
            LaunchKind::Debug => entry.is_debug,
        }
    }

    fn add_new_label(self) -> &'static str {
        match self {
            LaunchKind::Any => "Choose a new Blender executable...",
            LaunchKind::Debug => "Choose a new debug build...",
        }
    }

    fn open_label(self) -> &'static str {
        match self {
            LaunchKind::Any => "Blender Executable",
            LaunchKind::Debug => "Debug Build",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Normal,
    Debug,
}

/// A fully-built request, ready to spawn or hand to the debugger. Built
/// fresh for every launch and discarded once the process starts.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub executable_path: PathBuf,
    pub args: Vec<String>,
    pub env: LaunchVars,
    pub mode: LaunchMode,
}

/// Resolve an executable entry: pick from the registry filtered by `kind`,
/// or validate and register a newly chosen path. The registry is only
/// touched after validation succeeds.
pub fn select_executable(
    db: &DbContext,
    picker: &mut dyn ExecutablePicker,
    kind: LaunchKind,
) -> color_eyre::Result<ExecutableEntry> {
    let all_entries = db.executables.load_all()?;
    let candidates: Vec<&ExecutableEntry> = all_entries
        .iter()
        .filter(|entry| kind.offers(entry))
        .collect();

    let items: Vec<PickItem> = candidates
        .iter()
        .map(|entry| PickItem {
            label: entry.label(),
        })
        .collect();

    let entry = match picker.pick(&items, kind.add_new_label())? {
        Choice::Existing(index) => candidates
            .get(index)
            .copied()
            .cloned()
            .ok_or_eyre("picker returned an out-of-range selection")?,
        Choice::AddNew => {
            let chosen = picker.pick_new_path(kind.open_label())?;
            let path = validate::resolve_bundle_path(chosen);

            validate::validate_blender_path(&path)?;

            let mut entry = ExecutableEntry::new(path);
            if kind == LaunchKind::Debug {
                entry.is_debug = true;
            }

            db.executables.append(entry.clone())?;
            entry
        }
    };

    info!(path = %entry.path.display(), "resolved Blender executable");

    Ok(entry)
}

/// The default argument vector: interpreter override plus driver script.
pub fn build_args(config: &Config) -> color_eyre::Result<Vec<String>> {
    let python_env = config
        .python_env()
        .ok_or_eyre("no Python environment configured; set python_env in blaunch.toml")?;
    let driver_script = config
        .driver_script()
        .ok_or_eyre("no driver script found; set driver_script or place launch.py on the search path")?;

    Ok(vec![
        "--env-system-python".to_string(),
        python_env.to_string_lossy().into_owned(),
        "--python".to_string(),
        driver_script.to_string_lossy().into_owned(),
    ])
}

/// Debug launches prepend the debug flag to the normal argument vector.
pub fn debug_args(normal_args: &[String]) -> Vec<String> {
    let mut args = Vec::with_capacity(normal_args.len() + 1);
    args.push("--debug".to_string());
    args.extend_from_slice(normal_args);
    args
}

pub fn build_env(config: &Config, server: &EditorServer) -> color_eyre::Result<LaunchVars> {
    let folders = AddonWorkspaceFolder::all(config);
    let addons = addons::addons_to_load(&folders)?;

    Ok(LaunchVars {
        addons_to_load: serde_json::to_string(&addons)?,
        editor_port: server.server_port()?.to_string(),
        allow_modify_external_python: if config.options.allow_modify_external_python {
            "yes"
        } else {
            "no"
        }
        .to_string(),
    })
}

pub fn build_request(
    config: &Config,
    executable_path: PathBuf,
    mode: LaunchMode,
    server: &EditorServer,
) -> color_eyre::Result<LaunchRequest> {
    let normal_args = build_args(config)?;
    let args = match mode {
        LaunchMode::Normal => normal_args,
        LaunchMode::Debug => debug_args(&normal_args),
    };

    Ok(LaunchRequest {
        executable_path,
        args,
        env: build_env(config, server)?,
        mode,
    })
}

pub fn launch(db: DbContext, config: Config, args: LaunchArgs) -> color_eyre::Result<()> {
    let entry = select_executable(&db, &mut ConsolePicker, LaunchKind::Any)?;

    let server = EditorServer::bind(config.options.editor_port)?;
    let request = build_request(&config, entry.path, LaunchMode::Normal, &server)?;
    debug!(?request, "built launch request");

    let mut command = Command::new(&request.executable_path);
    command.args(&request.args).with_env_vars(&request.env);

    run_task(&db, &args.task_name, command, false)
}

pub fn debug(db: DbContext, config: Config, args: DebugArgs) -> color_eyre::Result<()> {
    let entry = select_executable(&db, &mut ConsolePicker, LaunchKind::Debug)?;

    let server = EditorServer::bind(config.options.editor_port)?;
    let request = build_request(&config, entry.path, LaunchMode::Debug, &server)?;

    let cwd = args
        .cwd
        .map(PathBuf::into_boxed_path)
        .unwrap_or_else(|| config.workspace_dir());

    let configuration = DebugConfiguration::new(
        request.executable_path,
        request.args,
        request.env.to_map()?,
        &cwd,
    );

    debug!(request = %serde_json::to_string(&configuration)?, "debug session request");
    info!(program = %configuration.program.display(), "starting native debug session");

    let status = configuration
        .into_command()
        .status()
        .wrap_err("failed to start the native debugger")?;

    if !status.success() {
        warn!(%status, "debug session ended with failure");
    }

    Ok(())
}

pub fn run_custom(db: DbContext, args: RunArgs) -> color_eyre::Result<()> {
    let executable_path = match args.exe {
        Some(path) => path,
        None => select_executable(&db, &mut ConsolePicker, LaunchKind::Any)?.path,
    };

    let mut command = Command::new(&executable_path);
    command.args(&args.args);

    run_task(&db, &args.task_name, command, args.background)
}

/// Runs `command` as a named, monitored task. Output is streamed to the
/// console and mirrored into a per-launch log file; the exit status is
/// reported and never retried.
fn run_task(
    db: &DbContext,
    task_name: &str,
    mut command: Command,
    background: bool,
) -> color_eyre::Result<()> {
    command.stdin(Stdio::null());

    if background {
        command.stdout(Stdio::null()).stderr(Stdio::null());

        let child = command
            .spawn()
            .wrap_err_with(|| format!("failed to start task {task_name}"))?;
        info!(task = task_name, pid = child.id(), "task detached");

        return Ok(());
    }

    let log_file_path = db.logs.create_log_file(task_name)?;
    let log_file = Arc::new(Mutex::new(File::create(&log_file_path)?));

    command.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .wrap_err_with(|| format!("failed to start task {task_name}"))?;

    info!(
        task = task_name,
        pid = child.id(),
        log = %log_file_path.display(),
        "task started"
    );

    let stdout = child
        .stdout
        .take()
        .ok_or_eyre("task stdout was not captured")?;
    let stderr = child
        .stderr
        .take()
        .ok_or_eyre("task stderr was not captured")?;

    let readers = [
        stream_output(stdout, log_file.clone()),
        stream_output(stderr, log_file),
    ];

    let status = child.wait()?;

    for reader in readers {
        let _ = reader.join();
    }

    if status.success() {
        info!(task = task_name, "task finished");
    } else {
        warn!(task = task_name, %status, "task failed");
    }

    Ok(())
}

fn stream_output<R: io::Read + Send + 'static>(
    reader: R,
    log_file: Arc<Mutex<File>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            match line {
                Ok(line) => {
                    eprintln!("{line}");

                    if let Ok(mut file) = log_file.lock() {
                        let _ = writeln!(file, "{line}");
                    }
                }
                Err(error) => {
                    error!(%error, "couldn't read output line from task");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use assert_fs::prelude::*;
    use blaunch_env::AddonToLoad;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::{picker::PickError, *};
    use crate::{Cli, commands::Commands, config::KnownDirs, config::Options};

    #[test]
    fn run_parses_exe_and_trailing_args() {
        let cli = Cli::parse_from([
            "blaunch",
            "run",
            "--exe",
            "/a/blender",
            "--background",
            "--",
            "-b",
            "--render-anim",
        ]);

        let Commands::Run(run_args) = cli.command else {
            panic!("blaunch run produced incorrect command");
        };

        assert_eq!(run_args.exe, Some(PathBuf::from("/a/blender")));
        assert_eq!(run_args.task_name, "blender");
        assert!(run_args.background);
        assert_eq!(run_args.args, ["-b", "--render-anim"]);
    }

    #[test]
    fn run_requires_trailing_args() {
        assert!(Cli::try_parse_from(["blaunch", "run"]).is_err());
    }

    #[test]
    fn debug_args_prepend_the_debug_flag() {
        let normal = vec!["--env-system-python".to_string(), "/env".to_string()];

        assert_eq!(debug_args(&normal), ["--debug", "--env-system-python", "/env"]);
        assert_eq!(debug_args(&[]), ["--debug"]);
    }

    /// Scripted picker for workflow tests: records what it was offered and
    /// replays a canned response.
    struct ScriptedPicker {
        response: Option<Choice>,
        new_path: Option<PathBuf>,
        offered: Vec<PickItem>,
        add_new_label: String,
    }

    impl ScriptedPicker {
        fn cancelled() -> Self {
            Self::with_response(None)
        }

        fn with_response(response: Option<Choice>) -> Self {
            Self {
                response,
                new_path: None,
                offered: Vec::new(),
                add_new_label: String::new(),
            }
        }
    }

    impl ExecutablePicker for ScriptedPicker {
        fn pick(
            &mut self,
            items: &[PickItem],
            add_new_label: &str,
        ) -> Result<Choice, PickError> {
            self.offered = items.to_vec();
            self.add_new_label = add_new_label.to_string();
            self.response.ok_or(PickError::Cancelled)
        }

        fn pick_new_path(&mut self, _open_label: &str) -> Result<PathBuf, PickError> {
            self.new_path.clone().ok_or(PickError::Cancelled)
        }
    }

    struct WorkflowFixture {
        config: Config,
        db: DbContext,
        _temp_dir: assert_fs::TempDir,
    }

    fn fixture() -> WorkflowFixture {
        let temp_dir = assert_fs::TempDir::new().unwrap();

        let driver_script = temp_dir.child("launch.py");
        driver_script.write_str("import sys\n").unwrap();

        let addon_dir = temp_dir.child("my_addon");
        addon_dir
            .child("__init__.py")
            .write_str("bl_info = {\"name\": \"my_addon\"}\n")
            .unwrap();

        let config = Config {
            options: Options {
                allow_modify_external_python: false,
                python_env: Some(Box::from(temp_dir.child("pyenv").path())),
                driver_script: Some(Box::from(driver_script.path())),
                addon_dirs: vec![addon_dir.path().to_path_buf()],
                editor_port: None,
                registry_file: Some(Box::from(temp_dir.child("executables.toml").path())),
            },
            known_dirs: KnownDirs::default(),
        };

        let db = DbContext::new(&config);

        WorkflowFixture {
            config,
            db,
            _temp_dir: temp_dir,
        }
    }

    #[test]
    fn cancelling_the_picker_mutates_nothing() {
        let fixture = fixture();
        let db = &fixture.db;
        db.executables
            .append(ExecutableEntry::new("/a/blender"))
            .unwrap();

        let mut picker = ScriptedPicker::cancelled();
        let error = select_executable(db, &mut picker, LaunchKind::Any).unwrap_err();

        assert!(
            error
                .downcast_ref::<PickError>()
                .is_some_and(PickError::is_cancelled)
        );
        assert_eq!(db.executables.load_all().unwrap().len(), 1);
    }

    #[test]
    fn an_empty_filter_still_offers_only_the_add_new_action() {
        let fixture = fixture();
        let db = &fixture.db;
        db.executables
            .append(ExecutableEntry::new("/a/blender"))
            .unwrap();

        // The only registered entry is not a debug build, so a debug launch
        // has no candidates to list.
        let mut picker = ScriptedPicker::cancelled();
        let _ = select_executable(db, &mut picker, LaunchKind::Debug);

        assert_eq!(picker.offered, []);
        assert_eq!(picker.add_new_label, "Choose a new debug build...");
    }

    #[test]
    fn selecting_the_single_entry_builds_a_normal_request() {
        let fixture = fixture();
        let (config, db) = (&fixture.config, &fixture.db);
        db.executables
            .append(ExecutableEntry::new("/a/blender"))
            .unwrap();

        let mut picker = ScriptedPicker::with_response(Some(Choice::Existing(0)));
        let entry = select_executable(db, &mut picker, LaunchKind::Any).unwrap();

        assert_eq!(entry.path, PathBuf::from("/a/blender"));
        assert_eq!(db.executables.load_all().unwrap().len(), 1);

        let server = EditorServer::bind(None).unwrap();
        let request = build_request(config, entry.path, LaunchMode::Normal, &server).unwrap();

        assert_eq!(request.mode, LaunchMode::Normal);
        assert_eq!(request.executable_path, PathBuf::from("/a/blender"));
        assert_eq!(request.args[0], "--env-system-python");
        assert_eq!(request.args[2], "--python");

        let addons: Vec<AddonToLoad> =
            serde_json::from_str(&request.env.addons_to_load).unwrap();
        assert_eq!(addons.len(), 1);
        assert_eq!(addons[0].module_name, "my_addon");

        assert_eq!(
            request.env.editor_port,
            server.server_port().unwrap().to_string()
        );
        assert_eq!(request.env.allow_modify_external_python, "no");
    }

    #[test]
    fn debug_requests_prefix_the_normal_argument_vector() {
        let fixture = fixture();
        let config = &fixture.config;

        let server = EditorServer::bind(None).unwrap();
        let normal =
            build_request(config, "/a/blender".into(), LaunchMode::Normal, &server).unwrap();
        let debug =
            build_request(config, "/a/blender".into(), LaunchMode::Debug, &server).unwrap();

        let mut expected = vec!["--debug".to_string()];
        expected.extend(normal.args.clone());
        assert_eq!(debug.args, expected);
    }

    #[cfg(unix)]
    mod new_path {
        use std::{fs, os::unix::fs::PermissionsExt};

        use pretty_assertions::assert_eq;

        use super::*;

        fn fake_blender(
            temp_dir: &assert_fs::TempDir,
            name: &str,
            print_sentinel: bool,
        ) -> PathBuf {
            let script = temp_dir.child(name);
            let marker = if print_sentinel {
                super::super::validate::SENTINEL
            } else {
                "not the marker"
            };
            script
                .write_str(&format!("#!/bin/sh\necho '{marker}'\n"))
                .unwrap();

            let mut permissions = fs::metadata(script.path()).unwrap().permissions();
            permissions.set_mode(0o755);
            fs::set_permissions(script.path(), permissions).unwrap();

            script.path().to_path_buf()
        }

        #[test]
        fn a_validated_new_path_is_registered_as_a_debug_build() {
            let WorkflowFixture { db, _temp_dir, .. } = fixture();
            let path = fake_blender(&_temp_dir, "blender-debug", true);

            let mut picker = ScriptedPicker::with_response(Some(Choice::AddNew));
            picker.new_path = Some(path.clone());

            let entry = select_executable(&db, &mut picker, LaunchKind::Debug).unwrap();

            assert_eq!(entry.path, path);
            assert!(entry.is_debug);

            let entries = db.executables.load_all().unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0], entry);
        }

        #[test]
        fn a_failed_validation_registers_nothing() {
            let WorkflowFixture { db, _temp_dir, .. } = fixture();
            let path = fake_blender(&_temp_dir, "blender-broken", false);

            let mut picker = ScriptedPicker::with_response(Some(Choice::AddNew));
            picker.new_path = Some(path);

            assert!(select_executable(&db, &mut picker, LaunchKind::Any).is_err());
            assert_eq!(db.executables.load_all().unwrap(), []);
        }
    }
}
