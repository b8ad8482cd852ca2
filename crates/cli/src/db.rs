pub mod executables;
pub mod logs;

use std::path::Path;

pub use executables::{ExecutableDb, ExecutableEntry};

use crate::{config::Config, db::logs::LogsDb};

pub struct DbContext {
    pub(crate) executables: ExecutableDb,
    pub(crate) logs: LogsDb,
}

impl DbContext {
    pub fn new(config: &Config) -> Self {
        let registry_file = config
            .registry_file()
            .unwrap_or_else(|| Box::from(Path::new("executables.toml")));

        let logs = LogsDb::new(
            config
                .log_dir()
                .unwrap_or_else(|| Box::from(Path::new("blaunch-logs"))),
        );

        Self {
            executables: ExecutableDb::new(registry_file),
            logs,
        }
    }
}
