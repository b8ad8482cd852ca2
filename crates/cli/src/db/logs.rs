use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::Local;

/// Per-launch log files, grouped by task name, with a small retention window.
pub struct LogsDb {
    base_dir: Box<Path>,
    retention: usize,
}

impl LogsDb {
    pub fn new<P: Into<Box<Path>>>(path: P) -> Self {
        Self {
            base_dir: path.into(),
            retention: 5,
        }
    }

    /// Allocates a timestamped log file path for a task, pruning the oldest
    /// log once the retention limit is reached.
    pub fn create_log_file(&self, task_name: &str) -> color_eyre::Result<Box<Path>> {
        let task_log_dir = self.base_dir.join(task_name);
        fs::create_dir_all(&task_log_dir)?;

        let mut log_files = existing_log_files(&task_log_dir);

        while log_files.len() >= self.retention {
            let (_, path_to_delete) = log_files.remove(0);
            let _ = fs::remove_file(path_to_delete);
        }

        let log_file_suffix = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let log_file_path = task_log_dir.join(format!("{log_file_suffix}.log"));

        Ok(log_file_path.into_boxed_path())
    }
}

/// Log files in `dir`, oldest first.
fn existing_log_files(dir: &Path) -> Vec<(SystemTime, PathBuf)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut log_files: Vec<(SystemTime, PathBuf)> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let metadata = entry.metadata().ok()?;

            let is_log = metadata.is_file()
                && entry.path().extension().is_some_and(|ext| ext == "log");

            is_log.then_some((metadata.modified().ok()?, entry.path()))
        })
        .collect();

    log_files.sort_by_key(|(modified, _)| *modified);
    log_files
}

#[cfg(test)]
mod tests {
    use assert_fs::prelude::*;

    use super::*;

    #[test]
    fn log_files_are_grouped_by_task_name() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let db = LogsDb::new(temp_dir.path());

        let path = db.create_log_file("blender").unwrap();

        assert!(path.starts_with(temp_dir.child("blender").path()));
        assert_eq!(path.extension().unwrap(), "log");
    }

    #[test]
    fn old_logs_are_pruned_at_the_retention_limit() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let db = LogsDb {
            base_dir: Box::from(temp_dir.path()),
            retention: 2,
        };

        for index in 0..3 {
            temp_dir
                .child(format!("blender/existing-{index}.log"))
                .touch()
                .unwrap();
        }

        db.create_log_file("blender").unwrap();

        let remaining = existing_log_files(temp_dir.child("blender").path());
        assert!(remaining.len() < 3);
    }
}
