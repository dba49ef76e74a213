//! The shared append-only progress log.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::PipelineError;

/// Append-only run log shared by every worker.
///
/// A single mutex serializes appends so lines from different workers
/// never interleave; this is the only synchronization the run needs.
/// Creation fails if the file already exists, so a rerun cannot silently
/// mix its lines into an earlier run's log.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    file: Arc<Mutex<File>>,
    path: PathBuf,
}

impl ProgressLog {
    pub fn create(path: &Path) -> Result<Self, PipelineError> {
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    PipelineError::LogExists {
                        path: path.to_path_buf(),
                    }
                } else {
                    PipelineError::Io(e)
                }
            })?;
        Ok(ProgressLog {
            file: Arc::new(Mutex::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line, holding the lock across write and flush.
    pub fn append(&self, line: &str) -> Result<(), PipelineError> {
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn refuses_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        std::fs::write(&path, "earlier run\n").unwrap();
        let err = ProgressLog::create(&path).unwrap_err();
        assert!(matches!(err, PipelineError::LogExists { .. }));
    }

    #[test]
    fn concurrent_appends_stay_line_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let log = ProgressLog::create(&path).unwrap();

        let barrier = Arc::new(Barrier::new(4));
        thread::scope(|scope| {
            for worker in 0..4 {
                let log = log.clone();
                let barrier = barrier.clone();
                scope.spawn(move || {
                    barrier.wait();
                    for i in 0..50 {
                        log.append(&format!("worker {worker} line {i}")).unwrap();
                    }
                });
            }
        });

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            assert!(line.starts_with("worker "), "torn line {line:?}");
        }
    }
}
