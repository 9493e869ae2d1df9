use crate::agents::project_scanner::POETRY_LOCK;
use crate::changes::LockFile;
use crate::error::{PipupError, Result};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const LOCK_ARGS: &[&str] = &["lock", "--regenerate", "--no-interaction"];

/// LockRefreshAgent regenerates `poetry.lock` and reports what moved.
pub struct LockRefreshAgent {
    project_path: PathBuf,
    program: String,
}

impl LockRefreshAgent {
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            program: "poetry".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Runs the lock command and returns the lock file when its content
    /// changed.
    pub fn refresh(&self) -> Result<Option<LockFile>> {
        let lock_path = self.project_path.join(POETRY_LOCK);
        let before = fs::read_to_string(&lock_path)?;

        self.execute(LOCK_ARGS)?;

        let after = fs::read_to_string(&lock_path)?;
        if before == after {
            tracing::info!("{POETRY_LOCK} is up to date");
            return Ok(None);
        }

        Ok(Some(LockFile::new(POETRY_LOCK, before, after)))
    }

    fn execute(&self, args: &[&str]) -> Result<()> {
        tracing::info!("Executing: {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .current_dir(&self.project_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                PipupError::LockRefresh(format!("Failed to spawn {}: {e}", self.program))
            })?;

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
                tracing::debug!("{line}");
            }
        }

        let status = child.wait().map_err(|e| {
            PipupError::LockRefresh(format!("Failed to wait for {}: {e}", self.program))
        })?;

        if !status.success() {
            return Err(PipupError::LockRefresh(format!(
                "{} exited with code {}",
                self.program,
                status
                    .code()
                    .map_or_else(|| "unknown".to_string(), |c| c.to_string())
            )));
        }

        Ok(())
    }
}
