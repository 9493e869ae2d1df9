use crate::error::Result;
use crate::settings::Settings;
use crate::utils::PathValidator;
use std::path::{Path, PathBuf};

pub const POETRY_PROJECT: &str = "pyproject.toml";
pub const POETRY_LOCK: &str = "poetry.lock";
pub const RUNTIME_PIN: &str = ".python-version";

/// ProjectScannerAgent discovers the files an update run works on.
pub struct ProjectScannerAgent {
    project_path: PathBuf,
}

impl ProjectScannerAgent {
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    /// Resolves the configured requirement files plus optional Poetry and
    /// runtime pin files. Configured files that do not exist are skipped.
    pub fn scan(&self, settings: &Settings) -> Result<ProjectInfo> {
        let mut requirement_files = Vec::new();
        for name in &settings.requirements {
            let relative = PathValidator::validate_relative_file(name)?;
            let full_path = self.project_path.join(&relative);

            if !full_path.is_file() {
                tracing::info!("Skipping: {}", relative.display());
                continue;
            }

            PathValidator::validate_file_path(&full_path, &self.project_path)?;
            tracing::info!("Discovered: {}", relative.display());
            requirement_files.push(relative);
        }

        let is_poetry_project = self.project_path.join(POETRY_PROJECT).is_file()
            && self.project_path.join(POETRY_LOCK).is_file();
        let has_runtime_pin = self.project_path.join(RUNTIME_PIN).is_file();

        Ok(ProjectInfo {
            requirement_files,
            lock_file: is_poetry_project.then(|| PathBuf::from(POETRY_LOCK)),
            runtime_pin: has_runtime_pin.then(|| PathBuf::from(RUNTIME_PIN)),
        })
    }
}

/// Files found in the project, relative to its root.
#[derive(Debug, Clone)]
pub struct ProjectInfo {
    pub requirement_files: Vec<PathBuf>,
    pub lock_file: Option<PathBuf>,
    pub runtime_pin: Option<PathBuf>,
}
