use crate::error::{PipupError, Result};
use std::path::{Component, Path, PathBuf};

/// Guards the project root and the dependency files read from it.
pub struct PathValidator;

const FORBIDDEN_ROOTS: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

impl PathValidator {
    /// Canonicalises the project root and rejects system directories.
    pub fn validate_project_path(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            PipupError::ProjectValidation(format!("Invalid path '{}': {e}", path.display()))
        })?;

        if !canonical.is_dir() {
            return Err(PipupError::ProjectValidation(format!(
                "Path '{}' is not a directory",
                canonical.display()
            )));
        }

        for forbidden in FORBIDDEN_ROOTS {
            let forbidden_path = Path::new(forbidden);
            let canonical_forbidden = forbidden_path
                .canonicalize()
                .unwrap_or_else(|_| forbidden_path.to_path_buf());

            if path.starts_with(forbidden_path) || canonical.starts_with(&canonical_forbidden) {
                return Err(PipupError::ProjectValidation(format!(
                    "Access to system directory '{}' is not allowed",
                    forbidden
                )));
            }
        }

        Ok(canonical)
    }

    /// Checks that a configured file name stays relative to the project root.
    ///
    /// The path does not need to exist; absolute paths and `..` components
    /// are rejected outright.
    pub fn validate_relative_file(relative: impl AsRef<Path>) -> Result<PathBuf> {
        let relative = relative.as_ref();

        if relative.as_os_str().is_empty() {
            return Err(PipupError::ProjectValidation(
                "Empty dependency file path".to_string(),
            ));
        }

        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(PipupError::ProjectValidation(format!(
                        "Dependency file '{}' must stay inside the project directory",
                        relative.display()
                    )));
                }
            }
        }

        Ok(relative.to_path_buf())
    }

    /// Ensures an existing file resolves (through symlinks) inside `base_dir`.
    pub fn validate_file_path(
        file_path: impl AsRef<Path>,
        base_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let file_path = file_path.as_ref();
        let base_dir = base_dir.as_ref();

        let canonical_file = file_path.canonicalize().map_err(|e| {
            PipupError::ProjectValidation(format!(
                "Invalid file path '{}': {e}",
                file_path.display()
            ))
        })?;

        let canonical_base = base_dir.canonicalize().map_err(|e| {
            PipupError::ProjectValidation(format!(
                "Invalid base directory '{}': {e}",
                base_dir.display()
            ))
        })?;

        if !canonical_file.starts_with(&canonical_base) {
            return Err(PipupError::ProjectValidation(format!(
                "File '{}' is outside the project directory",
                file_path.display()
            )));
        }

        Ok(canonical_file)
    }
}
