use crate::error::{PipupError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const SETTINGS_FILE: &str = ".pipup.yaml";

/// Run configuration, read from `.pipup.yaml` in the project root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Requirements files to scan, relative to the project root.
    pub requirements: Vec<String>,
    /// Check names that must conclude successfully before merging.
    pub workflows: Vec<String>,
    /// Package index JSON endpoints; `{name}` is replaced by the package.
    pub mirrors: Vec<String>,
    pub auto_tag: bool,
    pub python_version: bool,
    pub poetry: bool,
    pub check_interval_secs: u64,
    pub check_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            requirements: vec![
                "requirements.txt".to_string(),
                "requirements-dev.txt".to_string(),
                "dev-requirements.txt".to_string(),
                "requirements-prod.txt".to_string(),
                "prod-requirements.txt".to_string(),
            ],
            workflows: vec!["CI".to_string()],
            mirrors: vec!["https://pypi.org/pypi/{name}/json".to_string()],
            auto_tag: false,
            python_version: false,
            poetry: true,
            check_interval_secs: 5,
            check_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Loads `.pipup.yaml` from `project_path`, falling back to defaults
    /// when the file does not exist.
    pub fn load(project_path: &Path) -> Result<Self> {
        let settings_path = project_path.join(SETTINGS_FILE);
        if !settings_path.is_file() {
            tracing::debug!("No {SETTINGS_FILE} found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!("Loading settings from {}", settings_path.display());
        let content = fs::read_to_string(&settings_path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = if content.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(content)?
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn check_timeout(&self) -> Option<Duration> {
        self.check_timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.mirrors.is_empty() {
            return Err(PipupError::Settings(
                "at least one mirror is required".to_string(),
            ));
        }
        for mirror in &self.mirrors {
            Self::validate_mirror(mirror)?;
        }
        if self.check_interval_secs == 0 {
            return Err(PipupError::Settings(
                "check_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_mirror(template: &str) -> Result<()> {
        if !template.contains("{name}") {
            return Err(PipupError::Settings(format!(
                "mirror '{template}' has no {{name}} placeholder"
            )));
        }

        let parsed = Url::parse(&template.replace("{name}", "package"))
            .map_err(|_| PipupError::Settings(format!("invalid mirror URL: {template}")))?;

        match parsed.scheme() {
            "https" | "http" => Ok(()),
            scheme => Err(PipupError::Settings(format!(
                "unsupported mirror scheme: {scheme}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.workflows, vec!["CI"]);
        assert_eq!(settings.check_interval(), Duration::from_secs(5));
        assert_eq!(settings.check_timeout(), None);
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let settings = Settings::from_yaml(
            "workflows: [lint, test]\nmirrors:\n  - https://mirror.example/pypi/{name}/json\nauto_tag: true\n",
        )
        .unwrap();
        assert_eq!(settings.workflows, vec!["lint", "test"]);
        assert_eq!(settings.mirrors, vec!["https://mirror.example/pypi/{name}/json"]);
        assert!(settings.auto_tag);
        assert_eq!(settings.requirements.len(), 5);
    }

    #[test]
    fn rejects_bad_mirrors() {
        assert!(Settings::from_yaml("mirrors: [https://pypi.org/pypi/json]").is_err());
        assert!(Settings::from_yaml("mirrors: ['ftp://pypi.org/{name}']").is_err());
        assert!(Settings::from_yaml("mirrors: []").is_err());
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Settings::from_yaml("\n").unwrap(), Settings::default());
    }
}
