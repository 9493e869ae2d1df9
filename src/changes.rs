//! Files with computed changes, ready to be written or delivered.

use crate::requirements::file::{update_detail, update_summary};
use crate::requirements::{RequirementsFile, UpdateRecord};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A lock file treated as an opaque blob. Per-package changes are derived
/// once, when the value is built, and only used for reporting.
#[derive(Debug, Clone)]
pub struct LockFile {
    pub path: PathBuf,
    pub before: String,
    pub after: String,
    changes: Vec<UpdateRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct LockDocument {
    #[serde(default)]
    package: Vec<LockedPackage>,
}

#[derive(Debug, Deserialize)]
struct LockedPackage {
    name: String,
    version: String,
}

impl LockFile {
    pub fn new(path: impl Into<PathBuf>, before: String, after: String) -> Self {
        let path = path.into();
        let changes = diff_locked_packages(&path, &before, &after);
        Self {
            path,
            before,
            after,
            changes,
        }
    }
}

fn locked_versions(path: &Path, contents: &str) -> Option<BTreeMap<String, String>> {
    match toml::from_str::<LockDocument>(contents) {
        Ok(doc) => Some(
            doc.package
                .into_iter()
                .map(|p| (p.name, p.version))
                .collect(),
        ),
        Err(err) => {
            tracing::warn!("Unable to read packages from {}: {err}", path.display());
            None
        }
    }
}

fn diff_locked_packages(path: &Path, before: &str, after: &str) -> Vec<UpdateRecord> {
    let (Some(old), Some(new)) = (locked_versions(path, before), locked_versions(path, after))
    else {
        return Vec::new();
    };

    let mut changes = Vec::new();
    for (name, old_version) in &old {
        match new.get(name) {
            Some(new_version) if new_version == old_version => {}
            Some(new_version) => changes.push(UpdateRecord::changed(
                name,
                Some(old_version.clone()),
                Some(new_version.clone()),
            )),
            None => changes.push(UpdateRecord::changed(name, Some(old_version.clone()), None)),
        }
    }
    for (name, new_version) in &new {
        if !old.contains_key(name) {
            changes.push(UpdateRecord::changed(name, None, Some(new_version.clone())));
        }
    }
    changes
}

/// A single-line runtime version pin such as `.python-version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePinFile {
    pub path: PathBuf,
    pub previous: String,
    pub current: String,
}

impl RuntimePinFile {
    pub fn new(path: impl Into<PathBuf>, previous: String, current: String) -> Self {
        Self {
            path: path.into(),
            previous,
            current,
        }
    }

    fn record(&self) -> UpdateRecord {
        UpdateRecord {
            name: "python".to_string(),
            previous_pin: Some(self.previous.clone()),
            new_pin: Some(self.current.clone()),
            pin_changed: self.previous != self.current,
        }
    }
}

/// Every kind of file the update run can change.
#[derive(Debug, Clone)]
pub enum ChangedFile {
    Requirements(RequirementsFile),
    Lock(LockFile),
    RuntimePin(RuntimePinFile),
}

impl ChangedFile {
    pub fn path(&self) -> &Path {
        match self {
            ChangedFile::Requirements(file) => &file.path,
            ChangedFile::Lock(file) => &file.path,
            ChangedFile::RuntimePin(file) => &file.path,
        }
    }

    pub fn contents(&self) -> String {
        match self {
            ChangedFile::Requirements(file) => file.render(),
            ChangedFile::Lock(file) => file.after.clone(),
            ChangedFile::RuntimePin(file) => format!("{}\n", file.current),
        }
    }

    /// Number of changed dependencies. A lock file whose text changed but
    /// whose packages could not be compared still counts once.
    pub fn change_count(&self) -> usize {
        match self {
            ChangedFile::Requirements(file) => file.update_count(),
            ChangedFile::Lock(file) if file.before == file.after => 0,
            ChangedFile::Lock(file) => file.changes.len().max(1),
            ChangedFile::RuntimePin(file) => usize::from(file.previous != file.current),
        }
    }

    pub fn has_changes(&self) -> bool {
        self.change_count() > 0
    }

    pub fn summary(&self) -> String {
        update_summary(self.path(), self.change_count())
    }

    pub fn detail(&self) -> String {
        match self {
            ChangedFile::Requirements(file) => file.update_detail(),
            ChangedFile::Lock(file) => update_detail(&file.changes),
            ChangedFile::RuntimePin(file) => update_detail(&[file.record()]),
        }
    }
}
