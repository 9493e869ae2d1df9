use crate::error::Result;
use crate::requirements::entry::DependencyEntry;
use crate::requirements::parser::parse_line;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of resolving one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    pub name: String,
    pub previous_pin: Option<String>,
    pub new_pin: Option<String>,
    pub pin_changed: bool,
}

impl UpdateRecord {
    pub fn unchanged(name: impl Into<String>, pin: Option<String>) -> Self {
        Self {
            name: name.into(),
            previous_pin: pin.clone(),
            new_pin: pin,
            pin_changed: false,
        }
    }

    pub fn changed(
        name: impl Into<String>,
        previous_pin: Option<String>,
        new_pin: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            previous_pin,
            new_pin,
            pin_changed: true,
        }
    }
}

/// Commit summary line for a file with `count` changed dependencies.
pub fn update_summary(path: &Path, count: usize) -> String {
    format!(
        "pipup: {count} dependencies updated in {}",
        path.display()
    )
}

/// One `* name: previous -> new` line per changed record, sorted by
/// (name, new pin, previous pin).
pub fn update_detail(updates: &[UpdateRecord]) -> String {
    let mut changed: Vec<&UpdateRecord> = updates.iter().filter(|u| u.pin_changed).collect();
    changed.sort_by(|a, b| {
        (&a.name, &a.new_pin, &a.previous_pin).cmp(&(&b.name, &b.new_pin, &b.previous_pin))
    });

    let mut detail = String::new();
    for update in changed {
        detail.push_str(&format!("* {}:", update.name));
        if let Some(previous) = &update.previous_pin {
            detail.push_str(&format!(" {previous}"));
        }
        detail.push_str(" ->");
        if let Some(new) = &update.new_pin {
            detail.push_str(&format!(" {new}"));
        }
        detail.push('\n');
    }
    detail
}

/// A parsed requirements file: its entries in file order plus the records
/// from the last resolution pass.
#[derive(Debug, Clone)]
pub struct RequirementsFile {
    pub path: PathBuf,
    pub entries: Vec<DependencyEntry>,
    pub updates: Vec<UpdateRecord>,
    newline: &'static str,
    trailing_newline: bool,
}

impl RequirementsFile {
    pub fn parse(path: impl Into<PathBuf>, contents: &str) -> Self {
        let newline = if contents.contains("\r\n") { "\r\n" } else { "\n" };
        let trailing_newline = contents.ends_with('\n');

        let body = contents
            .strip_suffix(newline)
            .or_else(|| contents.strip_suffix('\n'))
            .unwrap_or(contents);

        let entries = if contents.is_empty() {
            Vec::new()
        } else {
            body.split(newline).map(parse_line).collect()
        };

        Self {
            path: path.into(),
            entries,
            updates: Vec::new(),
            newline,
            trailing_newline,
        }
    }

    /// Reads `root/relative`; `path` keeps the relative form for reporting.
    pub fn read(root: &Path, relative: &Path) -> Result<Self> {
        let contents = fs::read_to_string(root.join(relative))?;
        Ok(Self::parse(relative, &contents))
    }

    /// Same file, new entries and records. Layout settings carry over.
    pub fn with_resolution(&self, entries: Vec<DependencyEntry>, updates: Vec<UpdateRecord>) -> Self {
        Self {
            path: self.path.clone(),
            entries,
            updates,
            newline: self.newline,
            trailing_newline: self.trailing_newline,
        }
    }

    pub fn has_updates(&self) -> bool {
        self.updates.iter().any(|u| u.pin_changed)
    }

    pub fn update_count(&self) -> usize {
        self.updates.iter().filter(|u| u.pin_changed).count()
    }

    pub fn update_detail(&self) -> String {
        update_detail(&self.updates)
    }

    pub fn render(&self) -> String {
        let lines: Vec<String> = self.entries.iter().map(DependencyEntry::render).collect();
        let mut out = lines.join(self.newline);
        if self.trailing_newline {
            out.push_str(self.newline);
        }
        out
    }

    pub fn write(&self, root: &Path) -> Result<()> {
        fs::write(root.join(&self.path), self.render())?;
        Ok(())
    }
}
