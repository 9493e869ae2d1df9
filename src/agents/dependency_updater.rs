use crate::error::Result;
use crate::requirements::{
    Dependency, DependencyEntry, DirectiveSet, Origin, RequirementsFile, UpdateRecord,
};
use crate::source::ReleaseSource;
use crate::version::Version;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// DependencyUpdater resolves every declaration of a requirements file
/// against a release source.
///
/// Resolution is all-or-nothing: the first lookup failure aborts the pass.
pub struct DependencyUpdater<'a> {
    source: &'a dyn ReleaseSource,
    show_progress: bool,
}

impl<'a> DependencyUpdater<'a> {
    pub fn new(source: &'a dyn ReleaseSource) -> Self {
        Self {
            source,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn update_all(&self, files: &[RequirementsFile]) -> Result<Vec<RequirementsFile>> {
        files.iter().map(|file| self.update_requirements(file)).collect()
    }

    /// Returns a new file value with updated pins and one record per
    /// declaration; opaque lines pass through without a record.
    pub fn update_requirements(&self, file: &RequirementsFile) -> Result<RequirementsFile> {
        let pb = self.progress_bar(file.entries.len());
        let mut entries = Vec::with_capacity(file.entries.len());
        let mut updates = Vec::new();

        for entry in &file.entries {
            match entry {
                DependencyEntry::Opaque(line) => {
                    if !line.trim().is_empty() {
                        tracing::debug!("Ignoring due to parser: {}", line.trim());
                    }
                    entries.push(entry.clone());
                }
                DependencyEntry::Declared(dependency) => {
                    pb.set_message(format!("Checking {}", dependency.name));
                    let (resolved, record) = self.resolve(dependency)?;
                    entries.push(DependencyEntry::Declared(resolved));
                    updates.push(record);
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(file.with_resolution(entries, updates))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        let pb = ProgressBar::new(len as u64);
        if !self.show_progress {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) = ProgressStyle::default_bar().template("  [{bar:40}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb
    }

    fn resolve(&self, dependency: &Dependency) -> Result<(Dependency, UpdateRecord)> {
        if dependency.directives.ignore {
            tracing::info!("Ignoring due to inline config: {}", dependency.name);
            return Ok(Self::unchanged(dependency));
        }
        if dependency.is_url() {
            tracing::info!("Ignoring due to url: {}", dependency.name);
            return Ok(Self::unchanged(dependency));
        }

        let candidates = self.candidates(dependency)?;
        let selected = select_candidate(candidates, &dependency.directives);

        let Some(latest) = selected else {
            tracing::debug!("[{}] No acceptable release found", dependency.name);
            return Ok(Self::unchanged(dependency));
        };

        let changed = dependency.pin.as_deref() != Some(latest.as_str());
        tracing::debug!(
            "[{}] Found latest release: {} ({}changed)",
            dependency.name,
            latest,
            if changed { "" } else { "not " }
        );

        let record = UpdateRecord {
            name: dependency.name.clone(),
            previous_pin: dependency.pin.clone(),
            new_pin: Some(latest.clone()),
            pin_changed: changed,
        };
        Ok((dependency.with_pin(latest), record))
    }

    fn unchanged(dependency: &Dependency) -> (Dependency, UpdateRecord) {
        (
            dependency.clone(),
            UpdateRecord::unchanged(&dependency.name, dependency.pin.clone()),
        )
    }

    fn candidates(&self, dependency: &Dependency) -> Result<Vec<String>> {
        let include_pre = dependency.directives.allow_prereleases;
        match &dependency.origin {
            Origin::Index(_) => self.source.package_releases(&dependency.name),
            Origin::Vcs(location) if dependency.directives.use_tags => {
                self.source
                    .repository_tags(&location.org, &location.repo, include_pre)
            }
            Origin::Vcs(location) => {
                self.source
                    .repository_releases(&location.org, &location.repo, include_pre)
            }
        }
    }
}

/// Picks the newest candidate the directives accept. Candidate order is
/// preserved. Pre-releases need `releases:pre` unless an inline constraint
/// names one itself.
pub fn select_candidate(candidates: Vec<String>, directives: &DirectiveSet) -> Option<String> {
    candidates.into_iter().find(|candidate| {
        let Ok(version) = Version::parse(candidate) else {
            return false;
        };
        match &directives.constraint {
            Some(constraint) => constraint.contains(&version, directives.allow_prereleases),
            None => directives.allow_prereleases || !version.is_prerelease(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipupError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeSource {
        packages: HashMap<String, Vec<String>>,
        tags: HashMap<String, Vec<String>>,
        releases: HashMap<String, Vec<String>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn with_package(mut self, name: &str, versions: &[&str]) -> Self {
            self.packages.insert(
                name.to_string(),
                versions.iter().map(|s| s.to_string()).collect(),
            );
            self
        }

        fn with_tags(mut self, repo: &str, tags: &[&str]) -> Self {
            self.tags
                .insert(repo.to_string(), tags.iter().map(|s| s.to_string()).collect());
            self
        }

        fn with_releases(mut self, repo: &str, tags: &[&str]) -> Self {
            self.releases
                .insert(repo.to_string(), tags.iter().map(|s| s.to_string()).collect());
            self
        }
    }

    impl ReleaseSource for FakeSource {
        fn package_releases(&self, name: &str) -> Result<Vec<String>> {
            self.calls.borrow_mut().push(format!("index:{name}"));
            self.packages
                .get(name)
                .cloned()
                .ok_or_else(|| PipupError::PackageNotFound(name.to_string()))
        }

        fn repository_tags(&self, org: &str, repo: &str, _pre: bool) -> Result<Vec<String>> {
            let key = format!("{org}/{repo}");
            self.calls.borrow_mut().push(format!("tags:{key}"));
            Ok(self.tags.get(&key).cloned().unwrap_or_default())
        }

        fn repository_releases(&self, org: &str, repo: &str, _pre: bool) -> Result<Vec<String>> {
            let key = format!("{org}/{repo}");
            self.calls.borrow_mut().push(format!("releases:{key}"));
            Ok(self.releases.get(&key).cloned().unwrap_or_default())
        }
    }

    fn resolve(source: &FakeSource, contents: &str) -> RequirementsFile {
        let file = RequirementsFile::parse("requirements.txt", contents);
        DependencyUpdater::new(source).update_requirements(&file).unwrap()
    }

    #[test]
    fn selects_newest_release() {
        let source = FakeSource::default().with_package("demo", &["2.0.0", "1.9.0", "1.8.0"]);
        let file = resolve(&source, "demo==1.8.0\n");

        assert_eq!(file.render(), "demo==2.0.0\n");
        assert_eq!(
            file.updates,
            vec![UpdateRecord::changed(
                "demo",
                Some("1.8.0".into()),
                Some("2.0.0".into())
            )]
        );
    }

    #[test]
    fn honours_inline_constraint() {
        let source = FakeSource::default().with_package("demo", &["2.0.0", "1.9.0", "1.8.0"]);
        let file = resolve(&source, "demo==1.8.0 # pipup:version:>=1.0,<2.0\n");
        assert_eq!(file.render(), "demo==1.9.0 # pipup:version:>=1.0,<2.0\n");
        assert_eq!(file.update_count(), 1);
    }

    #[test]
    fn ignore_directive_skips_lookup() {
        let source = FakeSource::default();
        let file = resolve(&source, "demo==1.0 # pipup: version:<2.0 ignore\n");

        assert!(source.calls.borrow().is_empty());
        assert_eq!(file.render(), "demo==1.0 # pipup: version:<2.0 ignore\n");
        assert_eq!(
            file.updates,
            vec![UpdateRecord::unchanged("demo", Some("1.0".into()))]
        );
    }

    #[test]
    fn urls_and_opaque_lines_are_not_queried() {
        let source = FakeSource::default();
        let file = resolve(
            &source,
            "# comment\n-r base.txt\nhttps://example.com/pkg.tar.gz\n",
        );
        assert!(source.calls.borrow().is_empty());
        assert_eq!(file.updates.len(), 1);
        assert!(!file.has_updates());
    }

    #[test]
    fn prereleases_need_directive() {
        let source = FakeSource::default().with_package("demo", &["3.0b1", "2.1.0"]);
        assert_eq!(resolve(&source, "demo==2.0.0\n").render(), "demo==2.1.0\n");
        assert_eq!(
            resolve(&source, "demo==2.0.0 # pipup:releases:pre\n").render(),
            "demo==3.0b1 # pipup:releases:pre\n"
        );
    }

    #[test]
    fn constraint_naming_prerelease_admits_prereleases() {
        let source = FakeSource::default().with_package("demo", &["3.0b2", "2.1.0"]);
        assert_eq!(
            resolve(&source, "demo==2.0.0 # pipup:version:>=3.0b1\n").render(),
            "demo==3.0b2 # pipup:version:>=3.0b1\n"
        );
        assert_eq!(
            resolve(&source, "demo==2.0.0 # pipup:version:<4\n").render(),
            "demo==2.1.0 # pipup:version:<4\n"
        );
    }

    #[test]
    fn arbitrary_equality_lines_are_left_alone() {
        let source = FakeSource::default().with_package("foo", &["1.0"]);
        let file = resolve(&source, "foo===1.0\n");

        assert_eq!(file.render(), "foo===1.0\n");
        assert!(file.updates.is_empty());
        assert!(!file.has_updates());
        assert!(source.calls.borrow().is_empty());
    }

    #[test]
    fn empty_candidate_list_keeps_pin() {
        let source = FakeSource::default().with_package("demo", &["1.5.0"]);
        let file = resolve(&source, "demo==1.0 # pipup:version:>=2\n");
        assert_eq!(file.render(), "demo==1.0 # pipup:version:>=2\n");
        assert!(!file.has_updates());
    }

    #[test]
    fn unpinned_dependency_gains_pin() {
        let source = FakeSource::default().with_package("demo", &["1.5.0"]);
        let file = resolve(&source, "demo[extra]\n");
        assert_eq!(file.render(), "demo[extra]==1.5.0\n");
        assert_eq!(file.update_detail(), "* demo: -> 1.5.0\n");
    }

    #[test]
    fn vcs_references_use_releases_or_tags() {
        let source = FakeSource::default()
            .with_releases("acme/widget", &["v1.3.0", "v1.2.0"])
            .with_tags("acme/gadget", &["v0.9.1"]);
        let file = resolve(
            &source,
            "git+https://github.com/acme/widget.git@v1.2.0#egg=widget\n\
             git+https://github.com/acme/gadget.git@v0.9.0#egg=gadget # pipup:git:tags\n",
        );

        assert_eq!(
            file.render(),
            "git+https://github.com/acme/widget.git@v1.3.0#egg=widget\n\
             git+https://github.com/acme/gadget.git@v0.9.1#egg=gadget # pipup:git:tags\n"
        );
        assert_eq!(
            *source.calls.borrow(),
            vec!["releases:acme/widget", "tags:acme/gadget"]
        );
        assert!(matches!(
            &file.entries[0],
            DependencyEntry::Declared(Dependency {
                origin: Origin::Vcs(_),
                ..
            })
        ));
    }

    #[test]
    fn lookup_failure_aborts_the_pass() {
        let source = FakeSource::default().with_package("known", &["1.0"]);
        let file = RequirementsFile::parse("requirements.txt", "known==1.0\nmissing==1.0\n");
        let err = DependencyUpdater::new(&source)
            .update_requirements(&file)
            .unwrap_err();
        assert!(matches!(err, PipupError::PackageNotFound(name) if name == "missing"));
    }

    #[test]
    fn second_pass_is_idempotent() {
        let source = FakeSource::default()
            .with_package("demo", &["2.0.0", "1.9.0"])
            .with_package("other", &["0.5"]);
        let updater = DependencyUpdater::new(&source);

        let first = updater
            .update_requirements(&RequirementsFile::parse(
                "requirements.txt",
                "demo==2.0.0\nother==0.5\n",
            ))
            .unwrap();
        assert!(!first.has_updates());

        let second = updater.update_requirements(&first).unwrap();
        assert!(!second.has_updates());
        assert_eq!(second.render(), "demo==2.0.0\nother==0.5\n");
    }

    #[test]
    fn select_candidate_preserves_order() {
        let directives = DirectiveSet::parse(Some("# pipup:version:<2.0"));
        let picked = select_candidate(
            vec!["2.0.0".into(), "1.9.0".into(), "1.8.0".into()],
            &directives,
        );
        assert_eq!(picked.as_deref(), Some("1.9.0"));
        assert_eq!(
            select_candidate(vec!["2.0.0".into()], &DirectiveSet::default()).as_deref(),
            Some("2.0.0")
        );
    }
}
