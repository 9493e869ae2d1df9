// Release sources: where candidate versions come from.
//
// - PackageIndex: JSON API mirrors (PyPI layout), yanked releases removed
// - VcsReleases: GitHub tags/releases for VCS-style requirements
pub mod index;
pub mod vcs;

pub use index::PackageIndex;
pub use vcs::VcsReleases;

use crate::error::Result;

/// Candidate versions for a dependency, newest first.
pub trait ReleaseSource {
    /// Non-yanked releases of an index package in canonical form.
    fn package_releases(&self, name: &str) -> Result<Vec<String>>;

    /// Tag names of a hosted repository.
    fn repository_tags(&self, org: &str, repo: &str, include_prereleases: bool)
    -> Result<Vec<String>>;

    /// Tag names of published (non-draft) releases of a hosted repository.
    fn repository_releases(
        &self,
        org: &str,
        repo: &str,
        include_prereleases: bool,
    ) -> Result<Vec<String>>;
}

/// The production source: package index mirrors plus GitHub.
pub struct RemoteReleaseSource {
    index: PackageIndex,
    vcs: VcsReleases,
}

impl RemoteReleaseSource {
    pub fn new(index: PackageIndex, vcs: VcsReleases) -> Self {
        Self { index, vcs }
    }
}

impl ReleaseSource for RemoteReleaseSource {
    fn package_releases(&self, name: &str) -> Result<Vec<String>> {
        self.index.releases_for(name)
    }

    fn repository_tags(
        &self,
        org: &str,
        repo: &str,
        include_prereleases: bool,
    ) -> Result<Vec<String>> {
        self.vcs.tags_for(org, repo, include_prereleases)
    }

    fn repository_releases(
        &self,
        org: &str,
        repo: &str,
        include_prereleases: bool,
    ) -> Result<Vec<String>> {
        self.vcs.releases_for(org, repo, include_prereleases)
    }
}
