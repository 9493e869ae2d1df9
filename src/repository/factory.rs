use crate::error::Result;
use crate::github::{GitHubClient, GitHubRepository};
use crate::settings::Settings;
use crate::source::{PackageIndex, RemoteReleaseSource, VcsReleases};

pub struct RepositoryFactory;

impl RepositoryFactory {
    pub fn create_release_source(settings: &Settings) -> Result<RemoteReleaseSource> {
        let index = PackageIndex::new(settings.mirrors.clone())?;
        let vcs = VcsReleases::new(GitHubClient::from_env()?);
        Ok(RemoteReleaseSource::new(index, vcs))
    }

    pub fn create_remote(repository: &str) -> Result<GitHubRepository> {
        GitHubRepository::new(GitHubClient::from_env()?, repository)
    }
}
