use crate::error::Result;

pub mod factory;
pub use factory::RepositoryFactory;

/// One CI workflow run as reported by the hosting API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    pub name: String,
    pub event: String,
    /// `None` while the run is still in progress.
    pub conclusion: Option<String>,
    pub pull_requests: Vec<u64>,
}

/// The remote repository operations the delivery pipeline needs. None of
/// them retry.
pub trait RemoteRepository {
    fn default_branch(&self) -> Result<String>;

    /// Head commit of `branch`, or `None` when no such branch exists.
    fn branch_sha(&self, branch: &str) -> Result<Option<String>>;

    /// `name` is fully qualified, e.g. `refs/heads/pipup-...`.
    fn create_ref(&self, name: &str, sha: &str) -> Result<()>;

    fn delete_ref(&self, name: &str) -> Result<()>;

    /// Blob sha of `path` on `branch`, or `None` when the file is new.
    fn file_sha(&self, path: &str, branch: &str) -> Result<Option<String>>;

    /// Writes `contents` to `path` on `branch` as one commit and returns the
    /// commit sha.
    fn put_file(
        &self,
        path: &str,
        branch: &str,
        contents: &str,
        message: &str,
        previous_sha: Option<&str>,
    ) -> Result<String>;

    /// Opens a pull request and returns its number.
    fn create_pull_request(&self, title: &str, body: &str, head: &str, base: &str)
    -> Result<u64>;

    fn workflow_runs(&self, branch: &str) -> Result<Vec<WorkflowRun>>;

    /// Merges with the rebase strategy and returns the resulting commit sha.
    fn merge_pull_request(&self, number: u64) -> Result<String>;

    fn create_commit_comment(&self, sha: &str, body: &str) -> Result<()>;

    fn tags(&self) -> Result<Vec<String>>;
}

#[cfg(test)]
pub mod testing;
