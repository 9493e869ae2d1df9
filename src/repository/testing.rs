//! In-memory remote used by the delivery tests.

use super::{RemoteRepository, WorkflowRun};
use crate::error::{PipupError, Result};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    pub name: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestCall {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitCall {
    pub path: String,
    pub branch: String,
    pub contents: String,
    pub message: String,
    pub previous_sha: Option<String>,
}

pub struct FakeRemote {
    pub default_branch: String,
    pub refs: RefCell<Vec<GitRef>>,
    pub existing_files: HashMap<String, String>,
    pub commits: RefCell<Vec<CommitCall>>,
    pub pull_requests: RefCell<Vec<PullRequestCall>>,
    pub merges: RefCell<Vec<u64>>,
    pub branch_lookups: RefCell<Vec<String>>,
    pub comments: RefCell<Vec<(String, String)>>,
    pub deleted_refs: RefCell<Vec<String>>,
    pub tags: Vec<String>,
    pub fail_comments: bool,
    /// Successive `workflow_runs` answers; the last one repeats.
    run_responses: RefCell<VecDeque<Vec<WorkflowRun>>>,
    pub run_polls: Cell<usize>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            default_branch: "main".to_string(),
            refs: RefCell::new(vec![GitRef {
                name: "refs/heads/main".to_string(),
                sha: "base-sha".to_string(),
            }]),
            existing_files: HashMap::new(),
            commits: RefCell::new(Vec::new()),
            pull_requests: RefCell::new(Vec::new()),
            merges: RefCell::new(Vec::new()),
            branch_lookups: RefCell::new(Vec::new()),
            comments: RefCell::new(Vec::new()),
            deleted_refs: RefCell::new(Vec::new()),
            tags: Vec::new(),
            fail_comments: false,
            run_responses: RefCell::new(VecDeque::new()),
            run_polls: Cell::new(0),
        }
    }

    pub fn with_runs(self, responses: Vec<Vec<WorkflowRun>>) -> Self {
        *self.run_responses.borrow_mut() = responses.into();
        self
    }

    pub fn created_branches(&self) -> Vec<String> {
        self.refs
            .borrow()
            .iter()
            .filter(|r| r.name != "refs/heads/main")
            .map(|r| r.name.clone())
            .collect()
    }
}

pub fn run(name: &str, conclusion: Option<&str>, pr: u64) -> WorkflowRun {
    WorkflowRun {
        name: name.to_string(),
        event: "pull_request".to_string(),
        conclusion: conclusion.map(str::to_string),
        pull_requests: vec![pr],
    }
}

impl RemoteRepository for FakeRemote {
    fn default_branch(&self) -> Result<String> {
        Ok(self.default_branch.clone())
    }

    fn branch_sha(&self, branch: &str) -> Result<Option<String>> {
        self.branch_lookups.borrow_mut().push(branch.to_string());
        let name = format!("refs/heads/{branch}");
        Ok(self
            .refs
            .borrow()
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.sha.clone()))
    }

    fn create_ref(&self, name: &str, sha: &str) -> Result<()> {
        self.refs.borrow_mut().push(GitRef {
            name: name.to_string(),
            sha: sha.to_string(),
        });
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<()> {
        self.deleted_refs.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn file_sha(&self, path: &str, _branch: &str) -> Result<Option<String>> {
        Ok(self.existing_files.get(path).cloned())
    }

    fn put_file(
        &self,
        path: &str,
        branch: &str,
        contents: &str,
        message: &str,
        previous_sha: Option<&str>,
    ) -> Result<String> {
        let mut commits = self.commits.borrow_mut();
        commits.push(CommitCall {
            path: path.to_string(),
            branch: branch.to_string(),
            contents: contents.to_string(),
            message: message.to_string(),
            previous_sha: previous_sha.map(str::to_string),
        });
        Ok(format!("commit-{}", commits.len()))
    }

    fn create_pull_request(&self, title: &str, body: &str, head: &str, base: &str) -> Result<u64> {
        let mut prs = self.pull_requests.borrow_mut();
        let number = 42 + prs.len() as u64;
        prs.push(PullRequestCall {
            number,
            title: title.to_string(),
            body: body.to_string(),
            head: head.to_string(),
            base: base.to_string(),
        });
        Ok(number)
    }

    fn workflow_runs(&self, _branch: &str) -> Result<Vec<WorkflowRun>> {
        self.run_polls.set(self.run_polls.get() + 1);
        let mut responses = self.run_responses.borrow_mut();
        if responses.len() > 1 {
            return Ok(responses.pop_front().unwrap_or_default());
        }
        Ok(responses.front().cloned().unwrap_or_default())
    }

    fn merge_pull_request(&self, number: u64) -> Result<String> {
        self.merges.borrow_mut().push(number);
        Ok("merge-sha".to_string())
    }

    fn create_commit_comment(&self, sha: &str, body: &str) -> Result<()> {
        if self.fail_comments {
            return Err(PipupError::Transport {
                url: format!("commits/{sha}/comments"),
                status: 403,
            });
        }
        self.comments
            .borrow_mut()
            .push((sha.to_string(), body.to_string()));
        Ok(())
    }

    fn tags(&self) -> Result<Vec<String>> {
        Ok(self.tags.clone())
    }
}
