use crate::error::{PipupError, Result};
use crate::version;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Package index client trying a list of JSON API mirrors in order.
pub struct PackageIndex {
    client: Client,
    mirrors: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexDocument {
    #[serde(default)]
    pub releases: HashMap<String, Vec<Distribution>>,
}

#[derive(Debug, Deserialize)]
pub struct Distribution {
    #[serde(default)]
    pub yanked: bool,
}

impl PackageIndex {
    pub fn new(mirrors: Vec<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pipup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipupError::request("package index client", e))?;

        Ok(Self { client, mirrors })
    }

    /// Release names of `name`, newest first.
    pub fn releases_for(&self, name: &str) -> Result<Vec<String>> {
        lookup_mirrors(&self.mirrors, name, |url| self.fetch(url))
    }

    fn fetch(&self, url: &str) -> Result<MirrorLookup> {
        tracing::debug!("Fetching: {url}");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| PipupError::request(url, e))?;

        if !mirror_has_package(url, response.status())? {
            return Ok(MirrorLookup::Missing);
        }

        let document: IndexDocument = response
            .json()
            .map_err(|e| PipupError::invalid_response(url, e))?;
        Ok(MirrorLookup::Found(document))
    }
}

/// What a single mirror knows about a package.
#[derive(Debug)]
pub enum MirrorLookup {
    Missing,
    Found(IndexDocument),
}

/// `Ok(false)` for a 404, `Ok(true)` for success. Any other status is fatal.
pub fn mirror_has_package(url: &str, status: StatusCode) -> Result<bool> {
    if status == StatusCode::NOT_FOUND {
        return Ok(false);
    }
    if !status.is_success() {
        return Err(PipupError::Transport {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(true)
}

/// Asks each mirror in order and answers from the first one that has the
/// package. A miss moves on to the next mirror, an error aborts, and a miss
/// everywhere is [`PipupError::PackageNotFound`].
pub fn lookup_mirrors<F>(mirrors: &[String], name: &str, mut fetch: F) -> Result<Vec<String>>
where
    F: FnMut(&str) -> Result<MirrorLookup>,
{
    for mirror in mirrors {
        let url = mirror.replace("{name}", name);
        match fetch(&url)? {
            MirrorLookup::Found(document) => return Ok(select_releases(name, document)),
            MirrorLookup::Missing => {
                tracing::debug!("{name} not found on {url}, trying next mirror");
            }
        }
    }

    Err(PipupError::PackageNotFound(name.to_string()))
}

/// Drops fully yanked releases and orders the rest newest first.
///
/// A release is yanked only when it has files and every one of them is
/// marked yanked; releases without files are kept.
pub fn select_releases(name: &str, document: IndexDocument) -> Vec<String> {
    let available = document.releases.into_iter().filter_map(|(release, files)| {
        let yanked = !files.is_empty() && files.iter().all(|f| f.yanked);
        if yanked {
            tracing::debug!("[{name}] Skipping yanked release {release}");
            None
        } else {
            Some(release)
        }
    });
    version::sort_descending(available)
}
