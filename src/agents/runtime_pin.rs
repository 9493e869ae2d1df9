use crate::agents::project_scanner::RUNTIME_PIN;
use crate::changes::RuntimePinFile;
use crate::error::{PipupError, Result};
use crate::version::Version;
use quick_xml::de::from_str;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const RUNTIME_LISTING_URL: &str = "https://heroku-buildpack-python.s3.us-east-1.amazonaws.com";

const BUILD_PREFIX: &str = "python-";
const BUILD_PLATFORM: &str = "-ubuntu-22.04-";

/// RuntimePinAgent moves `.python-version` to the newest published runtime
/// build.
pub struct RuntimePinAgent {
    client: Client,
    project_path: PathBuf,
    listing_url: String,
}

#[derive(Debug, Deserialize)]
struct ListBucketResult {
    #[serde(rename = "Contents", default)]
    contents: Vec<Contents>,
}

#[derive(Debug, Deserialize)]
struct Contents {
    #[serde(rename = "Key")]
    key: String,
}

impl RuntimePinAgent {
    pub fn new<P: AsRef<Path>>(project_path: P) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("pipup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipupError::request(RUNTIME_LISTING_URL, e))?;

        Ok(Self {
            client,
            project_path: project_path.as_ref().to_path_buf(),
            listing_url: RUNTIME_LISTING_URL.to_string(),
        })
    }

    /// Returns the changed pin file, or `None` when the pin is current or no
    /// build could be found.
    pub fn bump(&self) -> Result<Option<RuntimePinFile>> {
        let current = fs::read_to_string(self.project_path.join(RUNTIME_PIN))?
            .trim()
            .to_string();

        let Some(latest) = self.latest_release()? else {
            tracing::warn!("No runtime builds found at {}", self.listing_url);
            return Ok(None);
        };

        if latest == current {
            tracing::info!("{RUNTIME_PIN} is up to date ({current})");
            return Ok(None);
        }

        tracing::info!("Bumping {RUNTIME_PIN}: {current} -> {latest}");
        Ok(Some(RuntimePinFile::new(RUNTIME_PIN, current, latest)))
    }

    fn latest_release(&self) -> Result<Option<String>> {
        tracing::debug!("Fetching: {}", self.listing_url);
        let response = self
            .client
            .get(&self.listing_url)
            .send()
            .map_err(|e| PipupError::request(&self.listing_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipupError::Transport {
                url: self.listing_url.clone(),
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .map_err(|e| PipupError::invalid_response(&self.listing_url, e))?;
        latest_from_listing(&text).map_err(|e| PipupError::invalid_response(&self.listing_url, e))
    }
}

/// Highest runtime version among `python-<version>-ubuntu-22.04-*` keys of
/// an S3 bucket listing.
pub fn latest_from_listing(xml: &str) -> std::result::Result<Option<String>, quick_xml::DeError> {
    let listing: ListBucketResult = from_str(xml)?;

    let latest = listing
        .contents
        .iter()
        .filter_map(|entry| {
            let file_name = entry.key.rsplit('/').next()?;
            if !file_name.starts_with(BUILD_PREFIX) || !file_name.contains(BUILD_PLATFORM) {
                return None;
            }
            Version::parse(file_name.split('-').nth(1)?).ok()
        })
        .max();

    Ok(latest.map(|v| v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>heroku-buildpack-python</Name>
  <IsTruncated>false</IsTruncated>
  <Contents><Key>python-3.11.4-ubuntu-22.04-amd64.tar.zst</Key><Size>1</Size></Contents>
  <Contents><Key>python-3.12.1-ubuntu-22.04-arm64.tar.zst</Key><Size>1</Size></Contents>
  <Contents><Key>python-3.13.0-ubuntu-24.04-amd64.tar.zst</Key><Size>1</Size></Contents>
  <Contents><Key>heroku-22/runtimes/python-3.12.10-ubuntu-22.04-amd64.tar.zst</Key></Contents>
  <Contents><Key>pypy-3.12.2-ubuntu-22.04-amd64.tar.zst</Key></Contents>
  <Contents><Key>python-3.14.0rc1-ubuntu-22.04-amd64.tar.zst</Key></Contents>
</ListBucketResult>"#;

    #[test]
    fn picks_highest_matching_build() {
        assert_eq!(
            latest_from_listing(LISTING).unwrap().as_deref(),
            Some("3.14.0rc1")
        );
    }

    #[test]
    fn ignores_other_platforms() {
        let xml = r#"<ListBucketResult>
  <Contents><Key>python-3.13.0-ubuntu-24.04-amd64.tar.zst</Key></Contents>
  <Contents><Key>python-3.12.10-ubuntu-22.04-amd64.tar.zst</Key></Contents>
  <Contents><Key>python-3.12.9-ubuntu-22.04-amd64.tar.zst</Key></Contents>
</ListBucketResult>"#;
        assert_eq!(latest_from_listing(xml).unwrap().as_deref(), Some("3.12.10"));
    }

    #[test]
    fn empty_listing_has_no_release() {
        assert_eq!(latest_from_listing("<ListBucketResult></ListBucketResult>").unwrap(), None);
    }
}
