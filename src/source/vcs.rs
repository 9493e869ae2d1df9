use crate::error::Result;
use crate::github::GitHubClient;
use crate::github::api::Release;
use crate::version::Version;
use regex::Regex;
use std::sync::LazyLock;

static PRERELEASE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d[-_.]?(?:a|alpha|b|beta|c|rc|pre|preview|dev)[-_.]?\d*$")
        .expect("pre-release pattern is valid")
});

/// True for tag names such as `v2.0.0-rc.1`, `1.4b2` or `3.0.dev1`.
pub fn is_prerelease_name(name: &str) -> bool {
    PRERELEASE_SUFFIX_RE.is_match(name)
}

/// Orders tag names newest first by the version they carry.
///
/// The names themselves are returned untouched since they are git refs;
/// names that do not parse as versions are dropped with a warning.
pub fn order_tag_names<I>(names: I, include_prereleases: bool) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed: Vec<(Version, String)> = names
        .into_iter()
        .filter(|name| include_prereleases || !is_prerelease_name(name))
        .filter_map(|name| match Version::parse(&name) {
            Ok(version) => Some((version, name)),
            Err(err) => {
                tracing::warn!("Skipping tag: {err}");
                None
            }
        })
        .collect();

    parsed.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    parsed.dedup_by(|a, b| a.1 == b.1);
    parsed.into_iter().map(|(_, name)| name).collect()
}

/// Tags and releases of GitHub-hosted packages.
pub struct VcsReleases {
    client: GitHubClient,
}

impl VcsReleases {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    pub fn tags_for(&self, org: &str, repo: &str, include_prereleases: bool) -> Result<Vec<String>> {
        let tags = self.client.repository_tags(org, repo)?;
        Ok(order_tag_names(
            tags.into_iter().map(|t| t.name),
            include_prereleases,
        ))
    }

    pub fn releases_for(
        &self,
        org: &str,
        repo: &str,
        include_prereleases: bool,
    ) -> Result<Vec<String>> {
        let releases = self.client.repository_releases(org, repo)?;
        Ok(published_release_names(releases, include_prereleases))
    }
}

/// Tag names of releases that are published, ordered newest first. Drafts
/// never count; releases flagged pre-release only with `include_prereleases`.
pub fn published_release_names(releases: Vec<Release>, include_prereleases: bool) -> Vec<String> {
    let names = releases
        .into_iter()
        .filter(|r| !r.draft && (include_prereleases || !r.prerelease))
        .map(|r| r.tag_name);
    order_tag_names(names, include_prereleases)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_prerelease_suffixes() {
        for name in ["v2.0.0-rc.1", "1.4b2", "3.0.dev1", "v1.0-alpha", "2.0.0-beta3", "1.0a1"] {
            assert!(is_prerelease_name(name), "{name}");
        }
        for name in ["v2.0.0", "1.4", "release-2020", "v1.0-cuda"] {
            assert!(!is_prerelease_name(name), "{name}");
        }
    }

    #[test]
    fn orders_tags_and_keeps_original_names() {
        let ordered = order_tag_names(
            names(&["v1.2.0", "v1.10.0", "v2.0.0-rc1", "nightly", "v1.9.3"]),
            false,
        );
        assert_eq!(ordered, names(&["v1.10.0", "v1.9.3", "v1.2.0"]));
    }

    fn releases(json: &str) -> Vec<Release> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn drafts_and_flagged_prereleases_are_excluded() {
        let listed = r#"[
            {"tag_name": "v2.1.0", "draft": true, "prerelease": false},
            {"tag_name": "v2.0.0", "draft": false, "prerelease": true},
            {"tag_name": "v1.9.0-rc1", "draft": false, "prerelease": false},
            {"tag_name": "v1.8.0", "draft": false, "prerelease": false},
            {"tag_name": "v1.7.0"}
        ]"#;

        assert_eq!(
            published_release_names(releases(listed), false),
            names(&["v1.8.0", "v1.7.0"])
        );
        assert_eq!(
            published_release_names(releases(listed), true),
            names(&["v2.0.0", "v1.9.0-rc1", "v1.8.0", "v1.7.0"])
        );
    }

    #[test]
    fn prereleases_included_on_request() {
        let ordered = order_tag_names(names(&["v1.0.0", "v1.1.0b1"]), true);
        assert_eq!(ordered, names(&["v1.1.0b1", "v1.0.0"]));
    }
}
