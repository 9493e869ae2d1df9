use crate::version::SpecifierSet;

const MARKER: &str = "pipup:";

/// Inline options read from a trailing `# pipup:...` comment.
///
/// `raw` keeps the comment exactly as written (from the `#` to the end of
/// the line) so rendering reproduces it byte for byte.
#[derive(Debug, Clone, Default)]
pub struct DirectiveSet {
    pub constraint: Option<SpecifierSet>,
    pub ignore: bool,
    pub use_tags: bool,
    pub allow_prereleases: bool,
    pub raw: Option<String>,
}

impl DirectiveSet {
    /// Parses a raw comment. Every whitespace-delimited token after the first
    /// `pipup:` marker is a directive; repeated markers are allowed and
    /// unknown tokens are skipped.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut directives = DirectiveSet {
            raw: raw.map(str::to_string),
            ..DirectiveSet::default()
        };

        let Some(text) = raw else {
            return directives;
        };
        let Some(start) = text.find(MARKER) else {
            return directives;
        };

        let tokens = text[start..].replace(MARKER, " ");
        for token in tokens.split_whitespace() {
            if let Some(expression) = token.strip_prefix("version:") {
                match SpecifierSet::parse(expression) {
                    Ok(set) if !set.is_empty() => directives.constraint = Some(set),
                    Ok(_) => directives.constraint = None,
                    Err(err) => tracing::warn!("Ignoring inline version directive: {err}"),
                }
                continue;
            }

            match token {
                "ignore" => directives.ignore = true,
                "git:tags" => directives.use_tags = true,
                "releases:pre" => directives.allow_prereleases = true,
                other => tracing::debug!("Unknown inline directive '{other}'"),
            }
        }

        directives
    }

    /// The comment text to re-emit, unchanged.
    pub fn render(&self) -> &str {
        self.raw.as_deref().unwrap_or("")
    }
}
