//! Line classifier for requirements files.
//!
//! Each physical line becomes a plain declaration, a VCS reference, or an
//! opaque passthrough. Nothing here fails: lines that cannot be understood
//! are kept verbatim.

use crate::requirements::directive::DirectiveSet;
use crate::requirements::entry::{Dependency, DependencyEntry, Origin, PinLayout, VcsLocation};
use regex::Regex;
use std::sync::LazyLock;

const SUPPORTED_HOST: &str = "github.com";

static DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<head>
            \s*
            (?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)
            (?:\s*\[(?P<extras>[^\]]*)\])?
        )
        (?P<spec>
            \s*(?:===|==|~=|!=|<=|>=|<|>)\s*[^\s;\#,]+
            (?:\s*,\s*(?:===|==|~=|!=|<=|>=|<|>)\s*[^\s;\#,]+)*
        )?
        (?P<rest>
            \s*
            (?:;(?P<marker>[^\#]*))?
            (?P<comment>\#.*)?
        )$",
    )
    .expect("declaration pattern is valid")
});

static PIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<op>\s*==\s*)(?P<pin>[^\s;#,*=][^\s;#,*]*)$").expect("pin pattern is valid")
});

static VCS_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:-e|--editable)\s+)?(?:git|hg|svn|bzr)\+[A-Za-z]+://")
        .expect("vcs hint pattern is valid")
});

static VCS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<prefix>\s*(?:(?:-e|--editable)\s+)?)
        (?P<scheme>git\+[A-Za-z]+)://
        (?P<authority>[^@/\s]+@)?
        (?P<host>[^/\s@]+)
        /(?P<path>[^@\#\s]+)
        (?:@(?P<ref>[^\#\s]+))?
        \#egg=(?P<egg>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)
        (?:\[(?P<extras>[^\]]*)\])?
        (?P<trailing>.*)$",
    )
    .expect("vcs pattern is valid")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<head>\s*(?P<url>[A-Za-z][A-Za-z0-9+.-]*://\S+))(?P<rest>\s*(?P<comment>#.*)?)$")
        .expect("url pattern is valid")
});

/// Classifies a single line (without its line terminator).
pub fn parse_line(line: &str) -> DependencyEntry {
    if let Some(dependency) = parse_declaration(line) {
        return DependencyEntry::Declared(dependency);
    }

    if VCS_HINT_RE.is_match(line) {
        return match parse_vcs(line) {
            Ok(dependency) => DependencyEntry::Declared(dependency),
            Err(reason) => {
                tracing::warn!("Keeping VCS requirement as-is ({reason}): {}", line.trim());
                DependencyEntry::Opaque(line.to_string())
            }
        };
    }

    if let Some(dependency) = parse_direct_url(line) {
        return DependencyEntry::Declared(dependency);
    }

    DependencyEntry::Opaque(line.to_string())
}

fn split_extras(extras: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for extra in extras.unwrap_or("").split(',').map(str::trim) {
        if !extra.is_empty() && !out.iter().any(|e| e == extra) {
            out.push(extra.to_string());
        }
    }
    out
}

fn parse_declaration(line: &str) -> Option<Dependency> {
    let caps = DECLARATION_RE.captures(line)?;
    let head = caps.name("head")?;
    let rest = caps.name("rest")?;

    let (operator, pin) = match caps.name("spec") {
        Some(spec) => {
            let Some(pinned) = PIN_RE.captures(spec.as_str()) else {
                tracing::debug!("Unsupported version specifier, keeping line: {}", line.trim());
                return None;
            };
            (
                Some(pinned["op"].to_string()),
                Some(pinned["pin"].to_string()),
            )
        }
        None => (None, None),
    };

    let comment = caps.name("comment").map(|m| m.as_str());

    Some(Dependency {
        name: caps["name"].to_string(),
        pin,
        extras: split_extras(caps.name("extras").map(|m| m.as_str())),
        directives: DirectiveSet::parse(comment),
        origin: Origin::Index(PinLayout {
            head: head.as_str().to_string(),
            operator,
            tail: without_comment(rest.as_str(), comment),
        }),
    })
}

fn parse_vcs(line: &str) -> Result<Dependency, String> {
    let caps = VCS_RE
        .captures(line)
        .ok_or_else(|| "missing #egg fragment".to_string())?;

    let host = &caps["host"];
    if !host.eq_ignore_ascii_case(SUPPORTED_HOST) {
        return Err(format!("unsupported host '{host}'"));
    }

    let path = caps["path"]
        .strip_suffix(".git")
        .ok_or_else(|| format!("path '{}' does not end in .git", &caps["path"]))?;

    let segments: Vec<&str> = path.split('/').collect();
    let [org, repo] = segments.as_slice() else {
        return Err(format!("expected org/repo, found '{path}'"));
    };
    if org.is_empty() || repo.is_empty() {
        return Err(format!("expected org/repo, found '{path}'"));
    }

    let trailing = &caps["trailing"];
    let comment = trailing.find('#').map(|idx| &trailing[idx..]);

    Ok(Dependency {
        name: caps["egg"].to_string(),
        pin: caps.name("ref").map(|m| m.as_str().to_string()),
        extras: split_extras(caps.name("extras").map(|m| m.as_str())),
        directives: DirectiveSet::parse(comment),
        origin: Origin::Vcs(VcsLocation {
            prefix: caps["prefix"].to_string(),
            scheme: caps["scheme"].to_string(),
            authority: caps.name("authority").map(|m| m.as_str().to_string()),
            host: host.to_string(),
            org: org.to_string(),
            repo: repo.to_string(),
            trailing: without_comment(trailing, comment),
        }),
    })
}

fn parse_direct_url(line: &str) -> Option<Dependency> {
    let caps = URL_RE.captures(line)?;
    let comment = caps.name("comment").map(|m| m.as_str());

    Some(Dependency {
        name: caps["url"].to_string(),
        pin: None,
        extras: Vec::new(),
        directives: DirectiveSet::parse(comment),
        origin: Origin::Index(PinLayout {
            head: caps["head"].to_string(),
            operator: None,
            tail: without_comment(&caps["rest"], comment),
        }),
    })
}

/// The comment is re-emitted from the directive set, so layouts stop short
/// of it.
fn without_comment(text: &str, comment: Option<&str>) -> String {
    let end = text.len() - comment.map_or(0, str::len);
    text[..end].to_string()
}
