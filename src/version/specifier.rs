use crate::version::pep440::Version;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<op>~=|===|==|!=|<=|>=|<|>)\s*(?P<version>\S+)$")
        .expect("specifier pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid version specifier: '{0}'")]
pub struct InvalidSpecifier(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Compatible,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Arbitrary,
}

impl Operator {
    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "~=" => Operator::Compatible,
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "<=" => Operator::LessEqual,
            ">=" => Operator::GreaterEqual,
            "<" => Operator::Less,
            ">" => Operator::Greater,
            "===" => Operator::Arbitrary,
            _ => return None,
        })
    }

    fn as_str(&self) -> &'static str {
        match self {
            Operator::Compatible => "~=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Arbitrary => "===",
        }
    }
}

/// A single clause such as `>=1.0` or `==1.4.*`.
#[derive(Debug, Clone)]
pub struct Specifier {
    operator: Operator,
    raw_version: String,
    version: Option<Version>,
    wildcard: bool,
}

impl Specifier {
    pub fn parse(clause: &str) -> Result<Self, InvalidSpecifier> {
        let clause = clause.trim();
        let invalid = || InvalidSpecifier(clause.to_string());
        let caps = CLAUSE_RE.captures(clause).ok_or_else(invalid)?;
        let operator = Operator::parse(&caps["op"]).ok_or_else(invalid)?;
        let raw_version = caps["version"].to_string();

        if operator == Operator::Arbitrary {
            return Ok(Specifier {
                operator,
                raw_version,
                version: None,
                wildcard: false,
            });
        }

        let (version_text, wildcard) = match raw_version.strip_suffix(".*") {
            Some(prefix) if matches!(operator, Operator::Equal | Operator::NotEqual) => {
                (prefix, true)
            }
            Some(_) => return Err(invalid()),
            None => (raw_version.as_str(), false),
        };

        let version = Version::parse(version_text).map_err(|_| invalid())?;

        if operator == Operator::Compatible && version.release().len() < 2 {
            return Err(invalid());
        }

        Ok(Specifier {
            operator,
            raw_version,
            version: Some(version),
            wildcard,
        })
    }

    fn names_prerelease(&self) -> bool {
        self.version.as_ref().is_some_and(Version::is_prerelease)
    }

    pub fn matches(&self, candidate: &Version) -> bool {
        let Some(spec) = &self.version else {
            return candidate
                .to_string()
                .eq_ignore_ascii_case(self.raw_version.trim());
        };

        match self.operator {
            Operator::Equal => self.equals(spec, candidate),
            Operator::NotEqual => !self.equals(spec, candidate),
            Operator::Compatible => {
                let release = spec.release();
                candidate.public() >= *spec
                    && candidate.epoch() == spec.epoch()
                    && candidate.release_starts_with(&release[..release.len() - 1])
            }
            Operator::LessEqual => candidate.public() <= *spec,
            Operator::GreaterEqual => candidate.public() >= *spec,
            Operator::Less => {
                candidate.public() < *spec
                    && !(!spec.is_prerelease()
                        && candidate.is_prerelease()
                        && candidate.same_release(spec))
            }
            Operator::Greater => {
                candidate.public() > *spec
                    && !(!spec.is_postrelease()
                        && candidate.is_postrelease()
                        && candidate.same_release(spec))
            }
            Operator::Arbitrary => false,
        }
    }

    fn equals(&self, spec: &Version, candidate: &Version) -> bool {
        if self.wildcard {
            return candidate.epoch() == spec.epoch()
                && candidate.release_starts_with(spec.release());
        }
        if spec.has_local() {
            candidate == spec
        } else {
            candidate.public() == *spec
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator.as_str(), self.raw_version)
    }
}

/// A comma-separated conjunction of clauses, e.g. `>=1.0,<2.0`.
///
/// An empty set accepts every final release.
#[derive(Debug, Clone, Default)]
pub struct SpecifierSet {
    specifiers: Vec<Specifier>,
}

impl SpecifierSet {
    pub fn parse(text: &str) -> Result<Self, InvalidSpecifier> {
        let specifiers = text
            .split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(Specifier::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SpecifierSet { specifiers })
    }

    pub fn is_empty(&self) -> bool {
        self.specifiers.is_empty()
    }

    /// Tests a candidate against every clause. Pre-releases are rejected
    /// unless `allow_prereleases` is set or a clause names one explicitly.
    pub fn contains(&self, candidate: &Version, allow_prereleases: bool) -> bool {
        if candidate.is_prerelease()
            && !allow_prereleases
            && !self.specifiers.iter().any(Specifier::names_prerelease)
        {
            return false;
        }
        self.specifiers.iter().all(|spec| spec.matches(candidate))
    }
}

impl FromStr for SpecifierSet {
    type Err = InvalidSpecifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpecifierSet::parse(s)
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.specifiers.iter().map(|s| s.to_string()).collect();
        f.write_str(&clauses.join(","))
    }
}
