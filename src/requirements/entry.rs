use crate::requirements::directive::DirectiveSet;
use std::fmt;

/// One line of a requirements file.
#[derive(Debug, Clone)]
pub enum DependencyEntry {
    /// Anything that is not a supported declaration: blank lines, comments,
    /// pip options, range specifiers. Re-emitted unchanged.
    Opaque(String),
    /// A declaration resolved against the package index or a VCS host.
    Declared(Dependency),
}

impl DependencyEntry {
    pub fn render(&self) -> String {
        match self {
            DependencyEntry::Opaque(line) => line.clone(),
            DependencyEntry::Declared(dep) => dep.render(),
        }
    }
}

impl fmt::Display for DependencyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Fields shared by plain and VCS declarations; `origin` says where the
/// candidates come from and how the line is laid out.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub name: String,
    pub pin: Option<String>,
    pub extras: Vec<String>,
    pub directives: DirectiveSet,
    pub origin: Origin,
}

#[derive(Debug, Clone)]
pub enum Origin {
    Index(PinLayout),
    Vcs(VcsLocation),
}

/// The literal text around a plain declaration's pin.
///
/// `head` runs up to the end of the name and extras, `operator` is the
/// original `==` with its surrounding spaces (absent when unpinned) and
/// `tail` holds markers and spacing up to the comment.
#[derive(Debug, Clone, Default)]
pub struct PinLayout {
    pub head: String,
    pub operator: Option<String>,
    pub tail: String,
}

/// A `git+<transport>://[user@]github.com/<org>/<repo>.git[@ref]#egg=<name>`
/// reference.
#[derive(Debug, Clone)]
pub struct VcsLocation {
    /// Text before the URL, e.g. `-e `.
    pub prefix: String,
    pub scheme: String,
    /// `user@` part, kept verbatim.
    pub authority: Option<String>,
    pub host: String,
    pub org: String,
    pub repo: String,
    /// Everything between the egg fragment and the comment.
    pub trailing: String,
}

impl Dependency {
    /// Direct URL requirements have nothing to look up.
    pub fn is_url(&self) -> bool {
        self.name.contains("://")
    }

    /// A copy with only the pin replaced; layout and comment stay as parsed.
    pub fn with_pin(&self, pin: impl Into<String>) -> Self {
        Dependency {
            pin: Some(pin.into()),
            ..self.clone()
        }
    }

    pub fn render(&self) -> String {
        match &self.origin {
            Origin::Index(layout) => {
                let mut line = layout.head.clone();
                if let Some(pin) = &self.pin {
                    line.push_str(layout.operator.as_deref().unwrap_or("=="));
                    line.push_str(pin);
                }
                line.push_str(&layout.tail);
                line.push_str(self.directives.render());
                line
            }
            Origin::Vcs(location) => {
                let mut line = format!(
                    "{}{}://{}{}/{}/{}.git",
                    location.prefix,
                    location.scheme,
                    location.authority.as_deref().unwrap_or(""),
                    location.host,
                    location.org,
                    location.repo,
                );
                if let Some(pin) = &self.pin {
                    line.push('@');
                    line.push_str(pin);
                }
                line.push_str("#egg=");
                line.push_str(&self.name);
                if !self.extras.is_empty() {
                    line.push_str(&format!("[{}]", self.extras.join(",")));
                }
                line.push_str(&location.trailing);
                line.push_str(self.directives.render());
                line
            }
        }
    }
}
