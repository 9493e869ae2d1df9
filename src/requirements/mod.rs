// Requirements files: line model, directive comments, parsing and rendering.
pub mod directive;
pub mod entry;
pub mod file;
pub mod parser;

pub use directive::DirectiveSet;
pub use entry::{Dependency, DependencyEntry, Origin};
pub use file::{RequirementsFile, UpdateRecord};
