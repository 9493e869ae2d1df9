pub mod pep440;
pub mod specifier;

pub use pep440::Version;
pub use specifier::SpecifierSet;

/// Parses, sorts newest-first and de-duplicates release names, rendering
/// each survivor in canonical form. Unparseable names are dropped with a
/// warning.
///
/// Equal versions spelled differently (`2.0` and `2.0.0`) collapse to the
/// longest rendering, independent of input order.
pub fn sort_descending<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed: Vec<(Version, String)> = names
        .into_iter()
        .filter_map(|name| match Version::parse(name.as_ref()) {
            Ok(version) => {
                let rendered = version.to_string();
                Some((version, rendered))
            }
            Err(err) => {
                tracing::warn!("Skipping release: {err}");
                None
            }
        })
        .collect();

    parsed.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.len().cmp(&a.1.len()))
            .then_with(|| a.1.cmp(&b.1))
    });
    parsed.dedup_by(|next, kept| next.0 == kept.0);
    parsed.into_iter().map(|(_, rendered)| rendered).collect()
}
