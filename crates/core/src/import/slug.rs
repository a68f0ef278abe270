//! URL slug derivation and collision-free allocation.

use super::store::{DocumentStore, Filter, StoreError};

/// Generate a URL-safe slug from a display name.
///
/// Lower-cases, replaces every run of non-alphanumeric characters with a
/// single hyphen, and trims leading/trailing hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_hyphen = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    slug.trim_matches('-').to_string()
}

/// Allocate a slug for `name` that is not yet used in `collection`.
///
/// Probes `base`, `base-1`, `base-2`, ... with one existence query each.
/// Collisions are rare, so the sequential probe is fine.
pub async fn allocate_slug(
    store: &dyn DocumentStore,
    collection: &str,
    name: &str,
) -> Result<String, StoreError> {
    let base = match slugify(name) {
        s if s.is_empty() => "item".to_string(),
        s => s,
    };

    let mut candidate = base.clone();
    let mut suffix: u32 = 0;
    while store
        .count_documents(collection, &Filter::eq("slug", candidate.as_str()))
        .await?
        > 0
    {
        suffix += 1;
        candidate = format!("{base}-{suffix}");
    }
    Ok(candidate)
}
