//! Identifier helpers: normalization and name generation.

use crate::Entity;

/// Normalized form of an identifier, used as the case-insensitive index
/// key. Original casing is kept on the value side.
pub fn normalize(name: &str) -> String {
    name.to_ascii_uppercase()
}

/// Strip a trailing `ID` / `_ID` suffix (any casing) from an identifier,
/// for deriving base names of foreign-key-generated artifacts. A name
/// that is nothing but the suffix is returned unchanged.
pub fn strip_id_suffix(name: &str) -> &str {
    let upper = normalize(name);
    let stripped = if upper.ends_with("_ID") {
        &name[..name.len() - 3]
    } else if upper.ends_with("ID") {
        &name[..name.len() - 2]
    } else {
        name
    };
    if stripped.is_empty() { name } else { stripped }
}

/// Produce a relationship name not already used on `entity`, by suffixing
/// `base` with a counter when needed. Comparison is case-insensitive.
pub fn unique_relationship_name(entity: &Entity, base: &str) -> String {
    let taken = |candidate: &str| {
        entity
            .relationships()
            .iter()
            .any(|r| r.name.eq_ignore_ascii_case(candidate))
    };

    if !taken(base) {
        return base.to_string();
    }
    let mut counter = 1;
    loop {
        let candidate = format!("{}{}", base, counter);
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
