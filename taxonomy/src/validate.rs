use crate::error::Result;
use crate::error::TaxonomyError;
use crate::model::CategoryId;
use crate::model::SubcategoryId;
use crate::model::Taxonomy;

/// Derive an address-safe slug from a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Lowercase ASCII letters and digits separated by single hyphens.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TaxonomyError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn new_category(taxonomy: &Taxonomy, name: &str, slug: &str) -> Result<(String, String)> {
    let name = required("name", name)?;
    let slug = slug.trim().to_string();
    if !is_valid_slug(&slug) {
        return Err(TaxonomyError::validation(
            "slug",
            format!("{slug:?} must be lowercase letters, digits and single hyphens"),
        ));
    }
    if taxonomy.category_by_slug(&slug).is_some() {
        return Err(TaxonomyError::validation(
            "slug",
            format!("a category with slug {slug:?} already exists"),
        ));
    }
    Ok((name, slug))
}

pub(crate) fn new_subcategory(
    taxonomy: &Taxonomy,
    category_id: &CategoryId,
    name: &str,
    kind: &str,
) -> Result<(String, String)> {
    let category = taxonomy
        .category(category_id)
        .ok_or_else(|| TaxonomyError::validation("category_id", "category does not exist"))?;
    let name = required("name", name)?;
    let kind = required("type", kind)?;
    let duplicate = category
        .subcategories
        .iter()
        .any(|existing| existing.kind.trim().eq_ignore_ascii_case(&kind));
    if duplicate {
        return Err(TaxonomyError::validation(
            "type",
            format!(
                "type {kind:?} is already used by another subcategory of {}",
                category.name
            ),
        ));
    }
    Ok((name, kind))
}

pub(crate) fn new_attribute(
    taxonomy: &Taxonomy,
    subcategory_id: &SubcategoryId,
    label: &str,
) -> Result<String> {
    if taxonomy.subcategory(subcategory_id).is_none() {
        return Err(TaxonomyError::validation(
            "subcategory_id",
            "subcategory does not exist",
        ));
    }
    required("label", label)
}
