use crate::backend::Backend;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use owo_colors::OwoColorize;
use shopfront_taxonomy::CounterAggregator;
use shopfront_taxonomy::TaxonomyStore;

#[derive(Debug, Parser)]
pub struct TreeArgs {
    /// Also show subcategory and attribute counts for this category slug
    #[arg(long, value_name = "SLUG")]
    pub expand: Option<String>,
}

pub async fn run_tree(args: TreeArgs, backend: &Backend) -> Result<()> {
    let taxonomy = TaxonomyStore::new(backend.shared())
        .load()
        .await
        .context("Failed to load catalog taxonomy")?;
    if taxonomy.is_empty() {
        println!("{}", "The catalog has no categories yet.".yellow());
        return Ok(());
    }
    let expanded = match args.expand.as_deref() {
        Some(slug) => match taxonomy.category_by_slug(slug) {
            Some(category) => Some(category.id.clone()),
            None => bail!("No category with slug {slug:?}"),
        },
        None => None,
    };

    let counters = CounterAggregator::new(backend.shared());
    let counts = counters
        .category_counts(&taxonomy)
        .await
        .context("Failed to count products per category")?;
    for (category, entry) in taxonomy.categories().iter().zip(&counts) {
        println!(
            "{} {} ({})",
            category.name.bold(),
            entry.count,
            category.slug.dimmed()
        );
        if expanded.as_ref() != Some(&category.id) {
            continue;
        }
        let subcategory_counts = counters
            .expand_category(&taxonomy, &category.id)
            .await
            .context("Failed to count products per subcategory")?;
        for (subcategory, entry) in category.subcategories.iter().zip(&subcategory_counts) {
            println!("  {} {} [{}]", subcategory.name, entry.count, subcategory.kind);
            let attribute_counts = counters
                .expand_subcategory(&taxonomy, &subcategory.id)
                .await
                .context("Failed to count products per attribute")?;
            for (attribute, entry) in subcategory.attributes.iter().zip(&attribute_counts) {
                println!("    {} {}", attribute.label, entry.count);
            }
        }
    }
    Ok(())
}
