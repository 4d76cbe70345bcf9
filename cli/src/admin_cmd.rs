use crate::backend::Backend;
use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use clap::Parser;
use clap::Subcommand;
use owo_colors::OwoColorize;
use shopfront_taxonomy::AttributeId;
use shopfront_taxonomy::CategoryId;
use shopfront_taxonomy::SubcategoryId;
use shopfront_taxonomy::Taxonomy;
use shopfront_taxonomy::TaxonomyStore;
use shopfront_taxonomy::slugify;

#[derive(Debug, Parser)]
pub struct AdminCli {
    /// Rewrite the fixture file after a successful mutation
    #[arg(long, global = true)]
    pub write_back: bool,

    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Add a top-level category
    CreateCategory(CreateCategoryArgs),

    /// Add a subcategory under a category
    CreateSubcategory(CreateSubcategoryArgs),

    /// Add an attribute under a subcategory
    CreateAttribute(CreateAttributeArgs),

    /// Remove a category with its subcategories and attributes
    DeleteCategory(NodeArgs),

    /// Remove a subcategory with its attributes
    DeleteSubcategory(NodeArgs),

    /// Remove an attribute
    DeleteAttribute(NodeArgs),
}

#[derive(Debug, Parser)]
pub struct CreateCategoryArgs {
    #[arg(long)]
    pub name: String,

    /// Address alias (derived from the name when omitted)
    #[arg(long)]
    pub slug: Option<String>,
}

#[derive(Debug, Parser)]
pub struct CreateSubcategoryArgs {
    /// Owning category, by slug or id
    #[arg(long, value_name = "CATEGORY")]
    pub category: String,

    #[arg(long)]
    pub name: String,

    /// Discriminator, unique within the category
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: String,
}

#[derive(Debug, Parser)]
pub struct CreateAttributeArgs {
    /// Owning subcategory id
    #[arg(long, value_name = "ID")]
    pub subcategory: String,

    #[arg(long)]
    pub label: String,
}

#[derive(Debug, Parser)]
pub struct NodeArgs {
    /// Node id (categories also accept their slug)
    #[arg(value_name = "ID")]
    pub id: String,
}

impl AdminCli {
    pub async fn run(self, backend: &Backend) -> Result<()> {
        let store = TaxonomyStore::new(backend.shared());
        let taxonomy = store
            .load()
            .await
            .context("Failed to load catalog taxonomy")?;
        match self.command {
            AdminCommand::CreateCategory(args) => {
                let slug = args.slug.unwrap_or_else(|| slugify(&args.name));
                let category = store
                    .create_category(&args.name, &slug)
                    .await
                    .context("Failed to create category")?;
                done(&format!("Created category {} ({})", category.id, category.slug));
            }
            AdminCommand::CreateSubcategory(args) => {
                let category = resolve_category(&taxonomy, &args.category)?;
                let subcategory = store
                    .create_subcategory(&category, &args.name, &args.kind)
                    .await
                    .context("Failed to create subcategory")?;
                done(&format!(
                    "Created subcategory {} [{}]",
                    subcategory.id, subcategory.kind
                ));
            }
            AdminCommand::CreateAttribute(args) => {
                let attribute = store
                    .create_attribute(&SubcategoryId::new(args.subcategory), &args.label)
                    .await
                    .context("Failed to create attribute")?;
                done(&format!("Created attribute {} ({})", attribute.id, attribute.label));
            }
            AdminCommand::DeleteCategory(args) => {
                let category = resolve_category(&taxonomy, &args.id)?;
                store
                    .delete_category(&category)
                    .await
                    .context("Failed to delete category")?;
                done(&format!("Deleted category {category}"));
            }
            AdminCommand::DeleteSubcategory(args) => {
                store
                    .delete_subcategory(&SubcategoryId::new(args.id.as_str()))
                    .await
                    .context("Failed to delete subcategory")?;
                done(&format!("Deleted subcategory {}", args.id));
            }
            AdminCommand::DeleteAttribute(args) => {
                store
                    .delete_attribute(&AttributeId::new(args.id.as_str()))
                    .await
                    .context("Failed to delete attribute")?;
                done(&format!("Deleted attribute {}", args.id));
            }
        }

        if self.write_back {
            backend.write_back().await?;
        } else if matches!(backend, Backend::Fixture { .. }) {
            println!(
                "{}",
                "Fixture left unchanged (pass --write-back to save).".dimmed()
            );
        }
        Ok(())
    }
}

fn resolve_category(taxonomy: &Taxonomy, key: &str) -> Result<CategoryId> {
    let id = CategoryId::new(key);
    if taxonomy.category(&id).is_some() {
        return Ok(id);
    }
    taxonomy
        .category_by_slug(key)
        .map(|category| category.id.clone())
        .ok_or_else(|| anyhow!("No category with id or slug {key:?}"))
}

fn done(message: &str) {
    println!("{} {message}", "✔".green());
}
