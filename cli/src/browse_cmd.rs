use crate::backend::Backend;
use crate::config::ShopfrontConfig;
use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use clap::Parser;
use clap::ValueEnum;
use owo_colors::OwoColorize;
use serde::Serialize;
use shopfront_filter::Address;
use shopfront_filter::FilterController;
use shopfront_filter::FilterState;
use shopfront_query::Audience;
use shopfront_query::BrowseSession;
use shopfront_query::FetchOutcome;
use shopfront_query::ProductCard;
use shopfront_query::QueryExecutor;
use shopfront_query::QueryResult;
use shopfront_query::StatusFilter;
use shopfront_query::project_page;
use shopfront_taxonomy::Taxonomy;
use shopfront_taxonomy::TaxonomyStore;

#[derive(Debug, Parser)]
pub struct BrowseArgs {
    /// Storefront address, e.g. `/store/watches?subcategories=s-brand`
    #[arg(value_name = "ADDRESS")]
    pub address: String,

    /// Products per page (defaults to the configured page size)
    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,

    /// Browse as an administrator with the given status selector
    #[arg(long, value_enum, value_name = "STATUS")]
    pub status: Option<StatusArg>,

    /// Print the state and page as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Published,
    Unpublished,
    All,
}

impl From<StatusArg> for StatusFilter {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Published => StatusFilter::Published,
            StatusArg::Unpublished => StatusFilter::Unpublished,
            StatusArg::All => StatusFilter::All,
        }
    }
}

#[derive(Serialize)]
struct BrowseReport<'a> {
    address: &'a Address,
    state: &'a FilterState,
    page: u32,
    page_size: u32,
    page_count: u32,
    total_count: u64,
    items: Vec<ProductCard>,
}

pub async fn run_browse(args: BrowseArgs, config: &ShopfrontConfig, backend: &Backend) -> Result<()> {
    let taxonomy = TaxonomyStore::new(backend.shared())
        .load()
        .await
        .context("Failed to load catalog taxonomy")?;
    let controller =
        FilterController::with_address(taxonomy.clone(), config.address.clone(), &args.address);
    let audience = match args.status {
        Some(status) => Audience::Admin(status.into()),
        None => Audience::Storefront,
    };
    let executor = QueryExecutor::new(backend.shared(), config.executor.clone());
    let session = BrowseSession::new(executor, controller.subscribe(), audience);

    let outcome = match args.page_size {
        Some(page_size) => session.set_page_size(page_size).await,
        None => session.fetch(true).await,
    };
    let result = match outcome {
        FetchOutcome::Loaded { .. } => session
            .result()
            .await
            .ok_or_else(|| anyhow!("Browse session reported a load without a result"))?,
        FetchOutcome::Failed(err) => {
            return Err(anyhow!(err.user_message())).context("Browse failed");
        }
        other => return Err(anyhow!("Fetch did not complete: {other:?}")),
    };

    let state = controller.state();
    let address = controller.address();
    let cards = project_page(&result.items, &config.projection);
    if args.json {
        let report = BrowseReport {
            address: &address,
            state,
            page: result.page,
            page_size: result.page_size,
            page_count: result.page_count(),
            total_count: result.total_count,
            items: cards,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_summary(state, &taxonomy, &address);
    print_page(&result, &cards);
    Ok(())
}

fn print_summary(state: &FilterState, taxonomy: &Taxonomy, address: &Address) {
    println!("{} {}", "Address:".bold(), address);
    if state.is_unfiltered() {
        println!("  showing the whole catalog, sorted by {}", state.sort());
        return;
    }
    let category = state
        .category()
        .and_then(|id| taxonomy.category(id))
        .map(|category| category.name.as_str())
        .unwrap_or("all");
    println!("  category: {category}");
    let subcategories: Vec<&str> = state
        .subcategories()
        .iter()
        .filter_map(|id| taxonomy.subcategory(id))
        .map(|subcategory| subcategory.name.as_str())
        .collect();
    if !subcategories.is_empty() {
        println!("  subcategories: {}", subcategories.join(", "));
    }
    let attributes: Vec<&str> = state
        .attributes()
        .iter()
        .filter_map(|id| taxonomy.attribute(id))
        .map(|attribute| attribute.label.as_str())
        .collect();
    if !attributes.is_empty() {
        println!("  attributes: {}", attributes.join(", "));
    }
    if !state.search_text().is_empty() {
        println!("  search: {:?}", state.search_text());
    }
    println!("  sort: {}", state.sort());
}

fn print_page(result: &QueryResult, cards: &[ProductCard]) {
    if result.is_empty() {
        println!("{}", "No products match these filters.".yellow());
        return;
    }
    println!(
        "{} {} products, page {} of {}",
        "▶".bright_blue(),
        result.total_count,
        result.page,
        result.page_count()
    );
    for card in cards {
        let price = card.price_label.as_deref().unwrap_or("-");
        println!("  {}  {}  {}", card.id.dimmed(), card.title.bold(), price);
        if let Some(subtitle) = &card.subtitle {
            println!("      {subtitle}");
        }
    }
}
