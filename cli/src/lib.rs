mod admin_cmd;
mod backend;
mod browse_cmd;
pub mod config;
mod tree_cmd;

pub use admin_cmd::AdminCli;
pub use admin_cmd::AdminCommand;
pub use backend::Backend;
pub use browse_cmd::BrowseArgs;
pub use browse_cmd::run_browse;
pub use config::ShopfrontConfig;
pub use tree_cmd::TreeArgs;
pub use tree_cmd::run_tree;

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "shopfront", version, about = "Browse and administer a product catalog")]
pub struct Cli {
    /// TOML config file (defaults to ./shopfront.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run against an in-memory copy of this JSON fixture instead of the store
    #[arg(long, global = true, value_name = "JSON")]
    pub fixture: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decode an address and show the matching page of products
    Browse(BrowseArgs),

    /// Show the taxonomy with per-node product counts
    Tree(TreeArgs),

    /// Create or delete taxonomy nodes
    Admin(AdminCli),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = ShopfrontConfig::load(self.config.as_deref())?;
        init_tracing(config.log_level.as_deref());
        let backend = Backend::open(&config.store, self.fixture.as_deref())?;
        match self.command {
            Command::Browse(args) => run_browse(args, &config, &backend).await,
            Command::Tree(args) => run_tree(args, &backend).await,
            Command::Admin(admin) => admin.run(&backend).await,
        }
    }
}

/// `RUST_LOG` wins over the configured level, which wins over `info`.
fn init_tracing(configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or(DEFAULT_LOG_LEVEL)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
