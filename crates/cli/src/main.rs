use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ratebook_navigator::{ExpandOptions, Navigator, SelectOptions};
use ratebook_protocol::{CatalogConfig, CatalogSource, NavigationTarget};
use ratebook_search::{LiteralSearch, SuggestionEngine};
use ratebook_store::MemoryCatalog;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod report;

#[derive(Parser)]
#[command(name = "ratebook")]
#[command(about = "Browse technical pricing catalogs from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog records (JSON document with one entry per database)
    #[arg(long, global = true, env = "RATEBOOK_CATALOG")]
    catalog: Option<PathBuf>,

    /// Deployment config (TOML); built-in databases are used when omitted
    #[arg(long, global = true, env = "RATEBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Database to browse instead of the configured default
    #[arg(long, global = true)]
    database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Output JSON instead of text (implies --quiet)
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured databases
    Databases,

    /// Show the section tree of a database
    Tree(TreeArgs),

    /// Show the details of a work
    Work(CodeArgs),

    /// Resolve a resource in the catalog owning its code prefix
    Resource(CodeArgs),

    /// Rank section, work and resource suggestions for a query
    Suggest(QueryArgs),

    /// Substring search across every configured database
    Search(SearchArgs),
}

#[derive(Args)]
struct TreeArgs {
    /// Sections to expand, outermost first
    #[arg(long = "expand", value_name = "CODE")]
    expand: Vec<String>,
}

#[derive(Args)]
struct CodeArgs {
    code: String,
}

#[derive(Args)]
struct QueryArgs {
    query: String,
}

#[derive(Args)]
struct SearchArgs {
    term: String,

    /// Open the N-th hit (1-based, in listed order) and show its details
    #[arg(long, value_name = "N")]
    open: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    if cli.json {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(cli.config.as_deref())?;
    let database = cli.database.as_deref();

    match &cli.command {
        Commands::Databases => emit(cli.json, &config.databases, || {
            report::render_databases(&config)
        }),
        Commands::Tree(args) => run_tree(&cli, config, database, args).await,
        Commands::Work(args) => run_work(&cli, config, database, &args.code).await,
        Commands::Resource(args) => run_resource(&cli, config, &args.code).await,
        Commands::Suggest(args) => run_suggest(&cli, config, database, &args.query).await,
        Commands::Search(args) => run_search(&cli, config, args).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<CatalogConfig> {
    match path {
        Some(path) => CatalogConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(CatalogConfig::default()),
    }
}

fn open_catalog(cli: &Cli, config: CatalogConfig) -> Result<Arc<dyn CatalogSource>> {
    let Some(path) = cli.catalog.as_deref() else {
        bail!("No catalog given (use --catalog or RATEBOOK_CATALOG)");
    };
    let catalog = MemoryCatalog::from_path(path, config)
        .with_context(|| format!("Failed to load catalog {}", path.display()))?;
    log::info!(
        "Loaded catalog {} ({} databases)",
        path.display(),
        catalog.database_ids().len()
    );
    Ok(Arc::new(catalog))
}

fn emit<T, F>(json: bool, value: &T, render: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> String,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", render());
    }
    Ok(())
}

async fn open_navigator(
    cli: &Cli,
    config: CatalogConfig,
    database: Option<&str>,
) -> Result<Navigator> {
    let source = open_catalog(cli, config.clone())?;
    let mut navigator = Navigator::new(source, config);
    navigator.load_sections(database).await;
    if let Some(err) = navigator.snapshot().error {
        bail!(err);
    }
    Ok(navigator)
}

async fn run_tree(
    cli: &Cli,
    config: CatalogConfig,
    database: Option<&str>,
    args: &TreeArgs,
) -> Result<()> {
    let mut navigator = open_navigator(cli, config, database).await?;
    for code in &args.expand {
        navigator
            .expand_node(code, ExpandOptions::ensure_expanded())
            .await;
        if let Some(err) = navigator.snapshot().error {
            bail!("Failed to expand {code}: {err}");
        }
    }
    let snapshot = navigator.snapshot();
    emit(cli.json, &snapshot, || report::render_tree(&snapshot))
}

async fn run_work(
    cli: &Cli,
    config: CatalogConfig,
    database: Option<&str>,
    code: &str,
) -> Result<()> {
    let mut navigator = open_navigator(cli, config, database).await?;
    navigator.select_work(code, SelectOptions::default()).await;
    let snapshot = navigator.snapshot();
    if let Some(err) = snapshot.detail_error {
        bail!(err);
    }
    let Some(work) = snapshot.selected_work else {
        bail!("Work details not found: {code}");
    };
    emit(cli.json, &work, || report::render_work(&work))
}

async fn run_resource(cli: &Cli, config: CatalogConfig, code: &str) -> Result<()> {
    let source = open_catalog(cli, config.clone())?;
    let mut navigator = Navigator::new(source, config);
    navigator.select_resource(code, SelectOptions::default()).await;
    let snapshot = navigator.snapshot();
    if let Some(err) = snapshot.detail_error {
        bail!(err);
    }
    let Some(resource) = snapshot.selected_resource else {
        bail!("Resource not found: {code}");
    };
    emit(cli.json, &resource, || report::render_resource(&resource))
}

async fn run_suggest(
    cli: &Cli,
    mut config: CatalogConfig,
    database: Option<&str>,
    query: &str,
) -> Result<()> {
    config.suggest.debounce_ms = 0;
    let source = open_catalog(cli, config.clone())?;
    let engine = SuggestionEngine::new(source, config);
    let state = engine
        .update_with_database(query, database)
        .await
        .context("Suggestion request was superseded")?;
    if state.groups.is_empty() {
        if let Some(err) = &state.error {
            bail!(err.clone());
        }
    }
    emit(cli.json, &state, || report::render_suggestions(&state))
}

async fn run_search(cli: &Cli, config: CatalogConfig, args: &SearchArgs) -> Result<()> {
    let term = args.term.as_str();
    let source = open_catalog(cli, config.clone())?;
    let search = LiteralSearch::new(source.clone(), config.clone());
    let state = search
        .search_all(term)
        .await
        .context("Search was superseded")?;
    if let Some(err) = &state.error {
        bail!(err.clone());
    }
    log::debug!("{} hits for `{term}`", state.total_hits());

    let Some(n) = args.open else {
        return emit(cli.json, &state, || report::render_search(&state));
    };
    let hit = state
        .groups
        .iter()
        .flat_map(|group| group.hits.iter().map(move |hit| (group.database.as_str(), hit)))
        .nth(n.saturating_sub(1))
        .filter(|_| n > 0);
    let Some((database, hit)) = hit else {
        bail!("No hit #{n} for `{term}`");
    };

    let mut navigator = Navigator::new(source, config);
    navigator
        .open_target(&NavigationTarget::from_hit(database, hit))
        .await;
    let snapshot = navigator.snapshot();
    if let Some(err) = snapshot.detail_error {
        bail!(err);
    }
    let Some(work) = snapshot.selected_work else {
        bail!("Work details not found: {}", hit.code);
    };
    emit(cli.json, &work, || report::render_work(&work))
}
