use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use assetsentry::rules::SipsProbe;
use assetsentry::sync::ActionKind;
use assetsentry::{
    AssetCategory, Config, GitHubSource, Manifest, MasterManifest, SyncEngine, SyncState,
};

#[derive(Parser)]
#[command(name = "assetsentry")]
#[command(about = "Remote asset discovery and synchronization daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan repositories and report discovered assets
    Scan {
        /// Scan a single repository
        #[arg(long)]
        repo: Option<String>,
    },

    /// Sync assets from the organization (dry run unless --apply)
    Sync {
        /// Actually download assets and update manifests
        #[arg(long)]
        apply: bool,

        /// Sync a single repository
        #[arg(long)]
        repo: Option<String>,
    },

    /// Run the organize + sync pipeline on a timer
    Watch {
        /// Interval between iterations in minutes
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Show mirror status
    Status,

    /// Show manifests, or rebuild the master manifest
    Manifest {
        /// Show a single category manifest
        #[arg(long = "type", value_name = "CATEGORY")]
        category: Option<String>,

        /// Rebuild the master manifest from the category manifests
        #[arg(long)]
        rebuild: bool,
    },

    /// File loose files in the mirror root by rule (dry run unless --apply)
    Organize {
        /// Actually move files
        #[arg(long)]
        apply: bool,
    },

    /// List the organization's repositories
    ListRepos,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;
    info!("Starting AssetSentry v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config)?;

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Scan { repo } => cmd_scan(repo, &config).await,
        Commands::Sync { apply, repo } => cmd_sync(apply, repo, &config).await,
        Commands::Watch { interval } => cmd_watch(interval, &config).await,
        Commands::Status => cmd_status(&config),
        Commands::Manifest { category, rebuild } => cmd_manifest(category, rebuild, &config),
        Commands::Organize { apply } => cmd_organize(apply, &config),
        Commands::ListRepos => cmd_list_repos(&config).await,
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<std::path::PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Config::load_or_default(),
    }
}

fn make_engine(config: &Config) -> Result<SyncEngine> {
    let source = GitHubSource::new(&config.organization)?;
    Ok(SyncEngine::new(config.clone(), Arc::new(source)))
}

/// Scan repositories and print what was found
async fn cmd_scan(repo: Option<String>, config: &Config) -> Result<()> {
    let engine = make_engine(config)?;

    println!("🔍 Scanning {}...", config.organization);
    let outcome = engine.scan(repo.as_deref()).await?;

    println!(
        "   {} asset(s) across {} repositories",
        outcome.assets.len(),
        outcome.repos_scanned
    );

    let mut by_category: BTreeMap<AssetCategory, BTreeMap<String, usize>> = BTreeMap::new();
    for asset in &outcome.assets {
        *by_category
            .entry(asset.category)
            .or_default()
            .entry(asset.repo.clone())
            .or_default() += 1;
    }

    for (category, repos) in &by_category {
        let total: usize = repos.values().sum();
        println!("   📦 {}/: {}", category, total);
        for (repo, count) in repos {
            println!("      └─ {}: {}", repo, count);
        }
    }

    if !outcome.errors.is_empty() {
        println!("\n⚠️  {} repository scan(s) failed:", outcome.errors.len());
        for error in &outcome.errors {
            println!("   ❌ {}: {}", error.repo, error.message);
        }
    }

    Ok(())
}

/// Diff against the sync state and either report or apply
async fn cmd_sync(apply: bool, repo: Option<String>, config: &Config) -> Result<()> {
    let engine = make_engine(config)?;

    println!("🔍 Scanning {}...", config.organization);
    let outcome = engine.scan(repo.as_deref()).await?;
    println!("   Found {} asset(s)", outcome.assets.len());

    let mut state = SyncState::load(&config.state_file());
    let plan = engine.plan(&outcome.assets, &state);

    if plan.is_empty() {
        println!("\n✅ All assets up to date.");
        return Ok(());
    }

    println!("\n{} asset(s) to sync:\n", plan.len());

    if !apply {
        for action in &plan.actions {
            let label = match action.kind {
                ActionKind::New => "new",
                ActionKind::Update => "update",
            };
            println!("  [{}] {}", label, action.descriptor.key());
        }
        println!("\nDry run - run with --apply to download assets.");
        return Ok(());
    }

    let summary = engine.apply(plan, &mut state).await?;

    println!("\n🎉 Sync complete!");
    println!("   ✅ Synced: {}", summary.synced.len());
    println!("   ❌ Failed: {}", summary.failed.len());
    println!("   ⏱️  Duration: {:.2}s", summary.duration.as_secs_f64());

    if !summary.failed.is_empty() {
        println!("\n🔍 Failed assets (will retry next run):");
        for failure in &summary.failed {
            println!("   ❌ {}: {}", failure.key, failure.error);
        }
    }

    Ok(())
}

/// Run the pipeline on a timer
async fn cmd_watch(interval: Option<u64>, config: &Config) -> Result<()> {
    let engine = make_engine(config)?;
    let rules = config.rule_set();

    println!("👁️  Watching {} (Ctrl+C to stop)", config.organization);
    assetsentry::watch::run(&engine, &rules, &SipsProbe, interval).await
}

/// Show mirror status
fn cmd_status(config: &Config) -> Result<()> {
    let state = SyncState::load(&config.state_file());

    println!("📊 AssetSentry Status");
    println!("   Organization: {}", config.organization);
    println!("   Mirror root: {}", config.assets_root().display());
    println!(
        "   Last sync: {}",
        state
            .last_sync
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );
    println!(
        "   Last organize: {}",
        state
            .last_organize
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );

    let repos_dir = config.repos_dir();
    if repos_dir.exists() {
        println!("\n   Synced assets:");
        for category in AssetCategory::ALL {
            if !category.is_synced() {
                continue;
            }
            let manifest = Manifest::load(&repos_dir, category);
            if !manifest.entries.is_empty() {
                let repos: std::collections::BTreeSet<_> = manifest
                    .entries
                    .values()
                    .map(|entry| entry.source_repo.as_str())
                    .collect();
                println!(
                    "      {}/: {} file(s) from {} repo(s)",
                    category,
                    manifest.entries.len(),
                    repos.len()
                );
            }
        }
    }

    let rules = config.rule_set();
    match assetsentry::organize::root_files(config, &rules) {
        Ok(pending) if !pending.is_empty() => {
            println!("\n   Pending: {} file(s) in root to organize", pending.len());
        }
        _ => {}
    }

    Ok(())
}

/// Show manifests, or rebuild the master manifest from disk
fn cmd_manifest(category: Option<String>, rebuild: bool, config: &Config) -> Result<()> {
    let repos_dir = config.repos_dir();

    if rebuild {
        let master = MasterManifest::rebuild(&repos_dir, &config.organization);
        master.save(&repos_dir)?;
        println!(
            "✅ Master manifest rebuilt: {} asset(s) across {} categorie(s)",
            master.total_assets,
            master.types.len()
        );
        return Ok(());
    }

    if let Some(name) = category {
        let Some(category) = AssetCategory::parse(&name) else {
            println!("❌ Unknown category: {}", name);
            return Ok(());
        };

        let manifest = Manifest::load(&repos_dir, category);
        if manifest.entries.is_empty() {
            println!("No manifest for {}/", category);
            return Ok(());
        }

        println!("{}/ manifest ({} assets):\n", category, manifest.entries.len());
        for entry in manifest.entries.values() {
            println!("  {}/{}", entry.source_repo, entry.filename);
        }
        return Ok(());
    }

    match MasterManifest::load(&repos_dir) {
        Some(master) => {
            println!("Master Manifest ({} total assets):\n", master.total_assets);
            for (category, summary) in &master.types {
                println!("  {}/: {} assets", category, summary.count);
                for (repo, files) in &summary.repos {
                    println!("    └─ {}: {} file(s)", repo, files.len());
                }
            }
        }
        None => println!("No master manifest. Run sync first, or: manifest --rebuild"),
    }

    Ok(())
}

/// File loose root files into category directories
fn cmd_organize(apply: bool, config: &Config) -> Result<()> {
    let rules = config.rule_set();
    let moves = assetsentry::organize::organize(config, &rules, &SipsProbe, apply)?;

    if moves.is_empty() {
        println!("No files to organize in mirror root.");
        return Ok(());
    }

    for entry in &moves {
        let name = entry.from.file_name().unwrap_or_default().to_string_lossy();
        let dest = entry
            .to
            .parent()
            .and_then(|p| p.file_name())
            .unwrap_or_default()
            .to_string_lossy();
        if apply {
            println!("  Moved: {} → {}/", name, dest);
        } else {
            println!("  Would move: {} → {}/", name, dest);
        }
    }

    if apply {
        let mut state = SyncState::load(&config.state_file());
        state.last_organize = Some(chrono::Utc::now());
        state.save(&config.state_file())?;
        println!("\nMoved {} file(s).", moves.len());
    } else {
        println!("\nDry run - run with --apply to move files.");
    }

    Ok(())
}

/// List the organization's repositories
async fn cmd_list_repos(config: &Config) -> Result<()> {
    use assetsentry::RemoteSource;

    let source = GitHubSource::new(&config.organization)?;
    let repos = source.list_repositories(&config.organization).await?;

    println!("{} repos in {}:\n", repos.len(), config.organization);
    for repo in repos {
        let description = repo.description.unwrap_or_default();
        let short: String = description.chars().take(50).collect();
        println!("  {:<35} {}", repo.name, short);
    }

    Ok(())
}
