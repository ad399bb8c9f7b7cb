use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing::{info, warn};

use edugate::config::{Config, ScorerBackend};
use edugate::db::Database;
use edugate::moderation::{EvaluationHarness, ModerationEngine};
use edugate::policy::PolicyUpdate;
use edugate::toxicity::ToxicityScorer;

/// edugate: moderation policy engine for an educational sharing platform.
///
/// Decides whether submitted content is approved, using administrator-tuned
/// keyword rules and an optional external toxicity score.
#[derive(Parser)]
#[command(name = "edugate", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and seed the default policy
    Init,

    /// Show the live moderation policy
    Settings,

    /// Update the moderation policy (only the flags you pass change)
    Set {
        #[arg(long)]
        enabled: Option<bool>,

        #[arg(long)]
        strict_mode: Option<bool>,

        /// Toxicity threshold in [0, 1]
        #[arg(long)]
        threshold: Option<f64>,

        #[arg(long)]
        keyword_moderation: Option<bool>,

        #[arg(long)]
        external_scoring: Option<bool>,

        #[arg(long)]
        auto_approve_educational: Option<bool>,

        /// Custom banned words, comma-separated (replaces the current list)
        #[arg(long, value_delimiter = ',')]
        banned_words: Option<Vec<String>>,

        /// Custom educational words, comma-separated (replaces the current list)
        #[arg(long, value_delimiter = ',')]
        educational_words: Option<Vec<String>>,

        /// Recorded as the policy's `updatedBy`
        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// Dry-run moderation on literal text without storing anything
    Test {
        /// One or more texts to evaluate
        #[arg(required = true)]
        texts: Vec<String>,

        /// Number of texts to evaluate in parallel (default: 4)
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Show system status (backend, policy version, last update)
    Status,

    /// Start the moderation HTTP API
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on (default: 3000)
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Address to bind (default: 127.0.0.1)
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("edugate=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing edugate database...");
            let config = Config::load()?;
            let db = init_database(&config).await?;
            let engine = ModerationEngine::new(db.clone(), None, config.scorer_timeout);
            let policy = engine.store.current().await?;
            let table_count = db.table_count().await?;
            if config.uses_postgres() {
                println!("Database initialized (PostgreSQL)");
            } else {
                println!("Database initialized at: {}", config.db_path);
            }
            println!("Tables created: {table_count}");
            println!("Policy version: {}", policy.version);
            println!("\nedugate is ready. Review the policy with: edugate settings");
        }

        Commands::Settings => {
            let config = Config::load()?;
            let engine = build_engine(&config, false).await?;
            let policy = engine.admin.get_policy().await?;
            edugate::output::terminal::display_policy(&policy);
        }

        Commands::Set {
            enabled,
            strict_mode,
            threshold,
            keyword_moderation,
            external_scoring,
            auto_approve_educational,
            banned_words,
            educational_words,
            actor,
        } => {
            let update = PolicyUpdate {
                enabled,
                strict_mode,
                toxicity_threshold: threshold,
                keyword_moderation_enabled: keyword_moderation,
                external_scoring_enabled: external_scoring,
                auto_approve_educational,
                custom_banned_words: banned_words,
                custom_educational_words: educational_words,
                ..Default::default()
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update. Pass at least one setting, e.g. --threshold 0.7");
            }

            let config = Config::load()?;
            let engine = build_engine(&config, false).await?;
            let policy = engine.admin.update_policy(&update, &actor).await?;
            println!(
                "{}",
                format!("Policy updated to v{}", policy.version).green()
            );
            edugate::output::terminal::display_policy(&policy);
        }

        Commands::Test { texts, concurrency } => {
            for text in &texts {
                EvaluationHarness::check_text(text)?;
            }
            let config = Config::load()?;
            let engine = build_engine(&config, true).await?;

            let results = engine.harness.dry_run_many(&texts, concurrency).await;
            let mut failures = 0usize;
            for (text, result) in texts.iter().zip(results) {
                match result {
                    Ok(decision) => edugate::output::terminal::display_decision(text, &decision),
                    Err(e) => {
                        failures += 1;
                        warn!(error = %e, "Dry run failed");
                        println!("  {} {}", "ERROR".red().bold(), e);
                    }
                }
            }
            if failures > 0 {
                anyhow::bail!("{failures} of {} dry runs failed", texts.len());
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            if !config.uses_postgres() && !std::path::Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `edugate init` to set up the database.");
                return Ok(());
            }
            let engine = build_engine(&config, false).await?;
            edugate::status::show(&engine.store, &config).await?;
        }

        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            config.require_web()?;
            let engine = Arc::new(build_engine(&config, true).await?);
            // Seed the default policy before the first request arrives
            engine.store.current().await?;
            edugate::web::run_server(config, engine, port, &bind).await?;
        }
    }

    Ok(())
}

/// Open the configured database and wire a ModerationEngine around it.
///
/// The external scorer is only built for commands that evaluate content.
async fn build_engine(config: &Config, with_scorer: bool) -> Result<ModerationEngine> {
    let db = open_database(config).await?;
    let scorer = if with_scorer {
        create_scorer(config)?
    } else {
        None
    };
    Ok(ModerationEngine::new(db, scorer, config.scorer_timeout))
}

/// Open the database: PostgreSQL if DATABASE_URL is set, otherwise SQLite.
async fn open_database(config: &Config) -> Result<Arc<dyn Database>> {
    if let Some(url) = postgres_url(config)? {
        return connect_postgres(url).await;
    }
    #[cfg(feature = "sqlite")]
    {
        edugate::db::open_sqlite(&config.db_path)
    }
    #[cfg(not(feature = "sqlite"))]
    {
        warn!("Built without the 'sqlite' feature; policy changes will not persist");
        Ok(edugate::db::in_memory())
    }
}

/// Initialize the database (create if needed).
async fn init_database(config: &Config) -> Result<Arc<dyn Database>> {
    if let Some(url) = postgres_url(config)? {
        return connect_postgres(url).await;
    }
    #[cfg(feature = "sqlite")]
    {
        edugate::db::initialize_sqlite(&config.db_path)
    }
    #[cfg(not(feature = "sqlite"))]
    {
        warn!("Built without the 'sqlite' feature; policy changes will not persist");
        Ok(edugate::db::in_memory())
    }
}

fn postgres_url(config: &Config) -> Result<Option<&str>> {
    if !config.uses_postgres() {
        return Ok(None);
    }
    if !cfg!(feature = "postgres") {
        anyhow::bail!(
            "DATABASE_URL points to PostgreSQL but the 'postgres' feature is not compiled in.\n\
             Rebuild with: cargo build --features postgres"
        );
    }
    Ok(config.database_url.as_deref())
}

#[cfg(feature = "postgres")]
async fn connect_postgres(url: &str) -> Result<Arc<dyn Database>> {
    info!("Using PostgreSQL backend");
    edugate::db::connect_postgres(url).await
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(_url: &str) -> Result<Arc<dyn Database>> {
    anyhow::bail!("PostgreSQL support is not compiled in")
}

/// Create the external toxicity scorer, if one is configured.
fn create_scorer(config: &Config) -> Result<Option<Arc<dyn ToxicityScorer>>> {
    config.require_scorer()?;
    match config.scorer_backend {
        ScorerBackend::None => {
            info!("No external toxicity scorer configured; keyword rules only");
            Ok(None)
        }
        ScorerBackend::Perspective => {
            info!("Using Perspective API toxicity scorer");
            let scorer = edugate::toxicity::perspective::PerspectiveScorer::new(
                config.perspective_api_key.clone(),
            );
            Ok(Some(Arc::new(scorer)))
        }
    }
}
