use anyhow::{bail, Context, Result};
use layered_translations::access::{Actor, TrustedOperator};
use layered_translations::config::Config;
use layered_translations::db::Database;
use layered_translations::i18n::{TranslationMetrics, DEFAULT_NAMESPACE};
use layered_translations::service::TranslationService;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

const USAGE: &str = "\
Usage: layered-translations <command>

Commands:
  import                                   Replace system translations with the locale files
  merge                                    Merge the locale files into system translations
  sync                                     Write system translations back to the locale files
  resolve <team|-> <namespace> <key> <locale>
                                           Resolve one key (use - for no team)
  overrides <key> [namespace]              List team overrides of a key
  counts                                   List system translations with override counts";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when not present)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("layered_translations=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    // Load configuration from environment
    let config = Config::from_env()?;
    let registry = config.locale_registry()?;

    let db = Database::new(&config.database_url)
        .await
        .with_context(|| format!("Failed to open {}", config.database_url))?;
    let db = Arc::new(db);

    let service = TranslationService::new(
        db.clone(),
        Arc::new(TrustedOperator),
        db.clone(),
        registry,
        config.corpus(),
    )
    .with_corpus_namespace(&config.corpus_namespace)
    .with_chunk_size(config.import_chunk_size);

    // Ctrl-C stops bulk operations between items; applied items stay applied.
    let interrupt = service.interrupt().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current item");
            interrupt.raise();
        }
    });

    let operator = Actor::new("cli");
    match (command.as_str(), &args[1..]) {
        ("import", []) => {
            info!("Importing locale files from {}", config.locales_dir.display());
            print_json(&service.import_from_files(&operator).await?)?;
        }
        ("merge", []) => {
            info!("Merging locale files from {}", config.locales_dir.display());
            print_json(&service.merge_from_files(&operator).await?)?;
        }
        ("sync", []) => {
            info!("Syncing to locale files in {}", config.locales_dir.display());
            print_json(&service.sync_to_files(&operator).await?)?;
        }
        ("resolve", [team, namespace, key, locale]) => {
            let team = (team != "-").then_some(team.as_str());
            let resolution = service
                .resolve(&operator, team, namespace, key, locale)
                .await?;
            print_json(&resolution)?;
        }
        ("overrides", [key]) => {
            print_json(&service.overrides_for(&operator, key, DEFAULT_NAMESPACE).await?)?;
        }
        ("overrides", [key, namespace]) => {
            print_json(&service.overrides_for(&operator, key, namespace).await?)?;
        }
        ("counts", []) => {
            print_json(&service.system_entries_with_override_counts(&operator).await?)?;
        }
        _ => {
            eprintln!("{}", USAGE);
            bail!("Unknown command or wrong arguments: {}", args.join(" "));
        }
    }

    let metrics = TranslationMetrics::global().report();
    info!(
        "Resolutions: {} team, {} system, {} missing",
        metrics.resolved_team, metrics.resolved_system, metrics.resolved_missing
    );

    db.close().await;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
