//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` / `open_ledger` - Shared utilities to open the store
//! - `load_config` - Resolve the family/backend configuration
//! - `build_engine` - Wire config, calendar, knowledge, ledger and backend together
//! - `cmd_init` - Initialize the database
//! - `cmd_backend` - Report the configured backend and whether it answers

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ginger_core::{
    create_provider, BackendInfo, CalendarProvider, CancellationToken, Database,
    GenerativeClient, GingerConfig, InsightEngine, InteractionLedger, JsonFileCalendar,
    KnowledgeIndex, RequestOptions, StaticCalendar,
};
use serde::Serialize;
use tracing::{info, warn};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn open_ledger(db_path: &Path, no_encrypt: bool) -> Result<InteractionLedger> {
    Ok(InteractionLedger::new(Arc::new(open_db(db_path, no_encrypt)?)))
}

/// Explicit file if given, otherwise the data dir override or embedded defaults
pub fn load_config(path: Option<&Path>) -> Result<GingerConfig> {
    match path {
        Some(path) => GingerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => GingerConfig::load().context("Failed to load config"),
    }
}

/// Events file from config if set, otherwise an empty calendar
pub fn calendar_provider(config: &GingerConfig) -> Arc<dyn CalendarProvider> {
    match config.calendar.events_file {
        Some(ref path) => Arc::new(JsonFileCalendar::new(path)),
        None => Arc::new(StaticCalendar::default()),
    }
}

/// Knowledge index seeded from the configured knowledge directory
///
/// A directory that fails to load leaves the index partially filled.
pub async fn build_index(config: &GingerConfig) -> Result<KnowledgeIndex> {
    let index = KnowledgeIndex::new(create_provider(&config.embedding), config.retrieval.top_k);

    if let Some(ref dir) = config.retrieval.knowledge_dir {
        if dir.is_dir() {
            match index.load_dir(dir).await {
                Ok(count) => info!(dir = %dir.display(), count, "Indexed knowledge documents"),
                Err(e) => warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Failed to load knowledge, retrieval will be degraded"
                ),
            }
        } else {
            warn!(dir = %dir.display(), "Knowledge directory not found, retrieval will be empty");
        }
    }

    Ok(index)
}

pub async fn build_engine(
    db_path: &Path,
    config: GingerConfig,
    no_encrypt: bool,
) -> Result<InsightEngine> {
    let ledger = open_ledger(db_path, no_encrypt)?;
    let index = build_index(&config).await?;
    let calendar = calendar_provider(&config);
    let client = GenerativeClient::from_config(&config.backend);

    InsightEngine::new(Arc::new(config), calendar, Arc::new(index), ledger, client)
        .context("Failed to build insight engine")
}

/// Options for a generating command: optional deadline, cancelled on Ctrl-C
pub fn request_options(timeout_secs: Option<u64>) -> RequestOptions {
    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let options = RequestOptions::default().with_cancel(token);
    match timeout_secs {
        Some(secs) => options.with_deadline(Duration::from_secs(secs)),
        None => options,
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn cmd_init(db_path: &Path, config: &GingerConfig, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    match config.source {
        Some(ref path) => println!("   Config: {}", path.display()),
        None => println!("   Config: built-in defaults"),
    }
    println!("   Family: {}", config.family.member_ids().join(", "));
    println!(
        "   Backend: {} ({})",
        config.backend.kind.as_str(),
        config.backend.model
    );

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Log an interaction: ginger log -m son -t homework -d 45 -q 8");
    println!("  2. Get recommendations: ginger calendar --recommend");

    Ok(())
}

pub async fn cmd_backend(client: &GenerativeClient) -> Result<BackendInfo> {
    let info = client.info().await;
    if !info.healthy {
        warn!(kind = %info.kind, host = %info.host, "Backend is not reachable");
    }
    print_json(&info)?;
    Ok(info)
}
