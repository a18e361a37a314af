//! Command-line front end for a tierboard database.
//!
//! # Responsibility
//! - Load config, open the board and run one operation per invocation.
//! - Keep output line-oriented so scripts can parse it.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use tierboard_core::db::open_db;
use tierboard_core::{
    init_logging, BoardConfig, BoardService, ObjectUrlHandles, Outcome, RecordStore,
    SqliteRecordStore, SyncStatus, TierId, ViewEntry,
};

#[derive(Parser, Debug)]
#[command(name = "tierboard", version, about = "Manage a tier list board")]
struct Cli {
    /// TOML config file.
    #[arg(long, default_value = "tierboard.toml")]
    config: PathBuf,
    /// Database file; overrides `db_path` from the config.
    #[arg(long)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Checks that the core library is linked.
    Ping,
    /// Prints tiers, sidebar and sync status.
    Show,
    /// Adds a file as a new sidebar item.
    Add { file: PathBuf },
    /// Appends an empty tier.
    CreateTier { label: String, color: String },
    /// Deletes a tier; its items return to the sidebar.
    DeleteTier { tier_id: String },
    /// Writes a snapshot document.
    Export { out: PathBuf },
    /// Replaces the board with a snapshot document.
    Import { input: PathBuf },
    /// Purges all items and restores the default tiers.
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Command::Ping = cli.command {
        println!("tierboard_core ping={}", tierboard_core::ping());
        println!("tierboard_core version={}", tierboard_core::core_version());
        return Ok(());
    }

    let config = BoardConfig::load_from_path(&cli.config)?.unwrap_or_default();
    if let Some(log_dir) = &config.log_dir {
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| anyhow!("log_dir is not valid UTF-8: {}", log_dir.display()))?;
        init_logging(config.effective_log_level(), log_dir).map_err(|err| anyhow!(err))?;
    }

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());
    let conn = open_db(&db_path)
        .with_context(|| format!("failed to open board at {}", db_path.display()))?;
    let store = SqliteRecordStore::try_new(&conn)?;
    let mut board = BoardService::open(store, ObjectUrlHandles::new(), config.board_options())?;
    info!(
        "event=cli_command module=cli status=start command={:?}",
        cli.command
    );

    match cli.command {
        Command::Ping => {}
        Command::Show => print_board(&board),
        Command::Add { file } => {
            let payload = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            if let Some(item_id) = applied("add", board.add_item(payload)) {
                println!("added item={item_id}");
            }
        }
        Command::CreateTier { label, color } => {
            if let Some(tier_id) = applied("create-tier", board.create_tier(&label, &color)?) {
                println!("created tier={tier_id}");
            }
        }
        Command::DeleteTier { tier_id } => {
            if applied("delete-tier", board.delete_tier(&TierId::from(tier_id))).is_some() {
                println!("deleted tier");
            }
        }
        Command::Export { out } => {
            let bytes = board.export_snapshot(Utc::now())?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("exported bytes={} path={}", bytes.len(), out.display());
        }
        Command::Import { input } => {
            let bytes = std::fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            match board.import_snapshot(&bytes)? {
                Outcome::Applied(summary) => println!(
                    "imported tiers={} items={}",
                    summary.tier_count, summary.item_count
                ),
                Outcome::Skipped(reason) => println!("skipped reason={}", reason.code()),
            }
        }
        Command::Reset => {
            if applied("reset", board.reset()).is_some() {
                println!("reset ok");
            }
        }
    }

    if let SyncStatus::Unsynced { reason } = board.sync_status() {
        return Err(anyhow!("board changes were not saved: {reason}"));
    }
    Ok(())
}

fn applied<T>(command: &str, outcome: Outcome<T>) -> Option<T> {
    match outcome {
        Outcome::Applied(value) => Some(value),
        Outcome::Skipped(reason) => {
            println!("{command} skipped reason={}", reason.code());
            None
        }
    }
}

fn print_board<S: RecordStore>(board: &BoardService<S, ObjectUrlHandles>) {
    let view = board.view();
    for tier in &view.tiers {
        println!("tier {} {} {}", tier.tier_id, tier.label, tier.color);
        print_entries(&tier.entries);
    }
    println!("sidebar");
    print_entries(&view.sidebar);
    match board.sync_status() {
        SyncStatus::Synced => println!("sync ok"),
        SyncStatus::Unsynced { reason } => println!("sync pending reason={reason}"),
    }
}

fn print_entries(entries: &[ViewEntry]) {
    for entry in entries {
        if let ViewEntry::Item { item_id, .. } = entry {
            println!("  {item_id}");
        }
    }
}
