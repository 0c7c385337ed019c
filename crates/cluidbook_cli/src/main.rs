//! Command-line front end for the cluidbook core.
//!
//! # Responsibility
//! - Map subcommands onto `Workbench` operations over a SQLite-backed store.
//! - Print the reconciled record list and the status line of each operation.
//!
//! The display order lives only for one invocation, so every command prints
//! the order it ends with.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use cluidbook_core::{
    apply_observed_update, classify_exchange, init_from_config, product_label, ActiveTarget,
    CoreConfig, DocumentError, DocumentFields, ExchangePhase, FieldMap, ObservedExchange, Record,
    RecordStore, SqliteKvStore, Workbench,
};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

mod args;
use args::{Cli, Commands};

const DEFAULT_DB_FILE: &str = "cluidbook.db";

/// Form fields given on the command line.
struct ArgDocument {
    fields: FieldMap,
}

#[async_trait]
impl DocumentFields for ArgDocument {
    async fn collect_fields(&self) -> Result<FieldMap, DocumentError> {
        Ok(self.fields.clone())
    }

    async fn fill_fields(&self, fields: &FieldMap) -> Result<(), DocumentError> {
        let text = serde_json::to_string_pretty(fields)
            .map_err(|err| DocumentError(err.to_string()))?;
        println!("{text}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_from_config(&config).context("failed to start logging")?;

    let db_path = config
        .db_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
    let kv = SqliteKvStore::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    let store = RecordStore::new(kv, config.store_keys());
    log::info!(
        "event=cli_start module=cli status=ok db={}",
        db_path.display()
    );

    let mut bench = Workbench::new(store);
    bench.refresh().await.context("failed to load records")?;

    let outcome = run(&mut bench, cli.command).await;
    if let Some(status) = bench.status() {
        if status.is_error() {
            eprintln!("{}", status.message);
        } else {
            println!("{}", status.message);
        }
    }
    outcome
}

async fn run(bench: &mut Workbench<SqliteKvStore>, command: Commands) -> Result<()> {
    match command {
        Commands::Import { file } => {
            let text = match file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut text = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut text)
                        .await
                        .context("failed to read stdin")?;
                    text
                }
            };
            bench.import_text(&text).await?;
            print_records(bench.records());
        }
        Commands::List => print_records(bench.records()),
        Commands::Note { id, text } => {
            bench.begin_note_edit(&id);
            bench.update_note_draft(&id, text);
            bench.save_note(&id).await?;
            print_records(bench.records());
        }
        Commands::Capture { id, fields } => {
            let document = ArgDocument {
                fields: fields.into_iter().collect(),
            };
            bench.capture_current(&document, Some(&id)).await?;
            print_records(bench.records());
        }
        Commands::Fill { id } => {
            let document = ArgDocument {
                fields: FieldMap::new(),
            };
            bench.fill_record(&document, &id).await?;
        }
        Commands::Delete { id } => {
            bench.delete_record(&id).await?;
            print_records(bench.records());
        }
        Commands::Observe { path, body } => {
            let body: serde_json::Value =
                serde_json::from_str(&body).context("request body is not valid JSON")?;
            let exchange = ObservedExchange {
                path,
                initiator: None,
                phase: ExchangePhase::Request,
                body: Some(body),
            };
            let Some(update) = classify_exchange(&exchange) else {
                println!("Request carries no record update.");
                return Ok(());
            };
            let target = ActiveTarget::load(bench.store()).await?;
            match apply_observed_update(bench.store(), &target, &update).await? {
                Some(record) => println!("Updated {} from observed request.", record.id),
                None => println!("No active cluid to update."),
            }
            bench.refresh().await?;
            print_records(bench.records());
        }
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Some(db) = &cli.db {
        config.db_path = Some(db.clone());
    }
    Ok(config)
}

fn print_records(records: &[Record]) {
    for record in records {
        let tags = match (&record.derived_state, &record.derived_step) {
            (Some(state), Some(step)) => format!("{state} / {step}"),
            (Some(tag), None) | (None, Some(tag)) => tag.clone(),
            (None, None) => String::new(),
        };
        println!(
            "{}\t{}\t{}\t{}",
            record.id,
            product_label(record),
            record.note,
            tags
        );
    }
}
