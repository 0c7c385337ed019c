use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cluidbook")]
#[command(about = "Keep a working list of cluid records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// SQLite database file (overrides `db_path` from the config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Absolute directory for log files
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import cluids, one per line, optionally followed by a note
    Import {
        /// Read from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List records, most recently edited first
    #[command(alias = "ls")]
    List,

    /// Replace the note of a record
    Note { id: String, text: String },

    /// Store form fields for a record
    ///
    /// A non-blank `cluid` or `Cluid` field names the record and takes
    /// precedence over <ID>.
    Capture {
        /// Record id, used when the fields carry no cluid
        id: String,
        /// Fields as key=value
        #[arg(value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Print the stored form fields of a record and mark it active
    Fill { id: String },

    /// Delete a record
    #[command(alias = "rm")]
    Delete { id: String },

    /// Feed one observed application request to the last active record
    Observe {
        /// Request path, e.g. /loans/my/applications/1/step
        path: String,
        /// JSON request body
        body: String,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
