use crate::config::toml_config::{EngineConfig, PersistenceBackend};
use crate::core::render::RenderFormat;
use crate::domain::model::{CommunicationMethod, ReadingType};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "tarot-spread-engine")]
#[command(about = "Draw tarot spreads, persist readings and manage credits")]
pub struct CliConfig {
    #[arg(long, short, help = "Path to a TOML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Store the ledger under this directory instead of memory")]
    pub data_dir: Option<String>,

    #[arg(long, help = "Seed for reproducible shuffles")]
    pub seed: Option<u64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON logs")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the available layouts
    Layouts,
    /// Run a complete reading: pick a type, fill the form, draw, submit
    Read(ReadArgs),
    /// Inspect or top up credit balances
    #[command(subcommand)]
    Credits(CreditsCommand),
}

#[derive(Debug, Clone, Args)]
pub struct ReadArgs {
    #[arg(long, default_value = "love")]
    pub layout: String,

    #[arg(long = "type", default_value = "simple", value_parser = parse_reading_type)]
    pub reading_type: ReadingType,

    #[arg(long, help = "Signed-in user id; omit for a guest session")]
    pub user: Option<String>,

    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub surname: String,

    #[arg(long, default_value = "", help = "YYYY-MM-DD")]
    pub birth_date: String,

    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub phone: String,

    #[arg(long, default_value = "email", value_parser = parse_method)]
    pub contact: CommunicationMethod,

    #[arg(long, default_value = "")]
    pub concern: String,

    #[arg(long, default_value = "")]
    pub understanding: String,

    #[arg(long, default_value = "")]
    pub emotional: String,

    #[arg(long, value_delimiter = ',', help = "Card ids to draw instead of the shuffled deck")]
    pub cards: Vec<u8>,

    #[arg(long, default_value = "markdown", value_parser = parse_format)]
    pub format: RenderFormat,

    #[arg(long, help = "JSON file with per-position card meanings")]
    pub meanings: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CreditsCommand {
    Grant {
        #[arg(long)]
        user: String,
        #[arg(long)]
        amount: u32,
        #[arg(long, default_value = "manual grant")]
        reason: String,
    },
    Balance {
        #[arg(long)]
        user: String,
    },
    History {
        #[arg(long)]
        user: String,
    },
}

fn parse_reading_type(value: &str) -> Result<ReadingType, String> {
    value.parse()
}

fn parse_method(value: &str) -> Result<CommunicationMethod, String> {
    value.parse()
}

fn parse_format(value: &str) -> Result<RenderFormat, String> {
    value.parse()
}

impl CliConfig {
    /// 設定檔為基礎，命令列參數覆蓋
    pub fn apply_overrides(&self, config: &mut EngineConfig) {
        if let Some(dir) = &self.data_dir {
            config.persistence.backend = PersistenceBackend::File;
            config.persistence.data_dir = dir.clone();
        }
        if let Some(seed) = self.seed {
            config.engine.seed = Some(seed);
        }
        if self.verbose {
            config.logging.verbose = true;
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}
