use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

use cookbook_core::{CategoryFilter, RecordId};

#[derive(Debug, Parser)]
#[command(name = "cookbook", version, about = "Offline-capable recipe catalog client")]
pub struct Cli {
    /// Configuration file (falls back to $COOKBOOK_CONFIG, then config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Behave as if the device had no connectivity
    #[arg(long, global = true)]
    pub offline: bool,

    /// Print Prometheus metrics to stderr when the command finishes
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Synchronise the local catalog with the remote one
    Sync,
    /// Search the catalog
    Search { query: String },
    /// Like a record
    Like { id: RecordId },
    /// Remove a like
    Unlike { id: RecordId },
    /// List liked records
    Favorites,
    /// List records by category
    #[command(group(ArgGroup::new("category").required(true).args(["meal_type", "food_type"])))]
    Filter {
        #[arg(long)]
        meal_type: Option<String>,
        #[arg(long)]
        food_type: Option<String>,
    },
    /// Delete one of your records
    Delete { id: RecordId },
    /// Show the effective configuration with secrets redacted
    Config,
}

impl Command {
    /// Category filter of a `filter` command.
    pub fn category(&self) -> Option<CategoryFilter> {
        match self {
            Command::Filter {
                meal_type: Some(value),
                ..
            } => Some(CategoryFilter::MealType(value.clone())),
            Command::Filter {
                food_type: Some(value),
                ..
            } => Some(CategoryFilter::FoodType(value.clone())),
            _ => None,
        }
    }
}
