use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use formtool::{
    commands,
    config::{FormToolConfig, Mode},
};
use log::LevelFilter;

#[derive(Parser)]
#[command(version, about = "Schema-driven form tooling", long_about = None)]
struct Cli {
    /// Configuration file, defaults to `.formtool.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Write the result to this file instead of stdout.
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,
    #[command(subcommand)]
    command: SubCommands,
}

#[derive(Subcommand)]
enum SubCommands {
    /// Apply edit-mode visibility rules to a schema and its UI hints.
    Customize {
        /// Schema JSON file.
        schema: PathBuf,
        /// UI hints JSON file.
        #[arg(long)]
        ui: Option<PathBuf>,
        /// Edit mode, defaults to the configured one.
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,
    },
    /// Split a schema into tab sub-schemas.
    Split {
        schema: PathBuf,
        #[arg(long)]
        ui: Option<PathBuf>,
    },
    /// Inline remote `$ref`s of a schema URL or local schema file.
    Inline {
        /// `<url>#<pointer>` or a path to a JSON file.
        source: String,
    },
    /// Convert JSON form data to `.properties` text.
    ToProperties {
        data: PathBuf,
        /// Prefix prepended to every key.
        #[arg(long)]
        namespace: Option<String>,
    },
    /// Convert `.properties` text to JSON form data.
    FromProperties {
        properties: PathBuf,
        /// Schema describing the data.
        #[arg(long)]
        schema: PathBuf,
    },
    /// Print the JSON Schema of `.formtool.toml`.
    ConfigSchema,
}

#[tokio::main]
async fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = FormToolConfig::load(cli.config.as_deref()).await?;

    let output = match cli.command {
        SubCommands::Customize { schema, ui, mode } => {
            let mode = mode.unwrap_or(config.edit_mode);
            commands::customize(&schema, ui.as_deref(), mode.into()).await?
        }
        SubCommands::Split { schema, ui } => commands::split(&schema, ui.as_deref()).await?,
        SubCommands::Inline { source } => commands::inline(&source, &config).await?,
        SubCommands::ToProperties { data, namespace } => {
            commands::to_properties(&data, namespace.as_deref()).await?
        }
        SubCommands::FromProperties { properties, schema } => {
            commands::from_properties(&properties, &schema).await?
        }
        SubCommands::ConfigSchema => FormToolConfig::json_schema()?,
    };

    commands::write_output(cli.out.as_deref(), &output).await
}
