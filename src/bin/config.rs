//! jschema Config CLI
//!
//! View and manage derivation configuration, and print the JSON Schema of the
//! configuration file itself.

use anyhow::Context;
use clap::{Parser, Subcommand};
use jschema::{SchemaConfig, Schemas};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jschema-config")]
#[command(about = "View and manage jschema configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Show {
        /// Config file to load (optional)
        #[arg(short, long)]
        config: Option<String>,

        /// Output as TOML
        #[arg(long)]
        toml: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path (default: jschema.toml)
        #[arg(short, long, default_value = "jschema.toml")]
        output: String,
    },

    /// Validate configuration
    Validate {
        /// Config file to validate
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Print the JSON Schema of the config file format
    Schema {
        /// Config file whose settings drive the derivation (optional)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Show { config, toml, json } => {
            let cfg = SchemaConfig::load_from(config.as_deref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 jschema Configuration\n");
                println!("Schemas:");
                println!("  Ref prefix: {}", cfg.schemas.ref_prefix);
                println!("  Numeric: {:?}", cfg.schemas.numeric);
                println!("  Interfaces: {:?}", cfg.schemas.interfaces);
                println!("  Sort enums: {}", cfg.schemas.sort_enums);

                println!("\nExport:");
                println!("  Format: {:?}", cfg.export.output_format);
                println!("  Standalone: {}", cfg.export.standalone);
            }
        }

        Commands::Init { output } => {
            let cfg = SchemaConfig::default();
            cfg.save(&output)
                .with_context(|| format!("writing {}", output))?;
            println!("✅ Created config file: {}", output);
        }

        Commands::Validate { config } => match SchemaConfig::load_from(config.as_deref()) {
            Ok(cfg) => {
                println!("✅ Configuration is valid");
                println!("   Ref prefix: {}", cfg.schemas.ref_prefix);
                println!("   Numeric: {:?}", cfg.schemas.numeric);
            }
            Err(e) => {
                eprintln!("❌ Configuration error: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Schema { config } => {
            let cfg = SchemaConfig::load_from(config.as_deref())?;
            let mut schemas = Schemas::from_config(&cfg);

            let root = schemas
                .define::<SchemaConfig>()
                .context("deriving the config schema")?;
            let rendered = if cfg.export.standalone {
                cfg.export.render(&schemas.to_standalone(&root))?
            } else {
                cfg.export.render(&schemas.json())?
            };

            println!("{}", rendered);
        }
    }

    Ok(())
}
