mod batch_cmd;
mod config;
mod generate_cmd;
mod serve_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use syllabus_store::PlanRequest;

use config::{CliOverrides, SyllabusConfig};

#[derive(Parser)]
#[command(
    name = "syllabus",
    version,
    about = "Generate personalized learning plans with an LLM"
)]
struct Cli {
    /// Model name (overrides SYLLABUS_MODEL env var and config file)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a syllabus config file
    Init {
        /// Gemini API key to store in the config file
        #[arg(long)]
        api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Generate a single learning plan
    Generate {
        /// Subject to learn
        #[arg(long)]
        topic: String,
        /// What the learner already knows
        #[arg(long, default_value = "")]
        background: String,
        /// Preferred format: video, text, or audio
        #[arg(long, default_value = "video")]
        format: String,
        /// Refinement iterations (accepted, currently no effect)
        #[arg(long)]
        max_iterations: Option<u32>,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
        /// Write the plan to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate plans for every request in a JSON array file
    Batch {
        /// Path to a JSON file containing an array of plan requests
        file: PathBuf,
        /// Write per-item results as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Start the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Show only the ends of a secret.
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Execute the `syllabus init` command: write config file.
fn cmd_init(api_key: Option<String>, model: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile::with_defaults(api_key, model);
    let path = config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    match cfg.generator.api_key.as_deref() {
        Some(key) => println!("  generator.api_key = {}", mask_secret(key)),
        None => {
            println!("  generator.api_key = (not set)");
            println!();
            println!("Set SYLLABUS_API_KEY or rerun with --api-key; until then plans use fallback content.");
        }
    }
    if let Some(model) = &cfg.generator.model {
        println!("  generator.model = {model}");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { api_key, force } => {
            cmd_init(api_key, cli.model, force)?;
        }
        Commands::Generate {
            topic,
            background,
            format,
            max_iterations,
            json,
            output,
        } => {
            let resolved = SyllabusConfig::resolve(&CliOverrides {
                model: cli.model,
                ..CliOverrides::default()
            })?;
            let request = PlanRequest {
                max_iterations,
                ..PlanRequest::new(topic, background, format)
            };
            generate_cmd::run_generate(&resolved, &request, json, output.as_deref()).await?;
        }
        Commands::Batch { file, output } => {
            let resolved = SyllabusConfig::resolve(&CliOverrides {
                model: cli.model,
                ..CliOverrides::default()
            })?;
            batch_cmd::run_batch(&resolved, &file, output.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = SyllabusConfig::resolve(&CliOverrides {
                model: cli.model,
                bind,
                port,
            })?;
            serve_cmd::run_serve(&resolved).await?;
        }
    }

    Ok(())
}
