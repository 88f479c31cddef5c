//! ItemRAG - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use itemrag::{
    cli::{default_filter, render_result, Args, Commands, Verbosity},
    CancellationToken, Config, RagPipeline,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Err(message) = args.validate() {
        eprintln!("{} {}", "Error:".red().bold(), message);
        std::process::exit(2);
    }

    // Initializing must work before any config file exists
    if args.command == (Commands::Config { init: true }) {
        return init_config(&args);
    }

    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    init_tracing(args.verbosity(), &config);

    match &args.command {
        Commands::Ask {
            question,
            item_id,
            tenant,
            json,
        } => {
            ask(
                &args,
                &config,
                question,
                item_id.as_deref(),
                tenant.as_deref(),
                *json,
            )
            .await?;
        }
        Commands::Config { .. } => {
            show_config(&args, &config)?;
        }
    }

    Ok(())
}

/// Install the stderr subscriber; `RUST_LOG` wins over flags and config
fn init_tracing(verbosity: Verbosity, config: &Config) {
    let level = verbosity.log_level(&config.logging.level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn ask(
    args: &Args,
    config: &Config,
    question: &str,
    item_id: Option<&str>,
    tenant: Option<&str>,
    json: bool,
) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).context("Failed to create pipeline")?;

    // Ctrl-C cancels the run; the pipeline still returns a result
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let verbosity = args.verbosity();
    let spinner = if verbosity.show_progress() && !json {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .context("Invalid spinner template")?,
        );
        pb.set_message("Searching the knowledge base...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let result = pipeline
        .process_question_with_cancel(question, item_id, tenant, &cancel)
        .await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if json {
        let body = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        println!("{}", body);
    } else {
        print!("{}", render_result(&result, verbosity.show_timings()));
    }

    Ok(())
}

fn init_config(args: &Args) -> Result<()> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path().context("Could not determine home directory")?,
    };
    if path.exists() {
        anyhow::bail!("Refusing to overwrite existing config at {}", path.display());
    }

    Config::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} {}", "Wrote default configuration to".green(), path.display());

    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    println!("\n{}", "ItemRAG Configuration".bold().cyan());
    if let Some(path) = args.config.clone().or_else(Config::default_path) {
        println!("{}", format!("# {}", path.display()).dimmed());
    }
    println!();

    let body = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", body);

    Ok(())
}
