use clap::{Parser, Subcommand};
use glitchpost::pipeline::{self, RunOptions};
use glitchpost::{caption, config, pipeline::configured_platforms};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "glitchpost")]
#[command(version)]
#[command(about = "Generative glitch-art bot")]
#[command(long_about = "\
Generative glitch-art bot

Each run fetches a photograph from the configured search service, tints and
crops it, distorts it into animation frames with an external pixel-sorting
tool, burns a generated caption into every frame, assembles a looping GIF,
and posts it to the configured platforms.

External tools required at runtime:

  - the distortion tool      (distortion.command, default 'prismsort')
  - an ImageMagick 'convert' (assembly.command, captioning and assembly)
  - a sentence generator     (caption.command, default 'fortune -s')

Run 'glitchpost gen-config' to generate a documented config.toml.")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one full pipeline run
    Run {
        /// Override the configured frame count
        #[arg(long)]
        frames: Option<u32>,
        /// Stop before publishing
        #[arg(long)]
        dry_run: bool,
        /// Keep the working directory and print its path
        #[arg(long)]
        keep_workdir: bool,
    },
    /// Validate configuration and local assets without a run
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glitchpost=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            frames,
            dry_run,
            keep_workdir,
        } => {
            let config = config::BotConfig::load(&cli.config)?;
            let options = RunOptions {
                frames,
                dry_run,
                keep_workdir,
            };

            println!("==> Running pipeline");
            let report = pipeline::run(&config, &options)?;

            println!("==> Caption: {}", report.caption);
            println!("==> Frames:  {}", report.frames);
            for outcome in &report.outcomes {
                match &outcome.result {
                    Ok(id) => println!("==> Posted to {}: {}", outcome.platform, id),
                    Err(error) => println!("==> {} failed: {}", outcome.platform, error),
                }
            }
            if dry_run {
                println!("==> Dry run: nothing published");
            }
            if let Some(still) = &report.archived {
                println!("==> Archived still: {}", still.display());
            }
            if let Some(workdir) = &report.workdir {
                println!("==> Working directory kept: {}", workdir.display());
            }
        }
        Command::Check => {
            let config = config::BotConfig::load(&cli.config)?;
            println!("==> Config OK: {}", cli.config.display());

            let fonts = caption::discover_fonts(&config.caption.fonts_dir)?;
            println!(
                "==> Fonts: {} file(s) under {}",
                fonts.len(),
                config.caption.fonts_dir.display()
            );

            if !config.photos.wordlist.exists() {
                return Err(format!(
                    "word list not found: {}",
                    config.photos.wordlist.display()
                )
                .into());
            }
            println!("==> Word list: {}", config.photos.wordlist.display());

            let platforms = configured_platforms(&config);
            if platforms.is_empty() {
                println!("==> Platforms: none configured (runs will only archive)");
            } else {
                let names: Vec<&str> = platforms.iter().map(|p| p.name()).collect();
                println!("==> Platforms: {}", names.join(", "));
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
