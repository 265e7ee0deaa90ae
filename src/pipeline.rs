//! Pipeline orchestrator: one run from photo to post.
//!
//! The control flow is strictly linear:
//!
//! ```text
//! Source → Composed → Distorted → Captioned → Assembled → Published → CleanedUp
//! ```
//!
//! The only loops are *inside* stages: source acquisition retries fetching
//! and palette derivation retries pairing, both bounded by configuration.
//! Every later stage is forward-only — a failure is reported as an error
//! and the run still cleans up, because the workspace is a guard value
//! whose drop removes the working directory.
//!
//! ## Hand-offs
//!
//! Stages pass images between each other as in-memory values. Files exist
//! only where an external process needs them: the staged distortion input,
//! the distortion output frames, and the assembled artifact, all inside a
//! per-run temporary directory with conventional names. Two concurrent
//! runs therefore never share paths.
//!
//! ## Seams
//!
//! [`run`] wires the real services (HTTP clients, command runner, thread
//! RNG). [`run_with`] is generic over every seam so the whole orchestrator
//! is testable without a network, a GUI stack, or any external tool
//! installed.

use crate::assemble::{self, AssembleError};
use crate::caption::{self, CaptionError, CaptionSource, CommandCaptionSource};
use crate::config::BotConfig;
use crate::distort::{self, DistortError, DistortionParams};
use crate::palette::{self, HttpPairingService, PairingService, PaletteError};
use crate::params::{ParamSource, ThreadRngParams};
use crate::publish::{self, BlueskyClient, MastodonClient, Platform, PlatformOutcome};
use crate::source::{self, PhotoService, SourceError, FlickrService};
use crate::tool::{CommandRunner, ToolRunner};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("source stage failed: {0}")]
    Source(#[from] SourceError),
    #[error("composition stage failed: {0}")]
    Palette(#[from] PaletteError),
    #[error("distortion stage failed: {0}")]
    Distort(#[from] DistortError),
    #[error("caption stage failed: {0}")]
    Caption(#[from] CaptionError),
    #[error("assembly stage failed: {0}")]
    Assemble(#[from] AssembleError),
}

/// States of one run, in order. Logged on every transition; no state is
/// ever re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SourceAcquired,
    Composed,
    Distorted,
    Captioned,
    Assembled,
    Published,
    CleanedUp,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::SourceAcquired => "source acquired",
            Stage::Composed => "composed",
            Stage::Distorted => "distorted",
            Stage::Captioned => "captioned",
            Stage::Assembled => "assembled",
            Stage::Published => "published",
            Stage::CleanedUp => "cleaned up",
        };
        f.write_str(name)
    }
}

/// Per-run working directory with the conventional file names.
///
/// Dropping the workspace deletes the directory and everything in it —
/// that *is* the cleanup stage.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> std::io::Result<Self> {
        Ok(Self {
            dir: TempDir::with_prefix("glitchpost-")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Raw downloaded photo, kept for diagnostics.
    pub fn source_file(&self) -> PathBuf {
        self.dir.path().join("source.jpg")
    }

    /// Staged input handed to the distortion tool.
    pub fn distortion_input(&self) -> PathBuf {
        self.dir.path().join("glitch.png")
    }

    /// Final assembled animation.
    pub fn artifact(&self) -> PathBuf {
        self.dir.path().join("loop.gif")
    }

    /// Persist the directory instead of deleting it.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

/// Knobs a single invocation can override.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Frame count override; `None` uses `distortion.frames` from config.
    pub frames: Option<u32>,
    /// Stop before publishing.
    pub dry_run: bool,
    /// Keep the working directory and report its path.
    pub keep_workdir: bool,
}

/// What one run produced.
pub struct RunReport {
    pub caption: String,
    pub frames: usize,
    pub outcomes: Vec<PlatformOutcome>,
    /// Path of the archived high-resolution still, when exported.
    pub archived: Option<PathBuf>,
    /// Working directory path, when kept.
    pub workdir: Option<PathBuf>,
}

/// Every seam the orchestrator needs, as borrowed trait objects.
pub struct Services<'a, P, C, S, R, Q>
where
    P: PhotoService,
    C: PairingService,
    S: CaptionSource,
    R: ToolRunner,
    Q: ParamSource,
{
    pub photos: &'a P,
    pub pairing: Option<&'a C>,
    pub captions: &'a S,
    pub runner: &'a R,
    pub params: &'a Q,
}

/// The platforms enabled by the config, in a fixed order.
pub fn configured_platforms(config: &BotConfig) -> Vec<Box<dyn Platform>> {
    let mut platforms: Vec<Box<dyn Platform>> = Vec::new();
    if let Some(mastodon) = &config.mastodon {
        platforms.push(Box::new(MastodonClient::new(mastodon)));
    }
    if let Some(bluesky) = &config.bluesky {
        platforms.push(Box::new(BlueskyClient::new(bluesky)));
    }
    platforms
}

/// Execute one full run with production services.
pub fn run(config: &BotConfig, options: &RunOptions) -> Result<RunReport, PipelineError> {
    let photos = FlickrService::new(&config.photos);
    let pairing: Option<HttpPairingService> = config
        .palette
        .endpoint
        .as_deref()
        .map(HttpPairingService::new);
    let captions = CommandCaptionSource::from_command(&config.caption.command)?;
    let runner = CommandRunner::new();
    let params = ThreadRngParams::new();
    let platforms = configured_platforms(config);

    run_with(
        config,
        options,
        &Services {
            photos: &photos,
            pairing: pairing.as_ref(),
            captions: &captions,
            runner: &runner,
            params: &params,
        },
        &platforms,
    )
}

/// Execute one full run against injected services.
pub fn run_with<P, C, S, R, Q>(
    config: &BotConfig,
    options: &RunOptions,
    services: &Services<'_, P, C, S, R, Q>,
    platforms: &[Box<dyn Platform>],
) -> Result<RunReport, PipelineError>
where
    P: PhotoService,
    C: PairingService,
    S: CaptionSource,
    R: ToolRunner,
    Q: ParamSource,
{
    let workspace = Workspace::create()?;
    info!(workdir = %workspace.path().display(), "run started");

    let source = source::acquire(
        services.photos,
        services.params,
        &config.photos,
        &config.retry,
        config.composition.crop_size,
    )?;
    std::fs::write(workspace.source_file(), &source.bytes)?;
    info!(stage = %Stage::SourceAcquired, tags = ?source.tags);

    let composition = palette::derive(
        &source.image,
        services.pairing,
        services.params,
        &config.composition,
        &config.palette,
    )?;
    info!(
        stage = %Stage::Composed,
        tint = %composition.palette.tint,
        caption_color = %composition.palette.caption,
    );

    let staged = workspace.distortion_input();
    composition.image.save(&staged)?;
    let frame_count = options.frames.unwrap_or(config.distortion.frames);
    let distortion = DistortionParams::random(services.params, frame_count);
    let frames = distort::distort(
        services.runner,
        &config.distortion.command,
        &staged,
        workspace.path(),
        &distortion,
    )?;
    info!(stage = %Stage::Distorted, frames = frames.len());

    let text = caption::generate_text(services.captions, config.caption.max_length)?;
    caption::render(
        services.runner,
        &config.assembly.command,
        &frames,
        &text,
        composition.palette.caption,
        &config.caption.fonts_dir,
        services.params,
    )?;
    info!(stage = %Stage::Captioned);

    let artifact = assemble::assemble(
        services.runner,
        &config.assembly.command,
        workspace.path(),
        &workspace.artifact(),
        config.assembly.frame_delay,
    )?;
    info!(stage = %Stage::Assembled);

    let outcomes = if options.dry_run {
        info!("dry run, skipping publish");
        Vec::new()
    } else {
        publish::publish_all(platforms, &artifact, &text)
    };
    info!(
        stage = %Stage::Published,
        attempted = outcomes.len(),
        succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count(),
    );

    // Best-effort: a failed export never spoils a published run.
    let archived = match (&config.assembly.archive_dir, frames.first()) {
        (Some(dir), Some(first)) => match assemble::export_still(first, dir) {
            Ok(path) => Some(path),
            Err(error) => {
                warn!(%error, "high-resolution still export failed");
                None
            }
        },
        _ => None,
    };

    let workdir = if options.keep_workdir {
        let path = workspace.keep();
        info!(workdir = %path.display(), "keeping working directory");
        Some(path)
    } else {
        drop(workspace);
        None
    };
    info!(stage = %Stage::CleanedUp);

    Ok(RunReport {
        caption: text,
        frames: frames.len(),
        outcomes,
        archived,
        workdir,
    })
}
