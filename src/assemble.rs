//! Assembly stage: merge the frame sequence into a looping animation.
//!
//! Frames are collected from the working directory in natural numeric
//! order (see [`crate::naming`]) and passed to the compositor as an
//! explicit file list — no shell glob, so the ordering is ours, not the
//! shell's. The result is an infinitely looping GIF with a fixed
//! per-frame delay.
//!
//! The timestamped high-resolution still export also lives here: the
//! first frame, blown up to 1800×1800, dropped in the archive directory.

use crate::naming;
use crate::tool::{Invocation, ToolError, ToolRunner};
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("no distortion frames found in {0}")]
    NoFrames(PathBuf),
    #[error("assembly tool exited cleanly but did not write {0}")]
    MissingArtifact(PathBuf),
}

/// Side of the square high-resolution still export.
const STILL_SIZE: u32 = 1800;

/// Assemble every frame in `workdir` into a looping GIF at `output`.
pub fn assemble(
    runner: &impl ToolRunner,
    compositor: &str,
    workdir: &Path,
    output: &Path,
    frame_delay: u32,
) -> Result<PathBuf, AssembleError> {
    let frames = naming::frames_in_dir(workdir)?;
    if frames.is_empty() {
        return Err(AssembleError::NoFrames(workdir.to_path_buf()));
    }

    let mut invocation = Invocation::new(compositor).args([
        "-delay".to_string(),
        frame_delay.to_string(),
        "-loop".to_string(),
        "0".to_string(),
    ]);
    for frame in &frames {
        invocation = invocation.arg(frame.to_string_lossy().into_owned());
    }
    invocation = invocation.arg(output.to_string_lossy().into_owned());

    info!(frames = frames.len(), output = %output.display(), "assembling animation");
    runner.run(&invocation)?;

    if !output.exists() {
        return Err(AssembleError::MissingArtifact(output.to_path_buf()));
    }
    Ok(output.to_path_buf())
}

/// Export the first frame as a timestamped 1800×1800 still.
///
/// The archive directory is created if needed. Returns the written path.
pub fn export_still(frame: &Path, archive_dir: &Path) -> Result<PathBuf, AssembleError> {
    std::fs::create_dir_all(archive_dir)?;
    let stamp = chrono::Utc::now().format("%y%m%d%H%M");
    let target = archive_dir.join(format!("{stamp}.png"));

    let image = image::open(frame)?;
    image
        .resize_exact(STILL_SIZE, STILL_SIZE, FilterType::Lanczos3)
        .save(&target)?;

    info!(still = %target.display(), "archived high-resolution still");
    Ok(target)
}
