//! Distortion stage: drive the external pixel-sorting tool.
//!
//! The staged image is handed to the distortion tool as a file; the tool
//! writes its indexed output frames (`glitch_out0.png` ...) into the same
//! working directory. Angle and intensity are drawn fresh per run.
//!
//! Unlike source fetching, this stage is never retried: the tool is
//! deterministic-ish and local, so a non-zero exit means something is
//! actually wrong. The exit status is authoritative and the captured
//! stderr rides along in the error.

use crate::naming;
use crate::params::ParamSource;
use crate::tool::{Invocation, ToolError, ToolRunner};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DistortError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("distortion tool exited cleanly but did not write {0}")]
    MissingFrame(PathBuf),
}

/// Randomized distortion parameters for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistortionParams {
    /// Sort angle, degrees (0-359).
    pub angle: u16,
    /// Interpolation intensity (-2..=2).
    pub intensity: i8,
    /// Number of output frames requested.
    pub frames: u32,
}

impl DistortionParams {
    pub fn random(params: &impl ParamSource, frames: u32) -> Self {
        Self {
            angle: params.angle(),
            intensity: params.intensity(),
            frames,
        }
    }
}

/// Run the distortion tool and return the produced frames in order.
///
/// `input` must already be persisted; the tool runs inside `workdir` so
/// its relative output lands there. Every expected frame is checked for
/// existence — a tool that exits zero without writing its frames is still
/// a failure.
pub fn distort(
    runner: &impl ToolRunner,
    command: &str,
    input: &Path,
    workdir: &Path,
    params: &DistortionParams,
) -> Result<Vec<PathBuf>, DistortError> {
    let invocation = Invocation::new(command)
        .arg(input.to_string_lossy().into_owned())
        .args([
            "-a".to_string(),
            params.angle.to_string(),
            "-i".to_string(),
            params.intensity.to_string(),
            "-n".to_string(),
            params.frames.to_string(),
        ])
        .current_dir(workdir);

    info!(
        angle = params.angle,
        intensity = params.intensity,
        frames = params.frames,
        "running distortion tool"
    );
    runner.run(&invocation)?;

    let mut produced = Vec::with_capacity(params.frames as usize);
    for index in 0..params.frames {
        let frame = workdir.join(naming::frame_name(index));
        if !frame.exists() {
            return Err(DistortError::MissingFrame(frame));
        }
        produced.push(frame);
    }
    Ok(produced)
}
