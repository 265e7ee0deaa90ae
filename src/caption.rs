//! Caption stage: text generation, sanitization, and per-frame rendering.
//!
//! The sentence itself comes from an external generator (any program that
//! prints a short sentence to stdout). The raw text is normalized to
//! ASCII, capped at the configured length, and run through [`sanitize`]
//! before it goes anywhere near a command line.
//!
//! ## Sanitization is a denylist, not an escape
//!
//! [`sanitize`] strips backticks and backslash-escapes double quotes and
//! exclamation marks. Because every external tool is invoked with an
//! argument array (see [`crate::tool`]), the caption can no longer inject
//! into a shell — the sanitizer survives as a content policy (captions
//! render without stray backticks, and escaped punctuation matches the
//! house style), not as the security boundary it would otherwise have to
//! be.
//!
//! ## Per-frame variety
//!
//! Each frame gets an independently drawn font and anchor placement, so a
//! ten-frame loop flickers the caption around the canvas.

use crate::color::Rgb;
use crate::params::ParamSource;
use crate::tool::{CommandRunner, Invocation, ToolError, ToolRunner};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CaptionError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read frame dimensions: {0}")]
    Image(#[from] image::ImageError),
    #[error("no .ttf/.otf fonts found under {0}")]
    NoFonts(PathBuf),
    #[error("caption generator produced no usable text")]
    EmptyCaption,
    #[error("caption.command is empty")]
    EmptyCommand,
}

/// Sentence generator seam.
pub trait CaptionSource {
    /// Produce one raw sentence. Normalization happens in the caller.
    fn sentence(&self) -> Result<String, CaptionError>;
}

/// Caption source that runs a configured external command and reads its
/// stdout.
pub struct CommandCaptionSource<R> {
    runner: R,
    program: String,
    args: Vec<String>,
}

impl CommandCaptionSource<CommandRunner> {
    /// Build from the configured argv (`["fortune", "-s"]`).
    pub fn from_command(command: &[String]) -> Result<Self, CaptionError> {
        let (program, args) = command.split_first().ok_or(CaptionError::EmptyCommand)?;
        Ok(Self {
            runner: CommandRunner::new(),
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl<R: ToolRunner> CaptionSource for CommandCaptionSource<R> {
    fn sentence(&self) -> Result<String, CaptionError> {
        let output = self
            .runner
            .run(&Invocation::new(&self.program).args(self.args.clone()))?;
        Ok(output.stdout_utf8())
    }
}

/// Obtain, normalize, and sanitize the caption for one run.
pub fn generate_text(
    source: &impl CaptionSource,
    max_length: usize,
) -> Result<String, CaptionError> {
    let raw = source.sentence()?;
    let text = sanitize(&prepare(&raw, max_length));
    if text.is_empty() {
        return Err(CaptionError::EmptyCaption);
    }
    info!(caption = %text, "caption generated");
    Ok(text)
}

/// Normalize raw generator output: ASCII only, single spaces, at most
/// `max_length` characters, cut at a word boundary where possible.
pub fn prepare(raw: &str, max_length: usize) -> String {
    let ascii: String = raw.chars().filter(char::is_ascii).collect();
    let mut out = String::new();
    for word in ascii.split_whitespace() {
        if out.is_empty() {
            // A single over-long word is hard-truncated rather than
            // producing an empty caption.
            let mut first = word.to_string();
            first.truncate(max_length);
            out = first;
            continue;
        }
        if out.len() + 1 + word.len() > max_length {
            break;
        }
        out.push(' ');
        out.push_str(word);
    }
    out
}

/// Minimal denylist sanitizer: drop backticks, backslash-escape double
/// quotes and exclamation marks.
///
/// Idempotent: characters already preceded by a backslash are not escaped
/// again, so one pass is a fixed point.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '`' => {}
            '"' | '!' => {
                if !out.ends_with('\\') {
                    out.push('\\');
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// The nine compass anchor placements the compositor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Gravity {
    pub const ALL: [Gravity; 9] = [
        Gravity::NorthWest,
        Gravity::North,
        Gravity::NorthEast,
        Gravity::West,
        Gravity::Center,
        Gravity::East,
        Gravity::SouthWest,
        Gravity::South,
        Gravity::SouthEast,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Gravity::NorthWest => "NorthWest",
            Gravity::North => "North",
            Gravity::NorthEast => "NorthEast",
            Gravity::West => "West",
            Gravity::Center => "Center",
            Gravity::East => "East",
            Gravity::SouthWest => "SouthWest",
            Gravity::South => "South",
            Gravity::SouthEast => "SouthEast",
        }
    }
}

/// Find the usable font files under a directory, recursively, sorted for
/// deterministic indexing.
pub fn discover_fonts(dir: &Path) -> Result<Vec<PathBuf>, CaptionError> {
    let mut fonts: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("ttf") || e.eq_ignore_ascii_case("otf"))
        })
        .collect();
    if fonts.is_empty() {
        return Err(CaptionError::NoFonts(dir.to_path_buf()));
    }
    fonts.sort();
    Ok(fonts)
}

/// Burn the caption into every frame, each with its own random font and
/// anchor. The caption box is 90% of the frame in both dimensions; the
/// compositor rewrites each frame file in place.
pub fn render(
    runner: &impl ToolRunner,
    compositor: &str,
    frames: &[PathBuf],
    text: &str,
    fill: Rgb,
    fonts_dir: &Path,
    params: &impl ParamSource,
) -> Result<(), CaptionError> {
    let fonts = discover_fonts(fonts_dir)?;

    for frame in frames {
        let (width, height) = image::image_dimensions(frame)?;
        let box_width = width - width / 10;
        let box_height = height - height / 10;
        let font = &fonts[params.index(fonts.len())];
        let gravity = Gravity::ALL[params.index(Gravity::ALL.len())];

        debug!(
            frame = %frame.display(),
            font = %font.display(),
            gravity = gravity.keyword(),
            "rendering caption"
        );

        let frame_arg = frame.to_string_lossy().into_owned();
        let invocation = Invocation::new(compositor).args([
            "-background".to_string(),
            "none".to_string(),
            "-gravity".to_string(),
            gravity.keyword().to_string(),
            "-font".to_string(),
            font.to_string_lossy().into_owned(),
            "-fill".to_string(),
            fill.css(),
            "-size".to_string(),
            format!("{box_width}x{box_height}"),
            format!("caption:{text}"),
            frame_arg.clone(),
            "+swap".to_string(),
            "-gravity".to_string(),
            "Center".to_string(),
            "-composite".to_string(),
            frame_arg,
        ]);
        runner.run(&invocation)?;
    }
    Ok(())
}
