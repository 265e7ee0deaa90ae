//! Bot configuration module.
//!
//! Handles loading and validating `config.toml`: service credentials, the
//! external tool commands, and the knobs for each pipeline stage. The file
//! is loaded once at startup; nothing is persisted back.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional unless noted - defaults shown below
//!
//! [photos]
//! endpoint = "https://api.flickr.com/services/rest"
//! api_key = ""                   # REQUIRED - photo search API key
//! tags = ["cyberpunk", "cyber", "circuit board", "wiring", "electronics", "neon"]
//! wordlist = "words.txt"         # one whitespace-separated word per entry
//! blocklist = ["food"]           # reject candidates whose tags match
//! per_page = 500                 # search results per page (1-500)
//! max_pages = 10                 # random page drawn from 1..=max_pages
//!
//! [palette]
//! # endpoint = "https://..."     # harmonious-pairing service; omit to use
//!                                # the local complement instead
//! max_attempts = 5               # pairing retries before complement fallback
//!
//! [composition]
//! crop_size = 500                # fixed square crop window, pixels
//! tint_alpha = 128               # solid tint layer opacity (0-255)
//!
//! [caption]
//! command = ["fortune", "-s"]    # external sentence generator (argv)
//! max_length = 80                # caption length cap, characters
//! fonts_dir = "fonts"            # directory of .ttf/.otf files
//!
//! [distortion]
//! command = "prismsort"          # pixel-sorting tool
//! frames = 10                    # animation frames per run
//!
//! [assembly]
//! command = "convert"            # ImageMagick-compatible compositor
//! frame_delay = 10               # per-frame delay, centiseconds (10 = 100ms)
//! archive_dir = "hq"             # high-res still export; omit to disable
//!
//! [retry]
//! source_max_attempts = 0        # photo fetch attempts; 0 = unbounded
//!
//! # A platform is published to iff its section is present.
//!
//! [mastodon]
//! base_url = "https://mastodon.example"
//! access_token = ""
//! sensitive = false
//!
//! [bluesky]
//! service = "https://bsky.social"
//! identifier = "bot.example.social"
//! app_password = ""
//! sensitive = false
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Bot configuration loaded from `config.toml`.
///
/// All fields except credentials have working defaults. Unknown keys are
/// rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    /// Photo search and download settings.
    pub photos: PhotosConfig,
    /// Palette pairing service settings.
    pub palette: PaletteConfig,
    /// Tint and crop settings.
    pub composition: CompositionConfig,
    /// Caption generation and rendering settings.
    pub caption: CaptionConfig,
    /// External distortion tool settings.
    pub distortion: DistortionConfig,
    /// Frame assembly and archive settings.
    pub assembly: AssemblyConfig,
    /// Retry policy for the source adapter.
    pub retry: RetryConfig,
    /// Mastodon credentials. Present = publish there.
    pub mastodon: Option<MastodonConfig>,
    /// Bluesky credentials. Present = publish there.
    pub bluesky: Option<BlueskyConfig>,
}

impl BotConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config values are usable for a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.photos.api_key.is_empty() {
            return Err(ConfigError::Validation(
                "photos.api_key must be set".into(),
            ));
        }
        if self.photos.per_page == 0 || self.photos.per_page > 500 {
            return Err(ConfigError::Validation(
                "photos.per_page must be 1-500".into(),
            ));
        }
        if self.photos.max_pages == 0 {
            return Err(ConfigError::Validation(
                "photos.max_pages must be at least 1".into(),
            ));
        }
        if self.composition.crop_size == 0 {
            return Err(ConfigError::Validation(
                "composition.crop_size must be non-zero".into(),
            ));
        }
        if self.palette.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "palette.max_attempts must be at least 1".into(),
            ));
        }
        if self.caption.command.is_empty() {
            return Err(ConfigError::Validation(
                "caption.command must name a program".into(),
            ));
        }
        if self.caption.max_length == 0 {
            return Err(ConfigError::Validation(
                "caption.max_length must be non-zero".into(),
            ));
        }
        if self.distortion.frames == 0 {
            return Err(ConfigError::Validation(
                "distortion.frames must be at least 1".into(),
            ));
        }
        if let Some(mastodon) = &self.mastodon {
            if mastodon.base_url.is_empty() || mastodon.access_token.is_empty() {
                return Err(ConfigError::Validation(
                    "mastodon.base_url and mastodon.access_token must be set".into(),
                ));
            }
        }
        if let Some(bluesky) = &self.bluesky {
            if bluesky.identifier.is_empty() || bluesky.app_password.is_empty() {
                return Err(ConfigError::Validation(
                    "bluesky.identifier and bluesky.app_password must be set".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Photo search and download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhotosConfig {
    /// Search service endpoint (Flickr-style REST API).
    pub endpoint: String,
    /// API key sent with every search request.
    pub api_key: String,
    /// Ambient tags sent with every search.
    pub tags: Vec<String>,
    /// Word-list file; the search keyword is drawn from it per attempt.
    pub wordlist: PathBuf,
    /// Candidates whose tags match any of these terms are rejected.
    pub blocklist: Vec<String>,
    /// Results requested per page.
    pub per_page: u32,
    /// Page number is drawn uniformly from `1..=max_pages`.
    pub max_pages: u32,
}

impl Default for PhotosConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.flickr.com/services/rest".into(),
            api_key: String::new(),
            tags: [
                "cyberpunk",
                "cyber",
                "circuit board",
                "wiring",
                "electronics",
                "neon",
            ]
            .map(String::from)
            .to_vec(),
            wordlist: PathBuf::from("words.txt"),
            blocklist: vec!["food".into()],
            per_page: 500,
            max_pages: 10,
        }
    }
}

/// Palette pairing service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaletteConfig {
    /// Harmonious-pairing service base URL. `None` skips the service and
    /// derives the caption color as a local complement.
    pub endpoint: Option<String>,
    /// Pairing attempts before falling back to the local complement.
    pub max_attempts: u32,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            max_attempts: 5,
        }
    }
}

/// Tint and crop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositionConfig {
    /// Side of the square crop window, pixels.
    pub crop_size: u32,
    /// Opacity of the solid tint layer composited over the source.
    pub tint_alpha: u8,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            crop_size: 500,
            tint_alpha: 128,
        }
    }
}

/// Caption generation and rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionConfig {
    /// External sentence generator, as an argv (program + args).
    pub command: Vec<String>,
    /// Caption length cap, characters.
    pub max_length: usize,
    /// Directory searched (recursively) for `.ttf`/`.otf` font files.
    pub fonts_dir: PathBuf,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            command: vec!["fortune".into(), "-s".into()],
            max_length: 80,
            fonts_dir: PathBuf::from("fonts"),
        }
    }
}

/// External distortion tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistortionConfig {
    /// Pixel-sorting tool program name or path.
    pub command: String,
    /// Animation frames produced per run.
    pub frames: u32,
}

impl Default for DistortionConfig {
    fn default() -> Self {
        Self {
            command: "prismsort".into(),
            frames: 10,
        }
    }
}

/// Frame assembly and archive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssemblyConfig {
    /// ImageMagick-compatible compositor used for captioning and assembly.
    pub command: String,
    /// Per-frame delay in centiseconds (`-delay` units; 10 = 100 ms).
    pub frame_delay: u32,
    /// Directory for the timestamped high-resolution still export.
    /// `None` disables the export.
    pub archive_dir: Option<PathBuf>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            command: "convert".into(),
            frame_delay: 10,
            archive_dir: Some(PathBuf::from("hq")),
        }
    }
}

/// Retry policy for the source adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Photo fetch attempts before giving up. `0` retries forever, which
    /// is safe because a failed fetch has no side effects.
    pub source_max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            source_max_attempts: 0,
        }
    }
}

impl RetryConfig {
    /// True once `attempts` has consumed the configured bound.
    pub fn source_exhausted(&self, attempts: u32) -> bool {
        self.source_max_attempts != 0 && attempts >= self.source_max_attempts
    }
}

/// Mastodon credentials and posting flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MastodonConfig {
    /// Instance base URL, e.g. `https://mastodon.example`.
    pub base_url: String,
    /// OAuth access token with `write:media write:statuses` scope.
    pub access_token: String,
    /// Mark posts as sensitive content.
    pub sensitive: bool,
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            access_token: String::new(),
            sensitive: false,
        }
    }
}

/// Bluesky credentials and posting flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlueskyConfig {
    /// PDS service URL.
    pub service: String,
    /// Account handle or DID.
    pub identifier: String,
    /// App password (not the account password).
    pub app_password: String,
    /// Attach a graphic-media self-label to posts.
    pub sensitive: bool,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            service: "https://bsky.social".into(),
            identifier: String::new(),
            app_password: String::new(),
            sensitive: false,
        }
    }
}

/// The documented stock `config.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> String {
    let doc = r#"# glitchpost configuration
# All options are optional unless noted - the values below are the defaults.

[photos]
endpoint = "https://api.flickr.com/services/rest"
# REQUIRED: photo search API key.
api_key = ""
# Ambient tags sent with every search.
tags = ["cyberpunk", "cyber", "circuit board", "wiring", "electronics", "neon"]
# Word-list file; one whitespace-separated word per entry. The search
# keyword is drawn from it at random on every attempt.
wordlist = "words.txt"
# Candidates whose tags match any of these terms are rejected and refetched.
blocklist = ["food"]
per_page = 500
max_pages = 10

[palette]
# Harmonious-pairing service base URL. Leave commented to derive the
# caption color as the local complement of the tint instead.
# endpoint = "https://pairing.example/api"
# Pairing attempts before falling back to the local complement.
max_attempts = 5

[composition]
# Side of the square crop window, pixels. Smaller sources are refetched.
crop_size = 500
# Opacity of the solid tint layer (0-255).
tint_alpha = 128

[caption]
# External sentence generator, run without a shell. stdout becomes the
# caption (ASCII-filtered, truncated, sanitized).
command = ["fortune", "-s"]
max_length = 80
# Directory searched recursively for .ttf/.otf fonts.
fonts_dir = "fonts"

[distortion]
# Pixel-sorting tool: <command> <input> -a <angle> -i <intensity> -n <frames>
command = "prismsort"
frames = 10

[assembly]
# ImageMagick-compatible compositor used for captioning and GIF assembly.
command = "convert"
# Per-frame delay in centiseconds (10 = 100 ms).
frame_delay = 10
# Timestamped 1800x1800 still export of the first frame. Comment out to
# disable.
archive_dir = "hq"

[retry]
# Photo fetch attempts before giving up; 0 retries forever.
source_max_attempts = 0

# A platform is published to iff its section is present.

# [mastodon]
# base_url = "https://mastodon.example"
# access_token = ""
# sensitive = false

# [bluesky]
# service = "https://bsky.social"
# identifier = "bot.example.social"
# app_password = ""
# sensitive = false
"#;
    doc.to_string()
}
