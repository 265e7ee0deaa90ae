//! Palette derivation: the tint→crop→sample→pair refinement loop.
//!
//! A palette is two colors: the tint composited over the source photo and
//! the fill color the caption is rendered in. Two derivation modes:
//!
//! - **Local complement** (no pairing service configured): draw a random
//!   tint, caption in its photographic negative. One pass, cannot fail.
//! - **Harmonious pairing**: draw a random tint, composite and crop, sample
//!   the representative background of the crop, and ask the pairing
//!   service for a color that goes with it. An empty or failed response
//!   discards the whole composition and starts over with a fresh tint and
//!   a fresh crop — the loop refines the *composition*, not just the
//!   color. Bounded by `max_attempts`; on exhaustion the caption falls
//!   back to the local complement of the last sampled background.
//!
//! Either way the result is a [`Composition`]: the cropped, tinted image
//! and the palette that was derived from it, ready for distortion.

use crate::color::Rgb;
use crate::compose::{self, ComposeError};
use crate::config::{CompositionConfig, PaletteConfig};
use crate::params::ParamSource;
use image::DynamicImage;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

/// The two colors of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Color composited over the source photo.
    pub tint: Rgb,
    /// Caption fill color.
    pub caption: Rgb,
}

/// Output of the composition stage: the staged image plus its palette.
#[derive(Debug)]
pub struct Composition {
    /// Tinted, cropped image — the distortion tool's input.
    pub image: DynamicImage,
    /// Representative color sampled from `image`.
    pub background: Rgb,
    pub palette: Palette,
}

/// One pairing suggestion from the service: two colors that go together.
#[derive(Debug, Clone, Deserialize)]
pub struct PairingSuggestion {
    pub color: String,
    pub pairing: String,
}

/// Harmonious-pairing service seam.
pub trait PairingService {
    /// Suggestions keyed by the background color. An empty list is a
    /// valid response and means "no pairing known".
    fn suggestions(&self, background: Rgb) -> Result<Vec<PairingSuggestion>, PaletteError>;
}

/// HTTP pairing client: `GET {endpoint}/{RRGGBB}` returning a JSON array
/// of suggestions.
pub struct HttpPairingService {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpPairingService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl PairingService for HttpPairingService {
    fn suggestions(&self, background: Rgb) -> Result<Vec<PairingSuggestion>, PaletteError> {
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), background.to_hex());
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.json()?)
    }
}

/// Apply the selection rule to a suggestion list.
///
/// The first suggestion wins. If its `color` is the background itself the
/// partner color is used instead. Unparseable or empty suggestions yield
/// `None`, which the caller treats like an empty response.
fn caption_from_suggestions(background: Rgb, suggestions: &[PairingSuggestion]) -> Option<Rgb> {
    let first = suggestions.first()?;
    let color = Rgb::from_hex(&first.color).ok()?;
    if color == background {
        Rgb::from_hex(&first.pairing).ok()
    } else {
        Some(color)
    }
}

/// Run the composition stage: derive a palette and the staged image.
pub fn derive(
    source: &DynamicImage,
    pairing: Option<&impl PairingService>,
    params: &impl ParamSource,
    composition: &CompositionConfig,
    palette: &PaletteConfig,
) -> Result<Composition, PaletteError> {
    let Some(service) = pairing else {
        // Local mode: caption is the complement of the random tint.
        let tint = params.color();
        let image = stage(source, tint, params, composition)?;
        let background = compose::sample_background(&image);
        info!(%tint, caption = %tint.complement(), "palette derived locally");
        return Ok(Composition {
            image,
            background,
            palette: Palette {
                tint,
                caption: tint.complement(),
            },
        });
    };

    let attempts = palette.max_attempts.max(1);
    let mut attempt = 0;
    let (image, background, tint) = loop {
        attempt += 1;
        let tint = params.color();
        let image = stage(source, tint, params, composition)?;
        let background = compose::sample_background(&image);

        match service.suggestions(background) {
            Ok(suggestions) => {
                if let Some(caption) = caption_from_suggestions(background, &suggestions) {
                    info!(attempt, %background, %caption, "pairing accepted");
                    return Ok(Composition {
                        image,
                        background,
                        palette: Palette { tint, caption },
                    });
                }
                debug!(attempt, %background, "pairing service had no suggestion");
            }
            Err(error) => {
                debug!(attempt, %background, %error, "pairing service failed");
            }
        }
        if attempt >= attempts {
            break (image, background, tint);
        }
    };

    // Attempts exhausted: keep the last composition and caption in the
    // complement of its sampled background.
    info!(%background, caption = %background.complement(), "pairing exhausted, using complement");
    Ok(Composition {
        image,
        background,
        palette: Palette {
            tint,
            caption: background.complement(),
        },
    })
}

/// Tint and crop one candidate composition.
fn stage(
    source: &DynamicImage,
    tint: Rgb,
    params: &impl ParamSource,
    config: &CompositionConfig,
) -> Result<DynamicImage, ComposeError> {
    let tinted = compose::tint(source, tint, config.tint_alpha);
    compose::crop_random_region(&tinted, config.crop_size, params)
}
