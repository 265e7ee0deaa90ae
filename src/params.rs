//! Randomized run parameters behind a single provider trait.
//!
//! Every randomized decision in a run — tint color, crop offset, distortion
//! angle and intensity, search keyword, result page, font, caption anchor —
//! is drawn through [`ParamSource`]. Centralizing the draws means stages
//! stay deterministic functions of their inputs, and tests can script an
//! exact sequence of "random" values instead of seeding a global generator.
//!
//! The production implementation is [`ThreadRngParams`], which draws from
//! `rand::thread_rng()` on every call.

use crate::color::Rgb;
use rand::Rng;

/// Provider of the randomized parameters a pipeline run consumes.
pub trait ParamSource {
    /// A uniformly random color (six uniform hex digits, decoded).
    fn color(&self) -> Rgb;

    /// A uniform offset in `0..=max`. Used for crop placement.
    fn offset(&self, max: u32) -> u32;

    /// A uniform distortion angle in `0..360` degrees.
    fn angle(&self) -> u16;

    /// A uniform distortion intensity in `-2..=2`.
    fn intensity(&self) -> i8;

    /// A uniform index in `0..len`. Used to pick from word lists, search
    /// results, fonts, and caption anchors.
    ///
    /// `len` must be non-zero; callers check for empty collections first.
    fn index(&self, len: usize) -> usize;
}

/// Production parameter source backed by the thread-local RNG.
pub struct ThreadRngParams;

impl ThreadRngParams {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ThreadRngParams {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSource for ThreadRngParams {
    fn color(&self) -> Rgb {
        let mut rng = rand::thread_rng();
        Rgb::new(
            rng.gen_range(0..=u8::MAX),
            rng.gen_range(0..=u8::MAX),
            rng.gen_range(0..=u8::MAX),
        )
    }

    fn offset(&self, max: u32) -> u32 {
        rand::thread_rng().gen_range(0..=max)
    }

    fn angle(&self) -> u16 {
        rand::thread_rng().gen_range(0..360)
    }

    fn intensity(&self) -> i8 {
        rand::thread_rng().gen_range(-2..=2)
    }

    fn index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}
