//! Composition stage: tint overlay, random crop, background sampling.
//!
//! These are the in-process raster operations between source acquisition
//! and the external distortion tool. They are pure functions over
//! [`DynamicImage`] values — no files are touched here. The palette module
//! drives them inside its refinement loop, so a single source image may be
//! tinted and cropped several times before a palette sticks.

use crate::color::Rgb;
use crate::params::ParamSource;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("image is {width}x{height}, smaller than the {size}x{size} crop window")]
    TooSmall { width: u32, height: u32, size: u32 },
}

/// Alpha-composite a solid color layer over the whole image.
///
/// `alpha` is the layer's opacity: 0 leaves the image untouched, 255
/// replaces it with the flat color. The conventional tint uses 128.
pub fn tint(image: &DynamicImage, color: Rgb, alpha: u8) -> DynamicImage {
    let mut base = image.to_rgba8();
    let layer = RgbaImage::from_pixel(
        base.width(),
        base.height(),
        Rgba([color.r, color.g, color.b, alpha]),
    );
    imageops::overlay(&mut base, &layer, 0, 0);
    DynamicImage::ImageRgba8(base)
}

/// Crop a uniformly random `size`×`size` window out of the image.
///
/// The offset is drawn so the full window always fits: `0 <= left <=
/// width - size` and likewise for `top`. Undersized input is an error —
/// the source adapter filters those out, but the invariant is enforced
/// here too.
pub fn crop_random_region(
    image: &DynamicImage,
    size: u32,
    params: &impl ParamSource,
) -> Result<DynamicImage, ComposeError> {
    let (width, height) = (image.width(), image.height());
    if width < size || height < size {
        return Err(ComposeError::TooSmall {
            width,
            height,
            size,
        });
    }
    let left = params.offset(width - size);
    let top = params.offset(height - size);
    Ok(image.crop_imm(left, top, size, size))
}

/// Downsample the image to a single pixel: its representative color.
pub fn sample_background(image: &DynamicImage) -> Rgb {
    let pixel = image
        .resize_exact(1, 1, FilterType::Triangle)
        .to_rgba8()
        .get_pixel(0, 0)
        .0;
    Rgb::new(pixel[0], pixel[1], pixel[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ThreadRngParams;
    use crate::params::tests::ScriptedParams;

    /// Image whose red/green channels encode pixel coordinates, so crops
    /// reveal exactly where they came from.
    fn coordinate_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 0])
        }))
    }

    fn flat_image(width: u32, height: u32, color: Rgb) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([color.r, color.g, color.b]),
        ))
    }

    #[test]
    fn tint_at_full_alpha_replaces_pixels() {
        let tinted = tint(&flat_image(4, 4, Rgb::new(10, 20, 30)), Rgb::new(200, 100, 50), 255);
        let pixel = tinted.to_rgba8().get_pixel(0, 0).0;
        assert_eq!(&pixel[..3], &[200, 100, 50]);
    }

    #[test]
    fn tint_at_zero_alpha_is_identity() {
        let tinted = tint(&flat_image(4, 4, Rgb::new(10, 20, 30)), Rgb::new(200, 100, 50), 0);
        let pixel = tinted.to_rgba8().get_pixel(0, 0).0;
        assert_eq!(&pixel[..3], &[10, 20, 30]);
    }

    #[test]
    fn tint_at_half_alpha_blends_toward_color() {
        let tinted = tint(&flat_image(4, 4, Rgb::new(0, 0, 0)), Rgb::new(255, 255, 255), 128);
        let pixel = tinted.to_rgba8().get_pixel(0, 0).0;
        // Roughly midway; exact value depends on the blend rounding.
        assert!(pixel[0] > 120 && pixel[0] < 136, "got {}", pixel[0]);
    }

    #[test]
    fn crop_uses_scripted_offsets() {
        let params = ScriptedParams::new();
        params.push_offset(100);
        params.push_offset(200);

        let cropped = crop_random_region(&coordinate_image(700, 800), 500, &params).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (500, 500));
        let origin = cropped.to_rgba8().get_pixel(0, 0).0;
        assert_eq!(&origin[..2], &[100, 200]);
    }

    #[test]
    fn crop_offsets_always_fit_the_window() {
        // Random offsets over many draws: the window must never poke past
        // the right or bottom edge, i.e. the crop always succeeds and the
        // bottom-right pixel exists.
        let params = ThreadRngParams::new();
        let image = coordinate_image(503, 517);
        for _ in 0..50 {
            let cropped = crop_random_region(&image, 500, &params).unwrap();
            assert_eq!((cropped.width(), cropped.height()), (500, 500));
        }
    }

    #[test]
    fn crop_of_exact_size_image_is_whole_image() {
        let params = ThreadRngParams::new();
        let cropped = crop_random_region(&coordinate_image(500, 500), 500, &params).unwrap();
        let origin = cropped.to_rgba8().get_pixel(0, 0).0;
        assert_eq!(&origin[..2], &[0, 0]);
    }

    #[test]
    fn crop_rejects_undersized_image() {
        let params = ScriptedParams::new();
        let err = crop_random_region(&coordinate_image(499, 600), 500, &params).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::TooSmall {
                width: 499,
                height: 600,
                size: 500
            }
        ));
    }

    #[test]
    fn sample_background_of_flat_image_is_that_color() {
        let background = sample_background(&flat_image(64, 64, Rgb::new(10, 200, 30)));
        assert_eq!(background, Rgb::new(10, 200, 30));
    }

    #[test]
    fn sample_background_averages_mixed_content() {
        // Half black, half white: the representative color lands near the
        // middle of the range rather than at either extreme.
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_fn(64, 64, |x, _| {
            if x < 32 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        }));
        let background = sample_background(&image);
        assert!(background.r > 96 && background.r < 160, "got {}", background.r);
    }
}
