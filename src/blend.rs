use image::{Rgb, RgbImage, imageops};

use crate::{error::BlendboxResult, store::ArtifactStore};

/// Mask weight at full luminance. A pure white mask pixel pulls the output
/// halfway toward the mask color; darker mask pixels pull proportionally less.
pub const MASK_OPACITY: f32 = 0.5;

/// Blend a mask over an image as a luminance-weighted overlay.
///
/// Per pixel, the weight is `luminance(mask) / 255 * MASK_OPACITY` and each
/// channel is `image * (1 - w) + mask * w`. The math runs in f32; results are
/// clamped to [0, 255] and truncated on the cast back to u8, so a 128-gray
/// pixel under a pure white mask lands on 191. A mask whose dimensions differ
/// from the image is bilinearly resampled to the image dimensions first.
///
/// Pure transform: no I/O, never fails, input rasters are untouched.
pub fn blend(image: &RgbImage, mask: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();

    let resized;
    let mask = if mask.dimensions() == (width, height) {
        mask
    } else {
        resized = imageops::resize(mask, width, height, imageops::FilterType::Triangle);
        &resized
    };

    let mut out = RgbImage::new(width, height);
    for (dst, (src, msk)) in out.pixels_mut().zip(image.pixels().zip(mask.pixels())) {
        let weight = luminance(msk) / 255.0 * MASK_OPACITY;
        for c in 0..3 {
            let blended = f32::from(src[c]) * (1.0 - weight) + f32::from(msk[c]) * weight;
            dst[c] = blended.clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Load both rasters of a pair through the store and blend them.
pub fn blend_pair(
    store: &ArtifactStore,
    image_path: &str,
    mask_path: &str,
) -> BlendboxResult<RgbImage> {
    let image = store.read_image(image_path)?;
    let mask = store.read_image(mask_path)?;
    Ok(blend(&image, &mask))
}

/// Rec. 601 luma of one RGB pixel, in [0, 255].
fn luminance(px: &Rgb<u8>) -> f32 {
    0.299 * f32::from(px[0]) + 0.587 * f32::from(px[1]) + 0.114 * f32::from(px[2])
}
