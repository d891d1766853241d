use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};

/// Global binarization
///
/// With `use_otsu` the level is chosen by Otsu's method and `fixed` is
/// ignored. Pixels strictly above the level become 255, the rest 0.
pub fn apply(gray: &GrayImage, fixed: u8, use_otsu: bool) -> GrayImage {
    let level = if use_otsu { otsu_level(gray) } else { fixed };
    tracing::debug!(level, use_otsu, "binarizing image");
    threshold(gray, level, ThresholdType::Binary)
}
