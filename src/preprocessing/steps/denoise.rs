use image::{GrayImage, Luma};
use rayon::prelude::*;

/// Weights below this are treated as zero
const WEIGHT_THRESHOLD: f32 = 0.001;

/// Output rows handled by one parallel task
const BAND_ROWS: usize = 64;

/// Largest possible mean squared difference between two u8 patches
const MAX_MEAN_DISTANCE: usize = 255 * 255;

/// Non-local-means denoising
///
/// Every output pixel is a weighted mean of the pixels inside a
/// `search_window` square around it. A candidate's weight depends on how
/// similar the `template_window` patch around it is to the patch around the
/// pixel being filtered: `exp(-mean_squared_patch_difference / h^2)`.
///
/// Patch distances are computed one search offset at a time from an integer
/// integral image of squared differences, so the cost per pixel is proportional
/// to the search area only. Weights come from a table indexed by the integer
/// mean distance. Rows are processed in independent bands on the rayon pool.
/// Borders are reflected without repeating the edge pixel.
///
/// Both window sizes must be odd; this is checked when the config is loaded.
pub fn apply(gray: &GrayImage, h: f32, template_window: u32, search_window: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let w = width as usize;
    let tr = (template_window / 2) as usize;
    let sr = (search_window / 2) as usize;

    let padded = Padded::new(gray, tr + sr);
    let weights = WeightTable::new(h);
    let window = Window {
        template_radius: tr,
        search_radius: sr,
        patch_area: (template_window as u64) * (template_window as u64),
    };

    let mut output = vec![0u8; w * height as usize];
    output
        .par_chunks_mut(w * BAND_ROWS)
        .enumerate()
        .for_each(|(band, rows)| {
            denoise_band(&padded, &weights, &window, band * BAND_ROWS, w, rows);
        });

    GrayImage::from_fn(width, height, |x, y| {
        Luma([output[y as usize * w + x as usize]])
    })
}

struct Window {
    template_radius: usize,
    search_radius: usize,
    patch_area: u64,
}

/// Filter output rows `y0..y0 + out.len() / width` into `out`
fn denoise_band(
    padded: &Padded,
    weights: &WeightTable,
    window: &Window,
    y0: usize,
    width: usize,
    out: &mut [u8],
) {
    let rows = out.len() / width;
    let tr = window.template_radius;
    let border = tr + window.search_radius;

    // Squared differences are only needed where patches around this band reach
    let dw = width + 2 * tr;
    let dh = rows + 2 * tr;
    let stride = dw + 1;
    let mut integral = vec![0u64; stride * (dh + 1)];

    let mut weight_sum = vec![0f32; width * rows];
    let mut value_sum = vec![0f32; width * rows];

    let sr = window.search_radius as isize;
    for dy in -sr..=sr {
        for dx in -sr..=sr {
            for v in 0..dh {
                let py = (y0 + v) as isize + sr;
                let mut row_sum = 0u64;
                for u in 0..dw {
                    let px = u as isize + sr;
                    let d = padded.get(px, py) - padded.get(px + dx, py + dy);
                    row_sum += (d * d) as u64;
                    integral[(v + 1) * stride + u + 1] = integral[v * stride + u + 1] + row_sum;
                }
            }

            for y in 0..rows {
                let y2 = y + 2 * tr + 1;
                for x in 0..width {
                    let x2 = x + 2 * tr + 1;
                    let ssd = integral[y2 * stride + x2] + integral[y * stride + x]
                        - integral[y * stride + x2]
                        - integral[y2 * stride + x];

                    let weight = weights.get((ssd / window.patch_area) as usize);
                    if weight == 0.0 {
                        continue;
                    }

                    let neighbour = padded.get(
                        (x + border) as isize + dx,
                        (y0 + y + border) as isize + dy,
                    );
                    let idx = y * width + x;
                    weight_sum[idx] += weight;
                    value_sum[idx] += weight * neighbour as f32;
                }
            }
        }
    }

    for (idx, pixel) in out.iter_mut().enumerate() {
        // The zero offset always contributes weight 1
        let value = value_sum[idx] / weight_sum[idx];
        *pixel = value.round().clamp(0.0, 255.0) as u8;
    }
}

/// `exp(-distance / h^2)` for every integer mean distance, cut off where it
/// drops below the weight threshold
struct WeightTable {
    weights: Vec<f32>,
}

impl WeightTable {
    fn new(h: f32) -> Self {
        let inv_h2 = 1.0 / (h * h);
        let weights = (0..=MAX_MEAN_DISTANCE)
            .map(|d| (-(d as f32) * inv_h2).exp())
            .take_while(|&w| w >= WEIGHT_THRESHOLD)
            .collect();
        Self { weights }
    }

    #[inline]
    fn get(&self, distance: usize) -> f32 {
        self.weights.get(distance).copied().unwrap_or(0.0)
    }
}

/// Image widened by `border` pixels on every side
struct Padded {
    data: Vec<i32>,
    width: usize,
}

impl Padded {
    fn new(gray: &GrayImage, border: usize) -> Self {
        let (w, h) = (gray.width() as isize, gray.height() as isize);
        let b = border as isize;
        let width = (w + 2 * b) as usize;
        let height = (h + 2 * b) as usize;

        let mut data = Vec::with_capacity(width * height);
        for y in -b..h + b {
            let sy = reflect_101(y, h) as u32;
            for x in -b..w + b {
                let sx = reflect_101(x, w) as u32;
                data.push(gray.get_pixel(sx, sy).0[0] as i32);
            }
        }

        Self { data, width }
    }

    #[inline]
    fn get(&self, x: isize, y: isize) -> i32 {
        self.data[y as usize * self.width + x as usize]
    }
}

/// Map `i` into `0..n` by mirroring about the edge pixels (`gfedcb|abcdefgh|gfedcba`)
fn reflect_101(i: isize, n: isize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * n - 2;
    let m = i.rem_euclid(period);
    (if m < n { m } else { period - m }) as usize
}
