//! Edge-directed antialiasing.
//!
//! The first pass colors every pixel straight from the sampled scalar
//! surface.  Each subsequent pass hunts for pixels whose scalar value
//! jumps against a neighbor's by more than the threshold, re-evaluates
//! the kernel at eight sub-pixel offsets around each such pixel, and
//! replaces the pixel with the nine-sample average.  A pixel that was
//! classified in-set but whose sub-pixel probes escape is downgraded in
//! the scalar surface (its cell drops to `INFTY/2`), which re-arms edge
//! detection around it; this is also what rescues regions the adaptive
//! shortcut filled too optimistically.  Passes repeat until one finishes
//! without a downgrade.  Downgrades are strictly one-way, so the pass
//! count is bounded by the cell count.
//!
//! The fourth color channel is the finalization flag: pixels carrying a
//! positive status are skipped by later passes.

use itertools::iproduct;
use log::debug;

use crate::kernel::INFTY;
use crate::palette::{Color, Palette};
use crate::sampler::PixelSampler;
use crate::scalar::Scalar;
use crate::surface::Surface;

const NEIGHBOR_X: [isize; 8] = [-1, 0, 1, -1, 1, -1, 0, 1];
const NEIGHBOR_Y: [isize; 8] = [-1, -1, -1, 0, 0, 1, 1, 1];

/// Diagonal neighbors get a looser threshold than cardinal ones.
const EDGE_WEIGHT: [f64; 8] = [1.3, 1.0, 1.3, 1.0, 1.0, 1.3, 1.0, 1.3];

/// Sub-pixel probe spacing, in pixels.
const SUBPIXEL_STEP: f64 = 1.0 / 3.0;

/// Batches smaller than this are refined on the calling thread.
const PARALLEL_GRAIN: usize = 16;

/// Runs one antialias pass; returns whether any scalar-surface cell was
/// downgraded (in which case another pass is needed).
///
/// `input` is the scalar surface with its one-pixel apron; `output` is
/// the color surface, two cells smaller in each direction.
#[allow(clippy::too_many_arguments)]
pub fn antialias_pass<T: Scalar>(
    output: &mut Surface<Color>,
    input: &mut Surface<f64>,
    palette: &Palette,
    sampler: &PixelSampler<T>,
    threshold: f64,
    period: f64,
    pass: usize,
    threads: usize,
) -> bool {
    let iw = input.width();
    let ih = input.height();

    if pass == 0 {
        // In-set apron cells drop to INFTY/2 up front: they sit against
        // the unexplored outside, so the shortcut may not trust them,
        // and edge detection against them must stay armed.
        for x in 0..iw {
            halve_if_inset(input, x, 0);
            halve_if_inset(input, x, ih - 1);
        }
        for y in 1..ih - 1 {
            halve_if_inset(input, 0, y);
            halve_if_inset(input, iw - 1, y);
        }
        for (y, x) in iproduct!(1..ih - 1, 1..iw - 1) {
            let v = input.get(x, y);
            let color = if v == INFTY {
                palette.infinity_color(0.0)
            } else {
                palette.color(v / period, 0.0)
            };
            output.set(x - 1, y - 1, color);
        }
    }

    let mut candidates: Vec<(usize, usize, Color)> = Vec::new();
    for (y, x) in iproduct!(1..ih - 1, 1..iw - 1) {
        // Only a full status of 1 counts as finalized; fractional values
        // are still pending.
        if output.get(x - 1, y - 1).status() >= 1.0 {
            continue;
        }
        let v = input.get(x, y);
        let mut edge = false;
        for k in 0..8 {
            let nx = (x as isize + NEIGHBOR_X[k]) as usize;
            let ny = (y as isize + NEIGHBOR_Y[k]) as usize;
            if (v - input.get(nx, ny)).abs() >= threshold * EDGE_WEIGHT[k] {
                edge = true;
                break;
            }
        }
        if !edge {
            // Smooth neighborhood: finalize, unless the pixel is in-set
            // and might still be downgraded by a neighbor's refinement.
            if v < INFTY {
                let mut c = output.get(x - 1, y - 1);
                c.set_status(1.0);
                output.set(x - 1, y - 1, c);
            }
            continue;
        }
        candidates.push((x, y, output.get(x - 1, y - 1)));
    }

    let refined = refine_cells(sampler, palette, period, &candidates, threads);

    let mut modified = false;
    for (&(x, y, _), &(color, all_inset)) in candidates.iter().zip(refined.iter()) {
        output.set(x - 1, y - 1, color);
        if input.get(x, y) == INFTY && !all_inset {
            input.set(x, y, 0.5 * INFTY);
            modified = true;
        }
    }
    debug!(
        "antialias pass {}: {} edge pixels, {}",
        pass,
        candidates.len(),
        if modified { "reclassified in-set cells" } else { "stable" }
    );
    modified
}

fn halve_if_inset(input: &mut Surface<f64>, x: usize, y: usize) {
    let v = input.get(x, y);
    if v == INFTY {
        input.set(x, y, 0.5 * v);
    }
}

/// Probes the eight sub-pixel offsets around `(x, y)` and averages them
/// with the pixel's current color.  Also reports whether every probe
/// stayed in-set.
fn refine_pixel<T: Scalar>(
    sampler: &PixelSampler<T>,
    palette: &Palette,
    period: f64,
    x: usize,
    y: usize,
    current: Color,
) -> (Color, bool) {
    let mut samples = [Color::default(); 9];
    let mut all_inset = true;
    for k in 0..8 {
        let sx = x as f64 + NEIGHBOR_X[k] as f64 * SUBPIXEL_STEP;
        let sy = y as f64 + NEIGHBOR_Y[k] as f64 * SUBPIXEL_STEP;
        let v = sampler.sample(sx, sy);
        samples[k] = if v == INFTY {
            palette.infinity_color(1.0)
        } else {
            all_inset = false;
            palette.color(v / period, 1.0)
        };
    }
    samples[8] = current;
    (Color::average(&samples, 1.0), all_inset)
}

fn refine_cells<T: Scalar>(
    sampler: &PixelSampler<T>,
    palette: &Palette,
    period: f64,
    candidates: &[(usize, usize, Color)],
    threads: usize,
) -> Vec<(Color, bool)> {
    let mut results = vec![(Color::default(), false); candidates.len()];
    if threads <= 1 || candidates.len() < PARALLEL_GRAIN {
        for (r, &(x, y, c)) in results.iter_mut().zip(candidates) {
            *r = refine_pixel(sampler, palette, period, x, y, c);
        }
        return results;
    }
    let chunk = (candidates.len() + threads - 1) / threads;
    crossbeam::thread::scope(|s| {
        for (cand, out) in candidates.chunks(chunk).zip(results.chunks_mut(chunk)) {
            s.spawn(move |_| {
                for (r, &(x, y, c)) in out.iter_mut().zip(cand) {
                    *r = refine_pixel(sampler, palette, period, x, y, c);
                }
            });
        }
    })
    .unwrap();
    results
}
