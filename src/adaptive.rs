// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Adaptive filling of the scalar surface.
//!
//! Evaluating the kernel costs up to `max_iter` wide-precision steps per
//! cell, and most cells deep inside the set cost exactly that.  This
//! module avoids the bulk of them: it evaluates the surface border, then
//! recursively bisects the interior.  Whenever every cell on the edge of
//! a subrectangle is classified in-set, the whole interior is filled
//! with [`INFTY`] without running the kernel: orbits enclosed by in-set
//! orbits are overwhelmingly in-set themselves.  The rare misfire (a
//! thin filament crossing a subrectangle without touching its edge) is
//! either caught and reclassified by the antialias engine's sub-pixel
//! probes, or lost; that residual risk is accepted.
//!
//! Kernel evaluations for the border and for each split line are batched
//! and may be farmed out to scoped worker threads over disjoint chunks.
//! The caller writes all values back, so the filled surface is identical
//! to what the sequential order produces.

use crate::kernel::INFTY;
use crate::sampler::PixelSampler;
use crate::scalar::Scalar;
use crate::surface::Surface;

/// Batches smaller than this are evaluated on the calling thread.
const PARALLEL_GRAIN: usize = 64;

/// Fills `surface` with smooth iteration counts for every cell.
pub fn adaptive_fill<T: Scalar>(
    surface: &mut Surface<f64>,
    sampler: &PixelSampler<T>,
    threads: usize,
) {
    let w = surface.width();
    let h = surface.height();
    let mut border = Vec::with_capacity(2 * (w + h));
    for x in 0..w {
        border.push((x, 0));
        border.push((x, h - 1));
    }
    for y in 1..h - 1 {
        border.push((0, y));
        border.push((w - 1, y));
    }
    store(surface, sampler, &border, threads);
    refine(surface, sampler, threads, 0, w - 1, 0, h - 1);
}

/// Recursive midpoint refinement over the inclusive cell rectangle
/// `[left..right] × [top..bottom]`, whose border is already computed.
fn refine<T: Scalar>(
    surface: &mut Surface<f64>,
    sampler: &PixelSampler<T>,
    threads: usize,
    left: usize,
    right: usize,
    top: usize,
    bottom: usize,
) {
    let width = right - left + 1;
    let height = bottom - top + 1;
    if width <= 2 || height <= 2 {
        return;
    }

    if enclosed_by_set(surface, left, right, top, bottom) {
        for y in top + 1..bottom {
            for x in left + 1..right {
                surface.set(x, y, INFTY);
            }
        }
        return;
    }

    if width > height {
        let mid = (left + right) / 2;
        let cells: Vec<(usize, usize)> = (top + 1..bottom).map(|y| (mid, y)).collect();
        store(surface, sampler, &cells, threads);
        refine(surface, sampler, threads, left, mid, top, bottom);
        refine(surface, sampler, threads, mid, right, top, bottom);
    } else {
        let mid = (top + bottom) / 2;
        let cells: Vec<(usize, usize)> = (left + 1..right).map(|x| (x, mid)).collect();
        store(surface, sampler, &cells, threads);
        refine(surface, sampler, threads, left, right, top, mid);
        refine(surface, sampler, threads, left, right, mid, bottom);
    }
}

/// True when every border cell of the rectangle holds [`INFTY`].
fn enclosed_by_set(
    surface: &Surface<f64>,
    left: usize,
    right: usize,
    top: usize,
    bottom: usize,
) -> bool {
    for x in left..=right {
        if surface.get(x, top) < INFTY || surface.get(x, bottom) < INFTY {
            return false;
        }
    }
    for y in top + 1..bottom {
        if surface.get(left, y) < INFTY || surface.get(right, y) < INFTY {
            return false;
        }
    }
    true
}

/// Evaluates the kernel at `cells` and writes the values back.
fn store<T: Scalar>(
    surface: &mut Surface<f64>,
    sampler: &PixelSampler<T>,
    cells: &[(usize, usize)],
    threads: usize,
) {
    let values = eval_cells(sampler, cells, threads);
    for (&(x, y), v) in cells.iter().zip(values) {
        surface.set(x, y, v);
    }
}

fn eval_cells<T: Scalar>(
    sampler: &PixelSampler<T>,
    cells: &[(usize, usize)],
    threads: usize,
) -> Vec<f64> {
    let mut values = vec![0.0; cells.len()];
    if threads <= 1 || cells.len() < PARALLEL_GRAIN {
        for (v, &(x, y)) in values.iter_mut().zip(cells) {
            *v = sampler.sample(x as f64, y as f64);
        }
        return values;
    }
    let chunk = (cells.len() + threads - 1) / threads;
    crossbeam::thread::scope(|s| {
        for (pos, out) in cells.chunks(chunk).zip(values.chunks_mut(chunk)) {
            s.spawn(move |_| {
                for (v, &(x, y)) in out.iter_mut().zip(pos) {
                    *v = sampler.sample(x as f64, y as f64);
                }
            });
        }
    })
    .unwrap();
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::Mode;

    fn brute_force(surface: &mut Surface<f64>, sampler: &PixelSampler<f64>) {
        for y in 0..surface.height() {
            for x in 0..surface.width() {
                surface.set(x, y, sampler.sample(x as f64, y as f64));
            }
        }
    }

    #[test]
    fn matches_brute_force_where_the_shortcut_is_idle() {
        // A window far outside the set: no cell is in-set, so the
        // shortcut never fires and the adaptive fill must reproduce the
        // exhaustive evaluation exactly.
        let sampler = PixelSampler::new(Mode::Mandelbrot, 10.0, 0.0, 7.0, 7.0, 0.01, 64);
        let mut adaptive = Surface::new(14, 14, 0.0);
        let mut exhaustive = Surface::new(14, 14, 0.0);
        adaptive_fill(&mut adaptive, &sampler, 1);
        brute_force(&mut exhaustive, &sampler);
        for y in 0..14 {
            for x in 0..14 {
                assert_eq!(adaptive.get(x, y), exhaustive.get(x, y), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn parallel_fill_matches_sequential_fill() {
        let sampler = PixelSampler::new(Mode::Mandelbrot, 0.0, 0.0, 16.5, 16.5, 0.125, 128);
        let mut seq = Surface::new(34, 34, 0.0);
        let mut par = Surface::new(34, 34, 0.0);
        adaptive_fill(&mut seq, &sampler, 1);
        adaptive_fill(&mut par, &sampler, 4);
        for y in 0..34 {
            for x in 0..34 {
                assert_eq!(seq.get(x, y), par.get(x, y), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn enclosed_interior_is_filled_without_evaluation() {
        // A window wholly inside the main cardioid: every border cell is
        // in-set, so the interior must come out all-INFTY.
        let sampler = PixelSampler::new(Mode::Mandelbrot, -0.2, 0.0, 8.5, 8.5, 0.0125, 256);
        let mut surface = Surface::new(18, 18, 0.0);
        adaptive_fill(&mut surface, &sampler, 1);
        for y in 0..18 {
            for x in 0..18 {
                assert_eq!(surface.get(x, y), INFTY, "({}, {})", x, y);
            }
        }
    }
}
