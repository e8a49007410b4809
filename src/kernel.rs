// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time kernel.
//!
//! For a complex parameter `c` and starting point `z`, iterate
//! `z ← z^p + c` and report how quickly the orbit escapes, as a smooth
//! (real-valued) iteration count, or [`INFTY`] if it never does within
//! the limit.
//!
//! The kernel runs in two phases.  Phase one iterates in the caller's
//! scalar type `T` against a bailout radius barely outside the filled
//! set; its only job is to notice that the orbit has left the small
//! neighborhood where high precision matters.  Once that happens the
//! state is re-cast to `f64` and phase two carries the orbit out to a
//! huge radius, where the smooth-count logarithms stabilize.  Past
//! `|z| > 2` the leading term dominates the dynamics, so those extra
//! steps lose nothing to double precision, and the expensive wide
//! arithmetic is never asked to run further than it has to.

use crate::scalar::Scalar;

/// Sentinel smooth count for points that never escape.  Scalar-surface
/// cells holding `INFTY` mean "in the set"; half of it means "tentatively
/// in the set" (see the antialias pass).
pub const INFTY: f64 = 281_474_976_710_656.0;

/// Exponent `p` of the iteration `z ← z^p + c`.
pub const POWER: u32 = 2;

/// Squared radius of the phase-one bailout, just outside the largest
/// orbit the filled set can sustain for the configured power.
pub fn inner_bailout() -> f64 {
    1.001 * 2f64.powf(2.0 / (POWER as f64 - 1.0))
}

/// Computes `z^p` by repeated squaring, returning
/// `(re(z^p), im(z^p), |z|²)`.  The squared norm of the *input* comes out
/// of the innermost squaring for free and is what the bailout tests want.
#[inline]
pub fn complex_pow<T: Scalar>(p: u32, zx: T, zy: T) -> (T, T, T) {
    debug_assert!(p >= 2);
    if p == 2 {
        let xx = zx.sqr();
        let yy = zy.sqr();
        let xy = zx * zy;
        (xx - yy, xy + xy, xx + yy)
    } else if p % 2 == 0 {
        let (tx, ty, fsq) = complex_pow(p / 2, zx, zy);
        let xx = tx.sqr();
        let yy = ty.sqr();
        let xy = tx * ty;
        (xx - yy, xy + xy, fsq)
    } else {
        let (tx, ty, fsq) = complex_pow(p - 1, zx, zy);
        (tx * zx - ty * zy, tx * zy + zx * ty, fsq)
    }
}

/// Smooth escape count of `z ← z^p + c` starting from `(zx, zy)` with
/// parameter `(cx, cy)`, or [`INFTY`] if the orbit survives `max_iter`
/// steps.
pub fn escape_time<T: Scalar>(cx: T, cy: T, zx: T, zy: T, max_iter: i32) -> f64 {
    let bailout = inner_bailout();
    let (mut zx, mut zy) = (zx, zy);
    let mut k = 0;
    while k < max_iter {
        let (sx, sy, fsq) = complex_pow(POWER, zx, zy);
        if fsq.ge(bailout) {
            // Redo the current step in f64; the counter follows suit.
            return refine(
                cx.to_f64(),
                cy.to_f64(),
                zx.to_f64(),
                zy.to_f64(),
                k - 1,
                max_iter,
            );
        }
        zx = sx + cx;
        zy = sy + cy;
        k += 1;
    }
    INFTY
}

/// Phase two: continue the orbit in `f64` until the squared norm clears
/// [`INFTY`], then derive the fractional count from how far past it the
/// orbit landed.
fn refine(cx: f64, cy: f64, mut zx: f64, mut zy: f64, mut k: i32, max_iter: i32) -> f64 {
    while k < max_iter + 1000 {
        let (sx, sy, fsq) = complex_pow(POWER, zx, zy);
        zx = sx + cx;
        zy = sy + cy;
        if fsq >= INFTY {
            return f64::from(k) - fsq.log2().log2() / f64::from(POWER).log2();
        }
        k += 1;
    }
    INFTY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed128;
    use crate::scalar::Extended;

    #[test]
    fn sentinel_is_two_to_the_48() {
        assert_eq!(INFTY, 2f64.powi(48));
    }

    #[test]
    fn origin_never_escapes() {
        assert_eq!(escape_time(0.0, 0.0, 0.0, 0.0, 16), INFTY);
        assert_eq!(escape_time(0.0, 0.0, 0.0, 0.0, 1_000_000), INFTY);
    }

    #[test]
    fn points_outside_the_two_disk_escape() {
        for &(x, y) in &[(2.1, 0.0), (-3.0, 0.5), (0.0, 2.5), (1.8, 1.8)] {
            let v = escape_time(x, y, 0.0, 0.0, 16);
            assert!(v < INFTY, "({}, {}) should escape", x, y);
            assert!(v.is_finite());
            assert!(v > -16.0 && v < 1016.0, "({}, {}) gave {}", x, y, v);
        }
    }

    #[test]
    fn conjugate_parameters_give_identical_counts() {
        for &(x, y) in &[(0.3, 0.5), (-0.75, 0.1), (0.25, 0.6), (-1.2, 0.3)] {
            assert_eq!(
                escape_time(x, y, 0.0, 0.0, 256),
                escape_time(x, -y, 0.0, 0.0, 256)
            );
        }
    }

    #[test]
    fn known_interior_points_are_classified_in_set() {
        // Period-2 cycle at c = -1 and the cardioid center.
        assert_eq!(escape_time(-1.0, 0.0, 0.0, 0.0, 4096), INFTY);
        assert_eq!(escape_time(-0.1, 0.1, 0.0, 0.0, 4096), INFTY);
    }

    #[test]
    fn wide_scalars_agree_with_doubles_on_exact_orbits() {
        // c = 1 escapes through an integer orbit, exact in every type.
        let coarse = escape_time(1.0, 0.0, 0.0, 0.0, 64);
        let wide = escape_time(
            Fixed128::from_i32(1),
            Fixed128::from_i32(0),
            Fixed128::from_i32(0),
            Fixed128::from_i32(0),
            64,
        );
        let dd = escape_time(
            Extended::from_f64(1.0),
            Extended::from_f64(0.0),
            Extended::from_f64(0.0),
            Extended::from_f64(0.0),
            64,
        );
        assert_eq!(coarse, wide);
        assert_eq!(coarse, dd);
        let inset = escape_time(
            Fixed128::from_i32(-1),
            Fixed128::from_i32(0),
            Fixed128::from_i32(0),
            Fixed128::from_i32(0),
            4096,
        );
        assert_eq!(inset, INFTY);
    }

    #[test]
    fn power_chain_matches_naive_powers() {
        let (x, y) = (0.7, -0.4);
        for p in 2..=9u32 {
            let (px, py, fsq) = complex_pow(p, x, y);
            let mut ex = x;
            let mut ey = y;
            for _ in 1..p {
                let t = ex * x - ey * y;
                ey = ex * y + x * ey;
                ex = t;
            }
            assert!((px - ex).abs() < 1e-12, "p = {}", p);
            assert!((py - ey).abs() < 1e-12, "p = {}", p);
            assert_eq!(fsq, x * x + y * y);
        }
    }
}
