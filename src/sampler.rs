//! Render modes and the pixel sampler.
//!
//! The sampler owns the relationship between the integral pixel grid and
//! the complex plane, decides which `(c, z₀)` pair a given render mode
//! feeds to the kernel, and picks the precision the kernel runs at.

use crate::kernel::{complex_pow, escape_time, inner_bailout, POWER};
use crate::scalar::Scalar;

/// What the image shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The Mandelbrot set: the screen spans parameters, orbits start at
    /// the critical point.
    Mandelbrot,
    /// The Julia set of the fixed parameter `c`; the screen spans
    /// starting points.
    JuliaAtC,
    /// Same mapping as [`Mode::JuliaAtC`], reached through the polar
    /// `-r`/`-a` offset flags.
    JuliaAt0,
    /// The Mandelbrot set seen through Julia coordinates: the screen
    /// offset `u` maps to the parameter `c + u^p`.
    MandelbrotJulia,
}

impl Mode {
    /// Whether the rendered image is its own 180° rotation, in which
    /// case only the top half needs computing.  Holds for the modes
    /// whose kernel input is an even power of the screen offset.
    pub fn symmetric(self) -> bool {
        matches!(self, Mode::JuliaAt0 | Mode::MandelbrotJulia) && POWER % 2 == 0
    }
}

/// Maps scalar-surface pixel positions to smooth iteration counts.
///
/// Positions may be fractional; the antialias engine probes between
/// pixel centers.  The sampler applies the mode's `(c, z₀)` table and
/// then chooses the kernel's precision: once either value already sits
/// outside the phase-one bailout radius, the wide phase-one loop has
/// nothing to contribute (the kernel would fall through to its `f64`
/// phase immediately), so the kernel is invoked on plain doubles.
pub struct PixelSampler<T> {
    mode: Mode,
    cx: T,
    cy: T,
    center_x: f64,
    center_y: f64,
    pixel_width: f64,
    max_iter: i32,
}

impl<T: Scalar> PixelSampler<T> {
    /// Builds a sampler for one render call.  `center_x`/`center_y` are
    /// the scalar-surface coordinates of the image center and
    /// `pixel_width` the complex-plane distance between adjacent pixels.
    pub fn new(
        mode: Mode,
        cx: T,
        cy: T,
        center_x: f64,
        center_y: f64,
        pixel_width: f64,
        max_iter: i32,
    ) -> Self {
        PixelSampler {
            mode,
            cx,
            cy,
            center_x,
            center_y,
            pixel_width,
            max_iter,
        }
    }

    /// Smooth iteration count at the (possibly fractional) surface
    /// position `(x, y)`.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let zx = (x - self.center_x) * self.pixel_width;
        let zy = (self.center_y - y) * self.pixel_width;
        let (cx, cy, zx, zy) = match self.mode {
            Mode::Mandelbrot => (
                self.cx + T::from_f64(zx),
                self.cy + T::from_f64(zy),
                T::from_i32(0),
                T::from_i32(0),
            ),
            Mode::JuliaAtC | Mode::JuliaAt0 => {
                (self.cx, self.cy, T::from_f64(zx), T::from_f64(zy))
            }
            Mode::MandelbrotJulia => {
                let (wx, wy, _) = complex_pow(POWER, T::from_f64(zx), T::from_f64(zy));
                (
                    self.cx + wx,
                    self.cy + wy,
                    T::from_i32(0),
                    T::from_i32(0),
                )
            }
        };
        let bailout = inner_bailout();
        let (cfx, cfy) = (cx.to_f64(), cy.to_f64());
        let (zfx, zfy) = (zx.to_f64(), zy.to_f64());
        if zfx * zfx + zfy * zfy >= bailout || cfx * cfx + cfy * cfy >= bailout {
            escape_time(cfx, cfy, zfx, zfy, self.max_iter)
        } else {
            escape_time(cx, cy, zx, zy, self.max_iter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed128;

    fn sampler(mode: Mode, cx: f64, cy: f64) -> PixelSampler<f64> {
        // 16x16 image, 4.0 view width, surface coordinates.
        PixelSampler::new(mode, cx, cy, 8.5, 8.5, 0.25, 256)
    }

    #[test]
    fn mandelbrot_adds_the_screen_offset_to_c() {
        let s = sampler(Mode::Mandelbrot, 0.0, 0.0);
        let direct = escape_time(-0.125, 0.125, 0.0, 0.0, 256);
        assert_eq!(s.sample(8.0, 8.0), direct);
    }

    #[test]
    fn julia_spans_starting_points() {
        let s = sampler(Mode::JuliaAtC, -0.8, 0.156);
        let direct = escape_time(-0.8, 0.156, 0.25, -0.25, 256);
        assert_eq!(s.sample(9.5, 9.5), direct);
    }

    #[test]
    fn julia_is_point_symmetric_for_even_powers() {
        let s = sampler(Mode::JuliaAt0, -0.8, 0.156);
        for &(dx, dy) in &[(1.0, 2.0), (3.5, -1.5), (0.5, 0.5), (-2.0, 4.0)] {
            assert_eq!(s.sample(8.5 + dx, 8.5 + dy), s.sample(8.5 - dx, 8.5 - dy));
        }
        assert!(Mode::JuliaAt0.symmetric());
        assert!(Mode::MandelbrotJulia.symmetric());
        assert!(!Mode::Mandelbrot.symmetric());
        assert!(!Mode::JuliaAtC.symmetric());
    }

    #[test]
    fn mandelbrot_julia_squares_the_screen_offset() {
        let s = sampler(Mode::MandelbrotJulia, 0.0, 0.0);
        // Offset u = (0.5, 0.25): the sampled point is c = u^2.
        let (ux, uy) = (0.5, 0.25);
        let expected = escape_time(ux * ux - uy * uy, 2.0 * ux * uy, 0.0, 0.0, 256);
        assert_eq!(s.sample(8.5 + ux / 0.25, 8.5 - uy / 0.25), expected);
    }

    #[test]
    fn far_samples_fall_back_to_doubles_consistently() {
        let wide = PixelSampler::new(
            Mode::Mandelbrot,
            Fixed128::from_i32(0),
            Fixed128::from_i32(0),
            8.5,
            8.5,
            0.25,
            64,
        );
        let coarse = sampler(Mode::Mandelbrot, 0.0, 0.0);
        // (0, 0) maps to c = (-2.125, 2.125), outside the bailout radius,
        // so both samplers run the plain f64 kernel.
        assert_eq!(wide.sample(0.0, 0.0), coarse.sample(0.0, 0.0));
    }
}
