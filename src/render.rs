//! One complete render: adaptive sampling, antialias passes, symmetry.

use log::{debug, info};

use crate::adaptive::adaptive_fill;
use crate::antialias::antialias_pass;
use crate::palette::{Color, Palette};
use crate::sampler::{Mode, PixelSampler};
use crate::scalar::Scalar;
use crate::surface::Surface;

/// Geometry and quality settings for one render call.  `width` and
/// `height` are the rendered size (multisampling already applied).
pub struct RenderOptions {
    /// Rendered image width in pixels.
    pub width: usize,
    /// Rendered image height in pixels.
    pub height: usize,
    /// Iteration limit of the escape-time kernel.
    pub max_iter: i32,
    /// Complex-plane distance between adjacent pixels.
    pub pixel_width: f64,
    /// Antialias edge-detection threshold.
    pub threshold: f64,
    /// Smooth-count span of one palette period.
    pub period: f64,
    /// What the image shows.
    pub mode: Mode,
    /// Worker threads for kernel evaluation batches.
    pub threads: usize,
}

/// Renders one image and returns the finished color surface.
///
/// The scalar surface carries a one-pixel apron on every side so the
/// antialias engine can consult full 8-neighborhoods; for point-symmetric
/// modes only the top half (plus apron) is sampled and the bottom half of
/// the color surface is filled by reflection afterwards.
pub fn render<T: Scalar>(
    opts: &RenderOptions,
    cx: T,
    cy: T,
    palette: &Palette,
) -> Surface<Color> {
    let symmetric = opts.mode.symmetric();
    let scalar_height = if symmetric {
        (opts.height + 1) / 2 + 2
    } else {
        opts.height + 2
    };
    let mut counts = Surface::new(opts.width + 2, scalar_height, 0.0);
    let mut colors = Surface::new(opts.width, opts.height, Color::default());
    let center_x = 0.5 * (opts.width as f64 - 1.0) + 1.0;
    let center_y = 0.5 * (opts.height as f64 - 1.0) + 1.0;
    let sampler = PixelSampler::new(
        opts.mode,
        cx,
        cy,
        center_x,
        center_y,
        opts.pixel_width,
        opts.max_iter,
    );

    info!(
        "sampling a {}x{} scalar surface on {} threads",
        counts.width(),
        counts.height(),
        opts.threads
    );
    adaptive_fill(&mut counts, &sampler, opts.threads);
    debug!("adaptive sampling complete");

    let mut pass = 0;
    loop {
        let modified = antialias_pass(
            &mut colors,
            &mut counts,
            palette,
            &sampler,
            opts.threshold,
            opts.period,
            pass,
            opts.threads,
        );
        if !modified {
            break;
        }
        pass += 1;
    }
    info!("antialiasing settled after {} passes", pass + 1);

    if symmetric {
        reflect(&mut colors);
    }
    colors
}

/// Completes a point-symmetric image: row `y` from the bottom half is the
/// reversed top row `height - 1 - y`.
fn reflect(colors: &mut Surface<Color>) {
    let w = colors.width();
    let h = colors.height();
    let (mut y0, mut y1) = (0, h - 1);
    while y0 < y1 {
        for x in 0..w {
            let c = colors.get(w - 1 - x, y0);
            colors.set(x, y1, c);
        }
        y0 += 1;
        y1 -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(mode: Mode, width: usize, height: usize) -> RenderOptions {
        RenderOptions {
            width,
            height,
            max_iter: 64,
            pixel_width: 4.0 / width as f64,
            threshold: 3.0,
            period: 64.0,
            mode,
            threads: 1,
        }
    }

    #[test]
    fn classic_thumbnail_has_an_in_set_center() {
        let palette = Palette::builtin(0.0);
        let colors = render(&options(Mode::Mandelbrot, 16, 16), 0.0, 0.0, &palette);
        assert_eq!(colors.width(), 16);
        assert_eq!(colors.height(), 16);
        assert_eq!(&colors.get(7, 7).v[..3], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn symmetric_modes_produce_point_symmetric_images() {
        let palette = Palette::builtin(0.0);
        let opts = options(Mode::JuliaAt0, 16, 16);
        let colors = render(&opts, -0.8, 0.156, &palette);
        for y in 0..16 {
            for x in 0..16 {
                let a = colors.get(x, y);
                let b = colors.get(15 - x, 15 - y);
                for k in 0..3 {
                    assert!(
                        (a.v[k] - b.v[k]).abs() < 1e-6,
                        "({}, {}) vs its reflection",
                        x,
                        y
                    );
                }
            }
        }
    }

    #[test]
    fn mandelbrot_julia_keeps_the_center_in_set() {
        // At p = 2 the screen offset u maps to the parameter u², which
        // near the image center lands deep inside the cardioid.
        let palette = Palette::builtin(0.0);
        let colors = render(&options(Mode::MandelbrotJulia, 16, 16), 0.0, 0.0, &palette);
        assert_eq!(&colors.get(7, 7).v[..3], &[0.0, 0.0, 0.0]);
        assert_eq!(&colors.get(8, 8).v[..3], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn every_emitted_channel_is_in_range() {
        let palette = Palette::builtin(0.25);
        let mut opts = options(Mode::Mandelbrot, 24, 16);
        opts.pixel_width = 3.0 / 24.0;
        opts.threads = 2;
        let colors = render(&opts, -0.75, 0.0, &palette);
        for y in 0..16 {
            for x in 0..24 {
                let c = colors.get(x, y);
                for k in 0..3 {
                    assert!(c.v[k] >= -1e-3 && c.v[k] <= 1.0 + 1e-3);
                }
            }
        }
    }
}
