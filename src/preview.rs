//! On-screen display of a finished render (`-o preview`).
//!
//! Compiled only with the `preview` cargo feature so the renderer itself
//! stays headless.  The window shows one completed image and stays open
//! until closed.

use num::clamp;
use pixel_canvas::{Canvas, Color as CanvasColor};

use crate::palette::Color;
use crate::surface::Surface;

/// Opens a window displaying `colors` and runs its event loop.
pub fn show(colors: Surface<Color>) {
    let width = colors.width();
    let height = colors.height();
    let canvas = Canvas::new(width, height).title("mandeljulia");
    canvas.render(move |_, image| {
        for (y, row) in image.chunks_mut(width).enumerate() {
            for (x, pixel) in row.iter_mut().enumerate() {
                // The canvas origin is bottom-left; the surface's is
                // top-left.
                let c = colors.get(x, height - 1 - y);
                *pixel = CanvasColor {
                    r: (clamp(c.v[0], 0.0, 1.0) * 255.0).round() as u8,
                    g: (clamp(c.v[1], 0.0, 1.0) * 255.0).round() as u8,
                    b: (clamp(c.v[2], 0.0, 1.0) * 255.0).round() as u8,
                };
            }
        }
    });
}
