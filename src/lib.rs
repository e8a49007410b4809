#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot and Julia set renderer.
//!
//! Every pixel of an image gets a smooth escape-time value under
//! iteration of `z ← z^p + c`, then a color through a periodic
//! cubic-interpolated palette.  The iteration kernel is the easy part;
//! the work this crate actually spends its code on is everything wrapped
//! around it:
//!
//! * an **adaptive sampler** that recursively bisects the image and
//!   skips whole regions enclosed by in-set samples, where every skipped
//!   evaluation saves `max_iter` wide-precision iterations;
//! * an **edge-refining antialias engine** that re-evaluates the kernel
//!   at sub-pixel offsets only where neighboring counts jump, and that
//!   doubles as the safety net for the sampler's optimism;
//! * a **numeric tower** of hardware doubles, a double-double type, and
//!   fixed-point at 128 to 1024 bits, all behind one small trait, with the
//!   kernel hopping down to plain doubles the moment the orbit leaves
//!   the region where precision matters.
//!
//! The `mandeljulia` binary wires these to a command line, a palette
//! file loader and a PNG encoder; with the `preview` feature it can show
//! the result in a window instead.

pub mod adaptive;
pub mod antialias;
pub mod error;
pub mod fixed;
pub mod kernel;
pub mod output;
pub mod palette;
#[cfg(feature = "preview")]
pub mod preview;
pub mod render;
pub mod sampler;
pub mod scalar;
pub mod surface;

pub use error::{RenderError, Result};
pub use render::{render, RenderOptions};
