//! Command-line front end for the renderer.

use std::fmt;
use std::process;
use std::str::FromStr;

use clap::{App, Arg, ArgMatches};
use log::info;
use num::Complex;

use mandeljulia::error::{RenderError, Result};
use mandeljulia::fixed::{Fixed1024, Fixed128, Fixed256, Fixed384, Fixed512, Fixed768};
use mandeljulia::output;
use mandeljulia::palette::{Color, Palette};
use mandeljulia::render::{render, RenderOptions};
use mandeljulia::sampler::Mode;
use mandeljulia::scalar::{Extended, Scalar};
use mandeljulia::surface::Surface;

const OUTPUT: &str = "output";
const WIDTH: &str = "width";
const HEIGHT: &str = "height";
const ITERATIONS: &str = "iterations";
const VIEW: &str = "view";
const CENTER_X: &str = "center-x";
const CENTER_Y: &str = "center-y";
const PERIOD: &str = "period";
const THRESHOLD: &str = "threshold";
const RADIUS: &str = "radius";
const ANGLE: &str = "angle";
const PRECISION: &str = "precision";
const DEPTH: &str = "png-depth";
const MULTISAMPLE: &str = "multisample";
const PALETTE: &str = "palette";
const PHASE: &str = "phase";
const MODE: &str = "mode";

fn validate_range<T>(s: &str, low: T, high: T, what: &str) -> std::result::Result<(), String>
where
    T: FromStr + PartialOrd + fmt::Display,
{
    match s.trim().parse::<T>() {
        Ok(v) if v >= low && v <= high => Ok(()),
        Ok(_) => Err(format!("{} must be between {} and {}", what, low, high)),
        Err(_) => Err(format!("could not parse {}", what)),
    }
}

fn validate_choice(s: &str, list: &[i64], what: &str) -> std::result::Result<(), String> {
    match s.trim().parse::<i64>() {
        Ok(v) if list.contains(&v) => Ok(()),
        _ => Err(format!("{} must be one of {:?}", what, list)),
    }
}

fn build_app<'a, 'b>() -> App<'a, 'b> {
    App::new("mandeljulia")
        .version("0.3.0")
        .about("Mandelbrot and Julia set renderer")
        .help_short("H")
        .arg(
            Arg::with_name(OUTPUT)
                .short("o")
                .takes_value(true)
                .required(true)
                .value_name("FILE")
                .help("Output file, or the literal `preview`"),
        )
        .arg(
            Arg::with_name(WIDTH)
                .short("w")
                .takes_value(true)
                .default_value("640")
                .validator(|s| validate_range::<i64>(&s, 16, 8192, "width"))
                .help("Image width in pixels"),
        )
        .arg(
            Arg::with_name(HEIGHT)
                .short("h")
                .takes_value(true)
                .default_value("480")
                .validator(|s| validate_range::<i64>(&s, 16, 8192, "height"))
                .help("Image height in pixels"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("1024")
                .validator(|s| validate_range::<i64>(&s, 16, 16 * 1024 * 1024, "iterations"))
                .help("Iteration limit"),
        )
        .arg(
            Arg::with_name(VIEW)
                .short("v")
                .takes_value(true)
                .default_value("4.0")
                .validator(|s| validate_range::<f64>(&s, 1.0e-100, 10000.0, "view width"))
                .help("Width of the view in the complex plane"),
        )
        .arg(
            Arg::with_name(CENTER_X)
                .short("x")
                .takes_value(true)
                .default_value("0")
                .allow_hyphen_values(true)
                .help("Center x coordinate (decimal string, any precision)"),
        )
        .arg(
            Arg::with_name(CENTER_Y)
                .short("y")
                .takes_value(true)
                .default_value("0")
                .allow_hyphen_values(true)
                .help("Center y coordinate (decimal string, any precision)"),
        )
        .arg(
            Arg::with_name(PERIOD)
                .short("p")
                .takes_value(true)
                .default_value("64")
                .validator(|s| validate_range::<f64>(&s, 1.0, 65536.0, "color period"))
                .help("Smooth-count span of one palette period"),
        )
        .arg(
            Arg::with_name(THRESHOLD)
                .short("t")
                .takes_value(true)
                .default_value("3.0")
                .validator(|s| validate_range::<f64>(&s, 0.0, 1.0e100, "threshold"))
                .help("Antialias edge-detection threshold"),
        )
        .arg(
            Arg::with_name(RADIUS)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .validator(|s| validate_range::<f64>(&s, -10000.0, 10000.0, "radius"))
                .help("Julia offset radius (implies julia-at-0)"),
        )
        .arg(
            Arg::with_name(ANGLE)
                .short("a")
                .takes_value(true)
                .allow_hyphen_values(true)
                .validator(|s| validate_range::<f64>(&s, -10000.0, 10000.0, "angle"))
                .help("Julia offset angle in radians (implies julia-at-0)"),
        )
        .arg(
            Arg::with_name(PRECISION)
                .short("q")
                .takes_value(true)
                .default_value("64")
                .validator(|s| {
                    validate_choice(&s, &[64, 80, 128, 256, 384, 512, 768, 1024], "precision")
                })
                .help("Computation precision in bits"),
        )
        .arg(
            Arg::with_name(DEPTH)
                .short("b")
                .takes_value(true)
                .default_value("8")
                .validator(|s| validate_choice(&s, &[8, 16], "png depth"))
                .help("PNG sample depth"),
        )
        .arg(
            Arg::with_name(MULTISAMPLE)
                .short("m")
                .takes_value(true)
                .default_value("1")
                .validator(|s| validate_range::<i64>(&s, 1, 3, "multisample"))
                .help("Multisample factor"),
        )
        .arg(
            Arg::with_name(PALETTE)
                .short("c")
                .takes_value(true)
                .value_name("FILE")
                .help("Palette file"),
        )
        .arg(
            Arg::with_name(PHASE)
                .short("C")
                .takes_value(true)
                .default_value("0")
                .validator(|s| validate_range::<f64>(&s, 0.0, 1.0, "phase offset"))
                .help("Palette phase offset"),
        )
        .arg(
            Arg::with_name(MODE)
                .short("j")
                .takes_value(true)
                .possible_values(&["julia-at-c", "julia-at-0", "mandelbrot-julia"])
                .help("Render mode (default: mandelbrot)"),
        )
}

fn value<T: FromStr>(matches: &ArgMatches<'_>, name: &str) -> Result<T> {
    matches
        .value_of(name)
        .unwrap_or_default()
        .trim()
        .parse()
        .map_err(|_| RenderError::InvalidArgument(format!("invalid {} value", name)))
}

fn opt_value<T: FromStr>(matches: &ArgMatches<'_>, name: &str) -> Result<Option<T>> {
    match matches.value_of(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RenderError::InvalidArgument(format!("invalid {} value", name))),
        None => Ok(None),
    }
}

struct Job<'a> {
    options: RenderOptions,
    cx_str: &'a str,
    cy_str: &'a str,
    julia_offset: Complex<f64>,
    palette: &'a Palette,
    filename: &'a str,
    png_bits: u32,
    multisample: usize,
    preview: bool,
}

fn execute<T: Scalar>(job: &Job<'_>) -> Result<()> {
    let cx = T::from_decimal(job.cx_str)? + T::from_f64(job.julia_offset.re);
    let cy = T::from_decimal(job.cy_str)? + T::from_f64(job.julia_offset.im);
    info!("mode = {:?}", job.options.mode);
    info!("x    = {}", cx);
    info!("y    = {}", cy);
    info!("w    = {}", job.options.width);
    info!("h    = {}", job.options.height);
    info!(
        "v    = {:.13e}",
        job.options.pixel_width * job.options.width as f64
    );
    info!("t    = {:.6}", job.options.threshold);
    info!("p    = {:.6}", job.options.period);
    info!("i    = {}", job.options.max_iter);

    let colors = render(&job.options, cx, cy, job.palette);
    if job.preview {
        return show_preview(colors);
    }
    output::write_png(&colors, job.filename, job.png_bits, job.multisample)
}

#[cfg(feature = "preview")]
fn show_preview(colors: Surface<Color>) -> Result<()> {
    mandeljulia::preview::show(colors);
    Ok(())
}

#[cfg(not(feature = "preview"))]
fn show_preview(_colors: Surface<Color>) -> Result<()> {
    Err(RenderError::InvalidArgument(
        "preview support is not compiled in (build with the `preview` feature)".into(),
    ))
}

fn run() -> Result<()> {
    let matches = build_app().get_matches();

    let width: usize = value(&matches, WIDTH)?;
    let height: usize = value(&matches, HEIGHT)?;
    let max_iter: i32 = value(&matches, ITERATIONS)?;
    let width_view: f64 = value(&matches, VIEW)?;
    let period: f64 = value(&matches, PERIOD)?;
    let threshold: f64 = value(&matches, THRESHOLD)?;
    let bits: u32 = value(&matches, PRECISION)?;
    let png_bits: u32 = value(&matches, DEPTH)?;
    let multisample: usize = value(&matches, MULTISAMPLE)?;
    let color_offset: f64 = value(&matches, PHASE)?;
    let radius = opt_value::<f64>(&matches, RADIUS)?.unwrap_or(0.0);
    let angle = opt_value::<f64>(&matches, ANGLE)?.unwrap_or(0.0);
    let cx_str = matches.value_of(CENTER_X).unwrap_or("0");
    let cy_str = matches.value_of(CENTER_Y).unwrap_or("0");
    let filename = match matches.value_of(OUTPUT) {
        Some(name) => name,
        None => {
            return Err(RenderError::InvalidArgument(
                "no output file specified".into(),
            ))
        }
    };

    let mode = match matches.value_of(MODE) {
        Some("julia-at-c") => Mode::JuliaAtC,
        Some("julia-at-0") => Mode::JuliaAt0,
        Some("mandelbrot-julia") => Mode::MandelbrotJulia,
        Some(other) => {
            return Err(RenderError::InvalidArgument(format!(
                "unknown mode `{}`",
                other
            )))
        }
        None => {
            if matches.is_present(RADIUS) || matches.is_present(ANGLE) {
                Mode::JuliaAt0
            } else {
                Mode::Mandelbrot
            }
        }
    };

    let preview = filename == "preview";
    if preview && cfg!(not(feature = "preview")) {
        return Err(RenderError::InvalidArgument(
            "preview support is not compiled in (build with the `preview` feature)".into(),
        ));
    }
    let multisample = if preview { 1 } else { multisample };
    let render_width = width * multisample;
    let render_height = height * multisample;

    let palette = match matches.value_of(PALETTE) {
        Some(path) => Palette::from_file(path, color_offset)?,
        None => Palette::builtin(color_offset),
    };

    let job = Job {
        options: RenderOptions {
            width: render_width,
            height: render_height,
            max_iter,
            pixel_width: width_view / render_width as f64,
            threshold,
            period,
            mode,
            threads: num_cpus::get(),
        },
        cx_str,
        cy_str,
        julia_offset: Complex::from_polar(radius, angle),
        palette: &palette,
        filename,
        png_bits,
        multisample,
        preview,
    };

    match bits {
        64 => execute::<f64>(&job),
        80 => execute::<Extended>(&job),
        128 => execute::<Fixed128>(&job),
        256 => execute::<Fixed256>(&job),
        384 => execute::<Fixed384>(&job),
        512 => execute::<Fixed512>(&job),
        768 => execute::<Fixed768>(&job),
        1024 => execute::<Fixed1024>(&job),
        other => Err(RenderError::InvalidArgument(format!(
            "unsupported precision {}",
            other
        ))),
    }
}

fn print_usage() {
    eprintln!("Mandelbrot and Julia set renderer");
    eprintln!("Usage:");
    eprintln!("  mandeljulia [OPTIONS...]");
    eprintln!("OPTIONS:");
    eprintln!("  -o output.png/preview");
    eprintln!("  -w width");
    eprintln!("  -h height");
    eprintln!("  -i iterations");
    eprintln!("  -v view width");
    eprintln!("  -x center x");
    eprintln!("  -y center y");
    eprintln!("  -p color period");
    eprintln!("  -t antialias threshold");
    eprintln!("  -m multisample factor (1-3)");
    eprintln!("  -r radius of julia offset (implies julia-at-0)");
    eprintln!("  -a angle of julia offset (implies julia-at-0)");
    eprintln!("  -q computation bits (64, 80, 128, 256, 384, 512, 768, 1024)");
    eprintln!("  -b png bits (8, 16)");
    eprintln!("  -c palette file");
    eprintln!("  -C palette phase offset (0-1)");
    eprintln!("  -j julia mode (julia-at-c, julia-at-0, mandelbrot-julia)");
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        print_usage();
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_full_flag_set() {
        let m = build_app().get_matches_from_safe(vec![
            "mandeljulia",
            "-o",
            "out.png",
            "-w",
            "32",
            "-h",
            "32",
            "-i",
            "256",
            "-v",
            "0.01",
            "-x",
            "-0.743643887",
            "-y",
            "0.131825904",
            "-p",
            "64",
            "-t",
            "3",
            "-q",
            "128",
            "-b",
            "16",
            "-m",
            "2",
            "-C",
            "0.5",
            "-j",
            "mandelbrot-julia",
        ]);
        assert!(m.is_ok(), "{:?}", m.err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        for bad in [
            vec!["mandeljulia", "-o", "x.png", "-w", "9000"],
            vec!["mandeljulia", "-o", "x.png", "-w", "8"],
            vec!["mandeljulia", "-o", "x.png", "-q", "100"],
            vec!["mandeljulia", "-o", "x.png", "-b", "12"],
            vec!["mandeljulia", "-o", "x.png", "-m", "4"],
            vec!["mandeljulia", "-o", "x.png", "-j", "nonsense"],
            vec!["mandeljulia", "-o", "x.png", "-C", "1.5"],
        ] {
            assert!(build_app().get_matches_from_safe(bad.clone()).is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn requires_an_output_file() {
        assert!(build_app().get_matches_from_safe(vec!["mandeljulia"]).is_err());
    }

    #[test]
    fn rejects_a_flag_without_its_value() {
        assert!(build_app()
            .get_matches_from_safe(vec!["mandeljulia", "-o", "x.png", "-w"])
            .is_err());
    }

    #[test]
    fn radius_and_angle_imply_julia_at_0() {
        let m = build_app()
            .get_matches_from_safe(vec!["mandeljulia", "-o", "x.png", "-r", "0.8"])
            .unwrap();
        assert!(m.is_present(RADIUS));
        assert!(!m.is_present(ANGLE));
        assert!(m.value_of(MODE).is_none());
    }
}
