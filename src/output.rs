//! PNG output: multisample reduction, quantization, encoding.

use std::fs::File;
use std::io::BufWriter;

use itertools::iproduct;
use log::info;
use num::clamp;

use crate::error::Result;
use crate::palette::Color;
use crate::surface::Surface;

/// Writes `colors` to `path` as an RGB PNG with the given bit depth
/// (8 or 16) and gAMA 0.45455.  When `multisample > 1` the surface is
/// `m` times larger than the output in each direction and every written
/// pixel is the unweighted mean of its `m x m` block.
pub fn write_png(
    colors: &Surface<Color>,
    path: &str,
    bit_depth: u32,
    multisample: usize,
) -> Result<()> {
    let out_w = colors.width() / multisample;
    let out_h = colors.height() / multisample;
    info!("writing {}x{} {}-bit png to {}", out_w, out_h, bit_depth, path);

    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), out_w as u32, out_h as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(if bit_depth == 16 {
        png::BitDepth::Sixteen
    } else {
        png::BitDepth::Eight
    });
    encoder.set_source_gamma(png::ScaledFloat::new(0.45455));
    let mut writer = encoder.write_header()?;

    let data = if bit_depth == 16 {
        let mut data = Vec::with_capacity(out_w * out_h * 6);
        for (y, x) in iproduct!(0..out_h, 0..out_w) {
            for ch in block_mean(colors, x, y, multisample) {
                let q = (clamp(ch, 0.0, 1.0) * 65535.0).round() as u16;
                data.extend_from_slice(&q.to_be_bytes());
            }
        }
        data
    } else {
        let mut data = Vec::with_capacity(out_w * out_h * 3);
        for (y, x) in iproduct!(0..out_h, 0..out_w) {
            for ch in block_mean(colors, x, y, multisample) {
                data.push((clamp(ch, 0.0, 1.0) * 255.0).round() as u8);
            }
        }
        data
    };

    writer.write_image_data(&data)?;
    writer.finish()?;
    Ok(())
}

/// Mean color channels of the `m x m` block whose top-left corner is at
/// `(x * m, y * m)`.
fn block_mean(colors: &Surface<Color>, x: usize, y: usize, m: usize) -> [f32; 3] {
    let mut acc = [0.0f32; 3];
    for (dy, dx) in iproduct!(0..m, 0..m) {
        let c = colors.get(x * m + dx, y * m + dy);
        for k in 0..3 {
            acc[k] += c.v[k];
        }
    }
    let scale = (m * m) as f32;
    for ch in acc.iter_mut() {
        *ch /= scale;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(r: f32, g: f32, b: f32) -> Color {
        Color {
            v: [r, g, b, 1.0],
        }
    }

    #[test]
    fn block_mean_averages_multisample_blocks() {
        let mut s = Surface::new(4, 2, solid(0.0, 0.0, 0.0));
        s.set(0, 0, solid(1.0, 0.0, 0.0));
        s.set(1, 0, solid(0.0, 1.0, 0.0));
        s.set(0, 1, solid(0.0, 0.0, 1.0));
        // Block (0,0) of a 2x multisample: mean of the three set pixels
        // and one black one.
        let mean = block_mean(&s, 0, 0, 2);
        assert_eq!(mean, [0.25, 0.25, 0.25]);
        // Identity when multisampling is off.
        assert_eq!(block_mean(&s, 1, 0, 1), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn writes_a_decodable_png() {
        let mut s = Surface::new(2, 2, solid(0.0, 0.5, 1.0));
        s.set(0, 0, solid(1.0, 0.0, 0.0));
        let path = std::env::temp_dir().join("mandeljulia-output-test.png");
        let path = path.to_string_lossy().into_owned();
        write_png(&s, &path, 8, 1).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let frame = reader.next_frame(&mut buf).unwrap();
        assert_eq!(frame.width, 2);
        assert_eq!(frame.height, 2);
        assert_eq!(&buf[..3], &[255, 0, 0]);
        assert_eq!(&buf[3..6], &[0, 128, 255]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn sixteen_bit_output_is_big_endian_and_clamped() {
        let mut s = Surface::new(1, 1, solid(1.5, -0.25, 0.5));
        s.set(0, 0, solid(1.5, -0.25, 0.5));
        let path = std::env::temp_dir().join("mandeljulia-output-test16.png");
        let path = path.to_string_lossy().into_owned();
        write_png(&s, &path, 16, 1).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().bit_depth, png::BitDepth::Sixteen);
        let mut buf = vec![0u8; reader.output_buffer_size()];
        reader.next_frame(&mut buf).unwrap();
        // Out-of-range inputs clamp before quantization.
        assert_eq!(&buf[..4], &[0xff, 0xff, 0x00, 0x00]);
        std::fs::remove_file(&path).ok();
    }
}
