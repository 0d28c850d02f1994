use std::path::Path;

use image::{Rgb, RgbImage};
use log::info;
use nalgebra::Vector3;

use crate::{depth::DepthImage, math::Mix, Result};

/// How normalized depths are turned into colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    /// Near surfaces are white, far ones are black.
    Gray,

    /// Blue through cyan, yellow and red as the depth increases.
    #[default]
    Jet,
}

/// Which image row ends up at the top of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    /// Row zero is the top row.
    #[default]
    Upper,

    /// Row zero is the bottom row.
    Lower,
}

#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub colormap: Colormap,
    pub origin: Origin,

    /// Color used for pixels whose ray missed.
    pub background: [u8; 3],
}

/// Stops of the jet colormap, as `(position, color)`.
const JET: [(f32, [f32; 3]); 9] = [
    (0.0, [0.0, 0.0, 0.5]),
    (0.11, [0.0, 0.0, 1.0]),
    (0.125, [0.0, 0.0, 1.0]),
    (0.34, [0.0, 0.86, 1.0]),
    (0.375, [0.08, 1.0, 0.9]),
    (0.64, [0.9, 1.0, 0.08]),
    (0.66, [1.0, 0.93, 0.0]),
    (0.89, [1.0, 0.08, 0.0]),
    (1.0, [0.5, 0.0, 0.0]),
];

impl Colormap {
    /// Map a value in `[0, 1]` to a color with components in `[0, 1]`.
    pub fn color(&self, t: f32) -> Vector3<f32> {
        let t = t.max(0.0).min(1.0);
        match self {
            Colormap::Gray => Vector3::repeat(1.0 - t),
            Colormap::Jet => {
                let upper = JET.iter().position(|(pos, _)| *pos >= t).unwrap_or(JET.len() - 1);
                if upper == 0 {
                    return Vector3::from(JET[0].1);
                }

                let (p0, c0) = JET[upper - 1];
                let (p1, c1) = JET[upper];
                (&Vector3::from(c0)).mix(&Vector3::from(c1), (t - p0) / (p1 - p0))
            }
        }
    }
}

fn to_u8(color: &Vector3<f32>) -> [u8; 3] {
    let convert = |x: f32| (x * 255.0).round().min(255.0).max(0.0) as u8;
    [convert(color.x), convert(color.y), convert(color.z)]
}

/// Rescale the depths so that the nearest hit maps to `0.0` and the farthest to `1.0`. Misses stay
/// `None`. An image whose hits all share one depth maps them to `0.0`.
pub fn normalize(image: &DepthImage) -> Vec<Option<f32>> {
    let (lo, hi) = match image.min_max() {
        Some(range) => range,
        None => return vec![None; image.data().len()],
    };

    let span = hi - lo;
    image
        .data()
        .iter()
        .map(|&d| {
            if d.is_nan() {
                None
            } else if span > 0.0 {
                Some((d - lo) / span)
            } else {
                Some(0.0)
            }
        })
        .collect()
}

/// Convert a depth image into an RGB8 image.
pub fn to_rgb8(image: &DepthImage, options: &EncodeOptions) -> RgbImage {
    let width = image.width();
    let height = image.height();
    let normalized = normalize(image);

    RgbImage::from_fn(width, height, |x, y| {
        let row = match options.origin {
            Origin::Upper => y,
            Origin::Lower => height - 1 - y,
        };
        match normalized[(row * width + x) as usize] {
            Some(t) => Rgb(to_u8(&options.colormap.color(t))),
            None => Rgb(options.background),
        }
    })
}

/// Write the depth image to `path`; the format is chosen from the file extension.
pub fn save<P: AsRef<Path>>(image: &DepthImage, options: &EncodeOptions, path: P) -> Result<()> {
    let path = path.as_ref();
    to_rgb8(image, options).save(path)?;
    info!("wrote {}", path.display());
    Ok(())
}

/// Width over height of a terminal cell.
const CHAR_ASPECT: f32 = 0.5;

/// Return an ascii version of the depth image, `columns` characters wide. Near surfaces use dense
/// characters, misses are blank.
pub fn to_ascii(image: &DepthImage, columns: u32) -> String {
    let palette = r#"$@B%8&WM#*oahkbdpqwmZO0QLCJUYXzcvunxrjft/\|()1{}[]?-_+~<>i!lI;:,"^`'."#;
    let bytes = palette.as_bytes();
    let bound = (bytes.len() - 1) as f32;

    let width = image.width();
    if width == 0 || image.height() == 0 {
        return String::new();
    }

    let columns = columns.max(1).min(width);
    let scale = width as f32 / columns as f32;
    let rows = ((image.height() as f32 / scale) * CHAR_ASPECT).round().max(1.0) as u32;
    let row_scale = image.height() as f32 / rows as f32;

    let normalized = normalize(image);

    let mut buf = String::new();
    for r in 0..rows {
        let y = ((r as f32 + 0.5) * row_scale) as u32;
        for c in 0..columns {
            let x = ((c as f32 + 0.5) * scale) as u32;
            let ix = (y.min(image.height() - 1) * width + x.min(width - 1)) as usize;
            match normalized[ix] {
                Some(t) => buf.push(bytes[(t * bound) as usize] as char),
                None => buf.push(' '),
            }
        }
        buf.push('\n');
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gradient() -> DepthImage {
        let mut image = DepthImage::new(3, 2);
        image.set(0, 0, Some(10.0));
        image.set(0, 1, Some(15.0));
        image.set(0, 2, Some(20.0));
        image
    }

    #[test]
    fn test_normalize() {
        let normalized = normalize(&gradient());
        assert_eq!(
            vec![Some(0.0), Some(0.5), Some(1.0), None, None, None],
            normalized
        );

        let mut flat = DepthImage::new(2, 1);
        flat.set(0, 1, Some(3.0));
        assert_eq!(vec![None, Some(0.0)], normalize(&flat));

        assert_eq!(vec![None; 4], normalize(&DepthImage::new(2, 2)));
    }

    #[test]
    fn test_jet_endpoints() {
        assert_relative_eq!(Vector3::new(0.0, 0.0, 0.5), Colormap::Jet.color(0.0));
        assert_relative_eq!(Vector3::new(0.5, 0.0, 0.0), Colormap::Jet.color(1.0));
        assert_relative_eq!(Vector3::new(0.5, 0.0, 0.0), Colormap::Jet.color(7.0));

        // Halfway between two stops.
        let mid = Colormap::Jet.color(0.1175);
        assert_relative_eq!(Vector3::new(0.0, 0.0, 1.0), mid, epsilon = 1e-5);
    }

    #[test]
    fn test_gray() {
        assert_eq!(Vector3::repeat(1.0), Colormap::Gray.color(0.0));
        assert_eq!(Vector3::repeat(0.0), Colormap::Gray.color(1.0));
    }

    #[test]
    fn test_to_rgb8() {
        let options = EncodeOptions {
            colormap: Colormap::Gray,
            origin: Origin::Upper,
            background: [1, 2, 3],
        };
        let rgb = to_rgb8(&gradient(), &options);
        assert_eq!((3, 2), rgb.dimensions());
        assert_eq!(&Rgb([255, 255, 255]), rgb.get_pixel(0, 0));
        assert_eq!(&Rgb([128, 128, 128]), rgb.get_pixel(1, 0));
        assert_eq!(&Rgb([0, 0, 0]), rgb.get_pixel(2, 0));
        assert_eq!(&Rgb([1, 2, 3]), rgb.get_pixel(0, 1));

        let flipped = to_rgb8(
            &gradient(),
            &EncodeOptions {
                origin: Origin::Lower,
                ..options
            },
        );
        assert_eq!(&Rgb([255, 255, 255]), flipped.get_pixel(0, 1));
        assert_eq!(&Rgb([1, 2, 3]), flipped.get_pixel(0, 0));
    }

    #[test]
    fn test_to_ascii() {
        let mut image = DepthImage::new(3, 4);
        image.set(1, 0, Some(10.0));
        image.set(1, 1, Some(15.0));
        image.set(1, 2, Some(20.0));

        // Four pixel rows squeeze into two lines of text.
        let ascii = to_ascii(&image, 3);
        let lines: Vec<_> = ascii.lines().collect();
        assert_eq!(vec!["$n.", "   "], lines);
    }
}
