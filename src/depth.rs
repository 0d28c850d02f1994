/// A buffer of per-pixel ray depths, indexed by `(row, col)` from the top-left. Pixels whose ray
/// missed hold NaN.
#[derive(Debug, Clone)]
pub struct DepthImage {
    width: u32,
    height: u32,
    buffer: Vec<f32>,
}

/// An iterator over the rows of a [`DepthImage`], starting at row zero.
pub struct Rows<'a> {
    image: &'a DepthImage,
    row: usize,
}

impl DepthImage {
    /// Construct a new [`DepthImage`] with every pixel marked as a miss.
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            width,
            height,
            buffer: vec![f32::NAN; size],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, row: usize, col: usize) -> usize {
        (self.width as usize) * row + col
    }

    /// Fetch a depth, `None` when the ray for that pixel missed.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        let depth = self.buffer[self.index(row, col)];
        if depth.is_nan() {
            None
        } else {
            Some(depth)
        }
    }

    /// Store the result of tracing the ray for a pixel.
    pub fn set(&mut self, row: usize, col: usize, depth: Option<f32>) {
        let ix = self.index(row, col);
        self.buffer[ix] = depth.unwrap_or(f32::NAN);
    }

    /// The raw buffer in row-major order, with NaN for misses.
    pub fn data(&self) -> &[f32] {
        &self.buffer
    }

    /// Copy a rendered tile into the image, with its top-left corner at `(row, col)`.
    pub fn blit(&mut self, row: u32, col: u32, tile: &DepthImage) {
        let len = tile.width as usize;
        for (y, src) in tile.rows().enumerate() {
            let start = self.index(row as usize + y, col as usize);
            self.buffer[start..start + len].copy_from_slice(src);
        }
    }

    /// Return an iterator to the rows of the image.
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            image: self,
            row: 0,
        }
    }

    /// Returns `true` when no ray hit anything.
    pub fn is_empty(&self) -> bool {
        self.buffer.iter().all(|d| d.is_nan())
    }

    /// The smallest and largest depths, ignoring misses.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.buffer
            .iter()
            .filter(|d| !d.is_nan())
            .fold(None, |acc, &d| match acc {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
    }
}

impl<'a> Iterator for Rows<'a> {
    type Item = &'a [f32];

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.image.height as usize {
            return None;
        }

        let len = self.image.width as usize;
        let start = self.row * len;
        self.row += 1;

        Some(&self.image.buffer[start..start + len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_all_misses() {
        let image = DepthImage::new(3, 2);
        assert_eq!(6, image.data().len());
        assert!(image.is_empty());
        assert_eq!(None, image.min_max());
        assert_eq!(None, image.get(1, 2));
    }

    #[test]
    fn test_set_and_min_max() {
        let mut image = DepthImage::new(3, 2);
        image.set(0, 1, Some(4.0));
        image.set(1, 2, Some(-1.0));
        image.set(1, 0, None);
        assert!(!image.is_empty());
        assert_eq!(Some(4.0), image.get(0, 1));
        assert_eq!(Some(-1.0), image.get(1, 2));
        assert_eq!(Some((-1.0, 4.0)), image.min_max());
    }

    #[test]
    fn test_blit() {
        let mut tile = DepthImage::new(2, 2);
        tile.set(0, 0, Some(1.0));
        tile.set(1, 1, Some(2.0));

        let mut image = DepthImage::new(4, 3);
        image.blit(1, 2, &tile);
        assert_eq!(Some(1.0), image.get(1, 2));
        assert_eq!(Some(2.0), image.get(2, 3));
        assert_eq!(None, image.get(1, 3));
        assert_eq!(None, image.get(0, 0));
    }

    #[test]
    fn test_rows() {
        let mut image = DepthImage::new(2, 3);
        image.set(2, 1, Some(5.0));
        let rows: Vec<_> = image.rows().collect();
        assert_eq!(3, rows.len());
        assert_eq!(5.0, rows[2][1]);
        assert!(rows[0].iter().all(|d| d.is_nan()));
    }
}
