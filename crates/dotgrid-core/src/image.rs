/// Borrowed 8-bit grayscale image, row-major.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl GrayImageView<'_> {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize, fill: u8) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    pub fn put_pixel(&mut self, x: usize, y: usize, v: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = v;
        }
    }
}

/// Owned packed RGB image, 3 bytes per pixel, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    pub const CHANNELS: usize = 3;

    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * Self::CHANNELS],
        }
    }

    /// Wrap an existing buffer. Returns `None` if the length does not match.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == width * height * Self::CHANNELS).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * Self::CHANNELS;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    pub fn put_pixel(&mut self, x: i64, y: i64, rgb: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = (y as usize * self.width + x as usize) * Self::CHANNELS;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    /// Luma conversion with integer BT.601 weights.
    pub fn to_gray(&self) -> GrayImage {
        let data = self
            .data
            .chunks_exact(Self::CHANNELS)
            .map(|p| ((77 * p[0] as u32 + 150 * p[1] as u32 + 29 * p[2] as u32) >> 8) as u8)
            .collect();
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Axis-aligned cross of half-size `arm` centred at `(x, y)`, clipped.
    pub fn draw_cross(&mut self, x: f64, y: f64, arm: i64, rgb: [u8; 3]) {
        let cx = x.round() as i64;
        let cy = y.round() as i64;
        for d in -arm..=arm {
            self.put_pixel(cx + d, cy, rgb);
            self.put_pixel(cx, cy + d, rgb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_is_clipped_at_border() {
        let mut img = RgbImage::new(5, 5);
        img.draw_cross(0.0, 0.0, 2, [255, 0, 0]);
        assert_eq!(img.pixel(0, 0), Some([255, 0, 0]));
        assert_eq!(img.pixel(2, 0), Some([255, 0, 0]));
        assert_eq!(img.pixel(0, 2), Some([255, 0, 0]));
        assert_eq!(img.pixel(1, 1), Some([0, 0, 0]));
        assert_eq!(img.pixel(5, 0), None);
    }

    #[test]
    fn gray_conversion_of_white_is_near_white() {
        let img = RgbImage::from_raw(1, 1, vec![255, 255, 255]).expect("1x1");
        assert!(img.to_gray().data[0] >= 254);
        assert!(RgbImage::from_raw(2, 2, vec![0; 3]).is_none());
    }
}
