/// Summed-area tables over a grayscale buffer.
///
/// Both tables have a zero row and column prepended, so any rectangle sum
/// costs four lookups.
pub struct IntegralImage {
    stride: usize,
    sum: Vec<u64>,
    sqsum: Vec<u64>,
}

impl IntegralImage {
    pub fn new(gray: &[u8], width: u32, height: u32) -> Self {
        let w = width as usize;
        let h = height as usize;
        debug_assert_eq!(gray.len(), w * h, "gray buffer must be width * height");

        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sqsum = vec![0u64; stride * (h + 1)];

        for y in 0..h {
            let mut row_sum = 0u64;
            let mut row_sqsum = 0u64;
            for x in 0..w {
                let v = gray[y * w + x] as u64;
                row_sum += v;
                row_sqsum += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sqsum[idx] = sqsum[idx - stride] + row_sqsum;
            }
        }

        Self { stride, sum, sqsum }
    }

    /// Sum of pixels in `[x, x+w) × [y, y+h)`.
    pub fn rect_sum(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        Self::lookup(&self.sum, self.stride, x, y, w, h)
    }

    /// Sum of squared pixels in `[x, x+w) × [y, y+h)`.
    pub fn rect_sqsum(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        Self::lookup(&self.sqsum, self.stride, x, y, w, h)
    }

    fn lookup(table: &[u64], stride: usize, x: usize, y: usize, w: usize, h: usize) -> u64 {
        let a = table[y * stride + x];
        let b = table[y * stride + x + w];
        let c = table[(y + h) * stride + x];
        let d = table[(y + h) * stride + x + w];
        d + a - b - c
    }
}
