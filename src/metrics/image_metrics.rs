use image::{ImageBuffer, Pixel};
use rayon::prelude::*;

use crate::error::*;

/// Side of the square SSIM window
pub const SSIM_WINDOW: usize = 7;
const K1: f64 = 0.01;
const K2: f64 = 0.03;

type Buffer<P> = ImageBuffer<P, Vec<u8>>;

fn shape<P: Pixel<Subpixel = u8>>(image: &Buffer<P>) -> (u32, u32, u8) {
    (image.width(), image.height(), P::CHANNEL_COUNT)
}

fn check_shapes<P: Pixel<Subpixel = u8>>(a: &Buffer<P>, b: &Buffer<P>) -> Result<(), MetricsError> {
    if shape(a) != shape(b) {
        return Err(MetricsError::ShapeMismatch(shape(a), shape(b)));
    }
    Ok(())
}

/// Mean squared error over every channel value, computed in floating point
pub fn mse<P: Pixel<Subpixel = u8>>(a: &Buffer<P>, b: &Buffer<P>) -> Result<f64, MetricsError> {
    check_shapes(a, b)?;
    let raw_a = a.as_raw();
    let raw_b = b.as_raw();
    if raw_a.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = raw_a
        .iter()
        .zip(raw_b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    Ok(sum / raw_a.len() as f64)
}

pub fn rmse<P: Pixel<Subpixel = u8>>(a: &Buffer<P>, b: &Buffer<P>) -> Result<f64, MetricsError> {
    Ok(mse(a, b)?.sqrt())
}

/// Structural similarity with a 7x7 uniform window and sample covariances.
/// The mean is taken over windows lying fully inside the image; colour images
/// average the per-channel values.
pub fn ssim<P: Pixel<Subpixel = u8>>(a: &Buffer<P>, b: &Buffer<P>, data_range: f64) -> Result<f64, MetricsError> {
    check_shapes(a, b)?;
    let (width, height) = (a.width() as usize, a.height() as usize);
    if width < SSIM_WINDOW || height < SSIM_WINDOW {
        return Err(MetricsError::ImageTooSmall(a.width(), a.height(), SSIM_WINDOW));
    }

    let channels = P::CHANNEL_COUNT as usize;
    let total: f64 = (0..channels)
        .map(|c| {
            let x: Vec<f64> = a.as_raw().iter().skip(c).step_by(channels).map(|&v| v as f64).collect();
            let y: Vec<f64> = b.as_raw().iter().skip(c).step_by(channels).map(|&v| v as f64).collect();
            ssim_channel(&x, &y, width, height, data_range)
        })
        .sum();
    Ok(total / channels as f64)
}

/// Summed-area table with one row and column of zero padding
struct Integral {
    stride: usize,
    sums: Vec<f64>,
}

impl Integral {
    fn new(values: impl Fn(usize) -> f64, width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += values(y * width + x);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { stride, sums }
    }

    /// Sum over the window with top-left corner (x, y)
    fn window(&self, x: usize, y: usize, size: usize) -> f64 {
        let s = self.stride;
        self.sums[(y + size) * s + x + size] - self.sums[y * s + x + size] - self.sums[(y + size) * s + x]
            + self.sums[y * s + x]
    }
}

fn ssim_channel(x: &[f64], y: &[f64], width: usize, height: usize, data_range: f64) -> f64 {
    let ix = Integral::new(|i| x[i], width, height);
    let iy = Integral::new(|i| y[i], width, height);
    let ixx = Integral::new(|i| x[i] * x[i], width, height);
    let iyy = Integral::new(|i| y[i] * y[i], width, height);
    let ixy = Integral::new(|i| x[i] * y[i], width, height);

    let np = (SSIM_WINDOW * SSIM_WINDOW) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (K1 * data_range).powi(2);
    let c2 = (K2 * data_range).powi(2);

    let rows = height - SSIM_WINDOW + 1;
    let cols = width - SSIM_WINDOW + 1;

    let total: f64 = (0..rows)
        .into_par_iter()
        .map(|wy| {
            let mut row_sum = 0.0;
            for wx in 0..cols {
                let ux = ix.window(wx, wy, SSIM_WINDOW) / np;
                let uy = iy.window(wx, wy, SSIM_WINDOW) / np;
                let uxx = ixx.window(wx, wy, SSIM_WINDOW) / np;
                let uyy = iyy.window(wx, wy, SSIM_WINDOW) / np;
                let uxy = ixy.window(wx, wy, SSIM_WINDOW) / np;

                let vx = cov_norm * (uxx - ux * ux);
                let vy = cov_norm * (uyy - uy * uy);
                let vxy = cov_norm * (uxy - ux * uy);

                let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
                let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
                row_sum += numerator / denominator;
            }
            row_sum
        })
        .sum();

    total / (rows * cols) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]))
    }

    #[test]
    fn test_mse_has_no_wraparound() {
        let a = GrayImage::from_pixel(4, 4, Luma([10]));
        let b = GrayImage::from_pixel(4, 4, Luma([20]));
        // 10 - 20 would wrap to 246 in u8 arithmetic
        assert_relative_eq!(mse(&a, &b).unwrap(), 100.0);
        assert_relative_eq!(rmse(&a, &b).unwrap(), 10.0);
        assert_relative_eq!(mse(&b, &a).unwrap(), 100.0);
    }

    #[test]
    fn test_identical_images() {
        let a = gradient(32, 24);
        assert_eq!(mse(&a, &a).unwrap(), 0.0);
        assert_relative_eq!(ssim(&a, &a, 255.0).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ssim_drops_with_noise() {
        let a = gradient(32, 32);
        let b = GrayImage::from_fn(32, 32, |x, y| {
            let v = a.get_pixel(x, y)[0];
            Luma([if (x + y) % 2 == 0 { v.saturating_add(60) } else { v.saturating_sub(60) }])
        });
        let value = ssim(&a, &b, 255.0).unwrap();
        assert!(value < 0.9);
        assert!(value <= 1.0 && value > -1.0);
    }

    #[test]
    fn test_ssim_constant_images() {
        // constant images differ only in luminance
        let a = GrayImage::from_pixel(8, 8, Luma([100]));
        let b = GrayImage::from_pixel(8, 8, Luma([100]));
        assert_relative_eq!(ssim(&a, &b, 255.0).unwrap(), 1.0, epsilon = 1e-12);
        let c = GrayImage::from_pixel(8, 8, Luma([0]));
        let expected = (0.01f64 * 255.0).powi(2) / (100.0f64.powi(2) + (0.01f64 * 255.0).powi(2));
        assert_relative_eq!(ssim(&a, &c, 255.0).unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_rgb_averages_channels() {
        let a = RgbImage::from_fn(10, 10, |x, y| Rgb([(x * 20) as u8, (y * 20) as u8, 50]));
        assert_relative_eq!(ssim(&a, &a, 255.0).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_and_size_errors() {
        let a = GrayImage::new(8, 8);
        let b = GrayImage::new(8, 9);
        assert!(matches!(mse(&a, &b), Err(MetricsError::ShapeMismatch(_, _))));
        let tiny = GrayImage::new(6, 6);
        assert!(matches!(ssim(&tiny, &tiny, 255.0), Err(MetricsError::ImageTooSmall(6, 6, 7))));
    }
}
