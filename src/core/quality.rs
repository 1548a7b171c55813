//! Brightness/contrast gate run before any estimator

use image::GrayImage;

/// Mean and population standard deviation of pixel intensity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl FrameStats {
    pub fn of(gray: &GrayImage) -> Self {
        let n = gray.width() as f64 * gray.height() as f64;
        if n == 0.0 {
            return Self { mean: 0.0, std_dev: 0.0 };
        }
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for p in gray.pixels() {
            let v = p[0] as f64;
            sum += v;
            sum_sq += v * v;
        }
        let mean = sum / n;
        let variance = (sum_sq / n - mean * mean).max(0.0);
        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

/// Rejects blank or dark frames
#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    min_brightness: f64,
    min_contrast: f64,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(crate::MIN_BRIGHTNESS, crate::MIN_CONTRAST)
    }
}

impl QualityGate {
    pub fn new(min_brightness: f64, min_contrast: f64) -> Self {
        Self {
            min_brightness,
            min_contrast,
        }
    }

    /// True when the frame is worth running the estimators on
    pub fn passes(&self, stats: &FrameStats) -> bool {
        !(stats.mean < self.min_brightness || stats.std_dev < self.min_contrast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_black_frame_fails() {
        let stats = FrameStats::of(&GrayImage::new(16, 16));
        assert_eq!(stats.mean, 0.0);
        assert!(!QualityGate::default().passes(&stats));
    }

    #[test]
    fn test_flat_bright_frame_fails_on_contrast() {
        let stats = FrameStats::of(&GrayImage::from_pixel(16, 16, Luma([180])));
        assert_eq!(stats.std_dev, 0.0);
        assert!(!QualityGate::default().passes(&stats));
    }

    #[test]
    fn test_textured_frame_passes() {
        let img = GrayImage::from_fn(16, 16, |x, y| Luma([if (x + y) % 2 == 0 { 60 } else { 160 }]));
        let stats = FrameStats::of(&img);
        assert!((stats.mean - 110.0).abs() < 1e-9);
        assert!((stats.std_dev - 50.0).abs() < 1e-9);
        assert!(QualityGate::default().passes(&stats));
    }
}
