use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};
use tracing::{debug, info, warn};

use crate::config::EvaluationConfig;
use crate::error::*;

use super::classification::ConfusionMatrix;
use super::image_metrics::{mse, rmse, ssim};

/// Averages over every usable `*_target.png` / `*_fake.png` pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub ssim: f64,
    pub pairs: usize,
}

/// Scores of one ground-truth / prediction pair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f2: f64,
    pub mcc: f64,
    pub jaccard: f64,
    pub mse: f64,
    pub iou: f64,
    pub ssim: f64,
}

impl PairMetrics {
    pub const HEADER: &'static str = "image,precision,recall,f2,mcc,jaccard,mse,iou,ssim";

    fn values(&self) -> [f64; 8] {
        [self.precision, self.recall, self.f2, self.mcc, self.jaccard, self.mse, self.iou, self.ssim]
    }
}

/// Per-image rows of an evaluated folder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSummary {
    pub rows: Vec<(String, PairMetrics)>,
}

impl MetricSummary {
    pub fn mean(&self) -> PairMetrics {
        if self.rows.is_empty() {
            return PairMetrics::default();
        }
        let n = self.rows.len() as f64;
        let mut sum = [0.0; 8];
        for (_, m) in &self.rows {
            for (s, v) in sum.iter_mut().zip(m.values()) {
                *s += v;
            }
        }
        let [precision, recall, f2, mcc, jaccard, mse, iou, ssim] = sum.map(|s| s / n);
        PairMetrics { precision, recall, f2, mcc, jaccard, mse, iou, ssim }
    }

    /// CSV with one row per image followed by a `mean` row
    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "{}", PairMetrics::HEADER)?;
        let mean = self.mean();
        for (name, m) in self.rows.iter().map(|(n, m)| (n.as_str(), m)).chain([("mean", &mean)]) {
            let cells: Vec<String> = m.values().iter().map(|v| format!("{:.6}", v)).collect();
            writeln!(out, "{},{}", name, cells.join(","))?;
        }
        Ok(())
    }
}

/// Luma as used by OpenCV: 0.299 R + 0.587 G + 0.114 B, rounded
pub fn to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let v = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// Files in `folder` ending with `suffix`, sorted, paired with `<base><partner_suffix>` when it exists
fn find_pairs(folder: &Path, suffix: &str, partner_suffix: &str) -> Result<Vec<(String, PathBuf, PathBuf)>, MetricsError> {
    let mut names: Vec<String> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(suffix))
        .collect();
    names.sort();

    Ok(names
        .into_iter()
        .filter_map(|name| {
            let base = name[..name.len() - suffix.len()].to_string();
            let partner = folder.join(format!("{}{}", base, partner_suffix));
            if partner.is_file() {
                Some((base, folder.join(&name), partner))
            } else {
                debug!(image = %name, "no matching prediction");
                None
            }
        })
        .collect())
}

/// MSE, RMSE and SSIM of one target/prediction pair, `None` when the shapes differ after resizing
fn score_resized_pair(
    target_path: &Path,
    fake_path: &Path,
    resize: [u32; 2],
) -> Result<Option<(f64, f64, f64)>, MetricsError> {
    let target = image::open(target_path)?.to_rgb8();
    let fake = image::open(fake_path)?.to_rgb8();
    let target = imageops::resize(&target, resize[0], resize[1], FilterType::Triangle);
    if target.dimensions() != fake.dimensions() {
        return Ok(None);
    }
    Ok(Some((mse(&target, &fake)?, rmse(&target, &fake)?, ssim(&target, &fake, 255.0)?)))
}

/// Average MSE, RMSE and SSIM over `*_target.png` / `*_fake.png` pairs.
/// Targets are resized (bilinear) to `resize`; pairs whose shapes still differ or that
/// cannot be read are logged and skipped.
pub fn calculate_metrics(folder: &Path, resize: [u32; 2]) -> Result<AverageMetrics, MetricsError> {
    let mut mse_sum = 0.0;
    let mut rmse_sum = 0.0;
    let mut ssim_sum = 0.0;
    let mut pairs = 0usize;

    for (base, target_path, fake_path) in find_pairs(folder, "_target.png", "_fake.png")? {
        match score_resized_pair(&target_path, &fake_path, resize) {
            Ok(Some((m, r, s))) => {
                mse_sum += m;
                rmse_sum += r;
                ssim_sum += s;
                pairs += 1;
            }
            Ok(None) => warn!(image = %base, "prediction size differs from the resized target, skipping"),
            Err(e) => warn!(image = %base, error = %e, "skipping pair"),
        }
    }

    if pairs == 0 {
        return Err(MetricsError::NoPairs(folder.to_path_buf()));
    }

    let n = pairs as f64;
    let averages = AverageMetrics { mse: mse_sum / n, rmse: rmse_sum / n, ssim: ssim_sum / n, pairs };
    info!(pairs, mse = averages.mse, rmse = averages.rmse, ssim = averages.ssim, "image metrics");
    Ok(averages)
}

fn crop_rgb(image: &RgbImage, column: u32) -> Result<RgbImage, MetricsError> {
    if column >= image.width() {
        return Err(MetricsError::InvalidCrop(column, image.width()));
    }
    Ok(imageops::crop_imm(image, column, 0, image.width() - column, image.height()).to_image())
}

/// Copy of `image` with every pixel outside `mask` painted white
fn masked(image: &RgbImage, mask: &[bool]) -> RgbImage {
    let mut out = image.clone();
    for (pixel, &keep) in out.pixels_mut().zip(mask) {
        if !keep {
            *pixel = Rgb([255, 255, 255]);
        }
    }
    out
}

/// Score a prediction against its ground truth.
///
/// Both images are cropped to the columns from `crop_column` on. Foreground masks are
/// `gray > intensity_threshold`; the masked images are written into `mask_dir` under the
/// input file names. IoU only counts pixels that are not background in the ground truth.
pub fn evaluate_pair(
    ground_truth_path: &Path,
    predicted_path: &Path,
    settings: &EvaluationConfig,
    mask_dir: &Path,
) -> Result<PairMetrics, MetricsError> {
    let ground_truth = crop_rgb(&image::open(ground_truth_path)?.to_rgb8(), settings.crop_column)?;
    let predicted = crop_rgb(&image::open(predicted_path)?.to_rgb8(), settings.crop_column)?;
    if ground_truth.dimensions() != predicted.dimensions() {
        let (w, h) = ground_truth.dimensions();
        let (pw, ph) = predicted.dimensions();
        return Err(MetricsError::ShapeMismatch((w, h, 3), (pw, ph, 3)));
    }

    let gray_truth = to_gray(&ground_truth);
    let gray_predicted = to_gray(&predicted);

    let threshold = settings.intensity_threshold;
    let mask_truth: Vec<bool> = gray_truth.as_raw().iter().map(|&v| v > threshold).collect();
    let mask_predicted: Vec<bool> = gray_predicted.as_raw().iter().map(|&v| v > threshold).collect();
    let foreground: Vec<bool> = gray_truth
        .as_raw()
        .iter()
        .map(|&v| v <= settings.background_threshold)
        .collect();

    fs::create_dir_all(mask_dir)?;
    for (path, image, mask) in [
        (ground_truth_path, &ground_truth, &mask_truth),
        (predicted_path, &predicted, &mask_predicted),
    ] {
        if let Some(name) = path.file_name() {
            masked(image, mask).save(mask_dir.join(name))?;
        }
    }

    let matrix = ConfusionMatrix::from_masks(&mask_truth, &mask_predicted)?;
    let foreground_matrix = ConfusionMatrix::from_masks_where(&mask_truth, &mask_predicted, Some(&foreground))?;

    Ok(PairMetrics {
        precision: matrix.precision(),
        recall: matrix.recall(),
        f2: matrix.f2(),
        mcc: matrix.mcc(),
        jaccard: matrix.jaccard(),
        mse: mse(&gray_truth, &gray_predicted)?,
        iou: foreground_matrix.iou(),
        ssim: ssim(&gray_truth, &gray_predicted, 255.0)?,
    })
}

/// Evaluate every `*_real.png` / `*_fake.png` pair of `folder`; failing pairs are logged and skipped
pub fn evaluate_folder(
    folder: &Path,
    settings: &EvaluationConfig,
    mask_dir: &Path,
) -> Result<MetricSummary, MetricsError> {
    let pairs = find_pairs(folder, "_real.png", "_fake.png")?;
    if pairs.is_empty() {
        return Err(MetricsError::NoPairs(folder.to_path_buf()));
    }

    let progress = crate::dataset::file_utils::progress_bar(pairs.len());
    let mut summary = MetricSummary::default();
    for (base, real, fake) in pairs {
        match evaluate_pair(&real, &fake, settings, mask_dir) {
            Ok(metrics) => summary.rows.push((base, metrics)),
            Err(e) => warn!(image = %base, error = %e, "skipping pair"),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if summary.rows.is_empty() {
        return Err(MetricsError::NoPairs(folder.to_path_buf()));
    }
    Ok(summary)
}
