use std::path::Path;

use image::{imageops, RgbImage};
use tracing::{info, warn};

use crate::config::DatasetConfig;
use crate::error::*;
use crate::structs_and_impls::{FieldKind, Split};

use super::file_utils::{clean_dir, list_files, progress_bar};

/// Put `left` and `right` side by side on a black canvas as tall as `left`
pub fn pair_images(left: &RgbImage, right: &RgbImage) -> RgbImage {
    let mut canvas = RgbImage::new(left.width() + right.width(), left.height());
    imageops::replace(&mut canvas, left, 0, 0);
    imageops::replace(&mut canvas, right, left.width() as i64, 0);
    canvas
}

pub fn create_pair(left: &Path, right: &Path, output: &Path) -> Result<(), DatasetError> {
    let left = image::open(left)?.to_rgb8();
    let right = image::open(right)?.to_rgb8();
    pair_images(&left, &right).save(output)?;
    Ok(())
}

/// Pair `<split>/<input>/<name>` with `<split>/<target>/<name>` for Train and Test.
/// Images without a target or that cannot be read are logged and skipped.
/// Returns the number of pairs written.
pub fn generate_paired_dataset(
    images_root: &Path,
    paired_root: &Path,
    dataset: &DatasetConfig,
    input: FieldKind,
    target: FieldKind,
) -> Result<usize, DatasetError> {
    let mut written = 0;

    for split in [Split::Train, Split::Test] {
        let split_dir = images_root.join(dataset.split_dir(split));
        let input_dir = split_dir.join(input.attribute_name());
        let target_dir = split_dir.join(target.attribute_name());
        let pairs_dir = paired_root.join(dataset.split_dir(split));
        clean_dir(&pairs_dir)?;

        let images = list_files(&input_dir)?;
        let progress = progress_bar(images.len());
        for name in &images {
            let target_path = target_dir.join(name);
            if !target_path.is_file() {
                warn!(image = %name, target = %target, "no target image, skipping");
            } else {
                match create_pair(&input_dir.join(name), &target_path, &pairs_dir.join(name)) {
                    Ok(()) => written += 1,
                    Err(e) => warn!(image = %name, error = %e, "skipping pair"),
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();
    }

    info!(pairs = written, input = %input, target = %target, "generated paired dataset");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::fs;

    #[test]
    fn test_pair_layout() {
        let left = RgbImage::from_pixel(3, 2, Rgb([10, 0, 0]));
        let right = RgbImage::from_pixel(2, 4, Rgb([0, 20, 0]));
        let pair = pair_images(&left, &right);
        assert_eq!(pair.dimensions(), (5, 2));
        assert_eq!(pair.get_pixel(2, 1), &Rgb([10, 0, 0]));
        assert_eq!(pair.get_pixel(3, 0), &Rgb([0, 20, 0]));

        // shorter right image leaves black below it
        let tall = RgbImage::from_pixel(2, 4, Rgb([1, 1, 1]));
        let short = RgbImage::from_pixel(2, 2, Rgb([9, 9, 9]));
        let pair = pair_images(&tall, &short);
        assert_eq!(pair.get_pixel(3, 3), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_generate_for_both_splits() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("Images-new");
        let dataset = DatasetConfig::default();
        for split in ["Train", "Test"] {
            fs::create_dir_all(images.join(split).join("Raw")).unwrap();
            fs::create_dir_all(images.join(split).join("Stress")).unwrap();
            let img = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
            img.save(images.join(split).join("Raw").join("P-1_26_z_000.png")).unwrap();
            img.save(images.join(split).join("Stress").join("P-1_26_z_000.png")).unwrap();
        }
        RgbImage::new(4, 4).save(images.join("Train").join("Raw").join("P-2_26_z_000.png")).unwrap();
        // unreadable input with a target
        fs::write(images.join("Test").join("Raw").join("P-3_26_z_000.png"), b"truncated").unwrap();
        RgbImage::new(4, 4).save(images.join("Test").join("Stress").join("P-3_26_z_000.png")).unwrap();

        let paired = dir.path().join("Paired-Images-Stress");
        let count =
            generate_paired_dataset(&images, &paired, &dataset, FieldKind::Raw, FieldKind::Stress).unwrap();
        assert_eq!(count, 2);

        let pair = image::open(paired.join("Test").join("P-1_26_z_000.png")).unwrap();
        assert_eq!((pair.width(), pair.height()), (8, 4));
        assert!(!paired.join("Train").join("P-2_26_z_000.png").exists());
        assert!(!paired.join("Test").join("P-3_26_z_000.png").exists());
    }
}
