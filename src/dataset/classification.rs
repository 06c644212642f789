use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::DatasetConfig;
use crate::error::*;
use crate::structs_and_impls::{FieldKind, Split};

use super::file_utils::{clean_dir, list_files};

/// Whether an image name belongs to one of the good cases
pub fn is_good_case(name: &str, good_cases: &[String]) -> bool {
    good_cases.iter().any(|case| name.contains(case.as_str()))
}

/// Copy the `source` images of Train and Test into `Good` and `BAD` folders.
/// Returns (good, bad) counts over both splits.
pub fn create_classification_dataset(
    images_root: &Path,
    classification_root: &Path,
    dataset: &DatasetConfig,
    source: FieldKind,
    good_cases: &[String],
) -> Result<(usize, usize), DatasetError> {
    let mut good_total = 0;
    let mut bad_total = 0;

    for split in [Split::Test, Split::Train] {
        let split_name = dataset.split_dir(split);
        let source_dir = images_root.join(split_name).join(source.attribute_name());
        let good_dir = classification_root.join(split_name).join(&dataset.good_dir);
        let bad_dir = classification_root.join(split_name).join(&dataset.bad_dir);
        clean_dir(&good_dir)?;
        clean_dir(&bad_dir)?;

        for name in list_files(&source_dir)? {
            let dest = if is_good_case(&name, good_cases) {
                good_total += 1;
                &good_dir
            } else {
                bad_total += 1;
                &bad_dir
            };
            fs::copy(source_dir.join(&name), dest.join(&name))?;
        }
    }

    info!(good = good_total, bad = bad_total, "created classification dataset");
    Ok((good_total, bad_total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_good_and_bad_split() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("Images");
        let dataset = DatasetConfig::default();
        for split in ["Train", "Test"] {
            let src = images.join(split).join("Pressure");
            fs::create_dir_all(&src).unwrap();
            fs::write(src.join("PATIENT-1_26_z_000.png"), split).unwrap();
            fs::write(src.join("PATIENT-1_29_z_000.png"), split).unwrap();
        }

        let good_cases = vec!["PATIENT-1_26".to_string()];
        let class_root = dir.path().join("Classification");
        let counts =
            create_classification_dataset(&images, &class_root, &dataset, FieldKind::Pressure, &good_cases).unwrap();
        assert_eq!(counts, (2, 2));

        assert!(class_root.join("Train/Good/PATIENT-1_26_z_000.png").is_file());
        assert!(class_root.join("Test/BAD/PATIENT-1_29_z_000.png").is_file());
        assert_eq!(fs::read_to_string(class_root.join("Test/Good/PATIENT-1_26_z_000.png")).unwrap(), "Test");
    }

    #[test]
    fn test_substring_match() {
        let good = vec!["PATIENT-7_34".to_string()];
        assert!(is_good_case("PATIENT-7_34_z_011.png", &good));
        assert!(!is_good_case("PATIENT-7_29_z_011.png", &good));
    }
}
