use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::error::*;

use super::file_utils::list_dirs;

/// Shuffle `patients` with a seeded generator and cut off the first `round(n * train_percentage)`
pub fn split_patients(mut patients: Vec<String>, train_percentage: f64, seed: u64) -> (Vec<String>, Vec<String>) {
    patients.sort();
    let mut rng = StdRng::seed_from_u64(seed);
    patients.shuffle(&mut rng);

    let train_size = ((patients.len() as f64 * train_percentage).round() as usize).min(patients.len());
    let test = patients.split_off(train_size);
    (patients, test)
}

/// Train and test patients from the folders below `patients_dir`
pub fn train_test_patients(
    patients_dir: &Path,
    train_percentage: f64,
    seed: u64,
) -> Result<(Vec<String>, Vec<String>), DatasetError> {
    let patients = list_dirs(patients_dir)?;
    let (train, test) = split_patients(patients, train_percentage, seed);
    info!(train = train.len(), test = test.len(), "split patients");
    Ok((train, test))
}
