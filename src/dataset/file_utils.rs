use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::*;

/// First entry of `dir` (by name) whose file name ends with `suffix`
pub fn get_file_with_extension(dir: &Path, suffix: &str) -> Result<PathBuf, DatasetError> {
    let mut names = entry_names(dir)?;
    names.sort();
    names
        .into_iter()
        .find(|name| name.ends_with(suffix))
        .map(|name| dir.join(name))
        .ok_or_else(|| DatasetError::NoMatchingFile { dir: dir.to_path_buf(), suffix: suffix.to_string() })
}

/// Remove `dir` with everything below it when present, then create it empty
pub fn clean_dir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(dir)
}

/// Names of the subdirectories of `dir`, sorted
pub fn list_dirs(dir: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}

/// Names of the regular files of `dir`, sorted
pub fn list_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}

fn entry_names(dir: &Path) -> io::Result<Vec<String>> {
    Ok(fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect())
}

/// `patient/size` case folders below `patients_root`, in name order
pub fn case_dirs(patients_root: &Path) -> io::Result<Vec<(String, String, PathBuf)>> {
    let mut cases = Vec::new();
    for patient in list_dirs(patients_root)? {
        let patient_dir = patients_root.join(&patient);
        for size in list_dirs(&patient_dir)? {
            let path = patient_dir.join(&size);
            cases.push((patient.clone(), size, path));
        }
    }
    Ok(cases)
}

/// Progress bar for batch loops
pub fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) - remaining: [{eta_precise}]",
    )
    .map(|style| style.progress_chars("=> "))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
