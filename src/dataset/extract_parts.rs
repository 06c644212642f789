use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::FileConfig;
use crate::error::*;
use crate::parser::abaqus::abaqus_inp::extract_part;

use super::file_utils::{case_dirs, get_file_with_extension, progress_bar};

/// Path of a part file written beside `inp_file`: `<inp_file><part>_PRE.inp`
pub fn part_file_path(inp_file: &Path, part: &str) -> PathBuf {
    let mut name = inp_file.as_os_str().to_os_string();
    name.push(format!("{}_PRE.inp", part));
    PathBuf::from(name)
}

/// Split the model deck of one case into its aorta and stent parts
pub fn extract_case_parts(case_dir: &Path, files: &FileConfig) -> Result<Vec<PathBuf>, DatasetError> {
    let inp_file = get_file_with_extension(case_dir, &files.model_suffix)?;
    let data = fs::read_to_string(&inp_file)?;

    let mut written = Vec::with_capacity(2);
    for part in [&files.aorta_part, &files.stent_part] {
        let text = extract_part(&data, part);
        if text.is_empty() {
            warn!(file = %inp_file.display(), part = %part, "part not found, writing an empty file");
        }
        let out = part_file_path(&inp_file, part);
        fs::write(&out, text)?;
        debug!(file = %out.display(), "wrote part");
        written.push(out);
    }
    Ok(written)
}

/// Run `extract_case_parts` over every `patient/size` case below `patients_root`
pub fn extract_parts_from_inp_files(patients_root: &Path, files: &FileConfig) -> Result<usize, DatasetError> {
    let cases = case_dirs(patients_root)?;
    let progress = progress_bar(cases.len());
    let mut done = 0;

    for (_, _, case_dir) in &cases {
        match extract_case_parts(case_dir, files) {
            Ok(_) => done += 1,
            Err(e) => warn!(case = %case_dir.display(), error = %e, "skipping case"),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!(cases = cases.len(), extracted = done, "extracted parts");
    Ok(done)
}
