use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::FileConfig;
use crate::error::*;
use crate::mesh_analysis::geometric_analysis::GeometricAnalysis;
use crate::parser::abaqus::abaqus_inp::AbaqusInpParser;
use crate::writer::stl_writer::StlWriter;
use crate::writer::vtk_writer::VtkWriter;

use super::file_utils::{case_dirs, get_file_with_extension, progress_bar};

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Write the volume mesh to `<inp>.vtk` (`<inp>.vtu` with `xml`) and its outer surface to `<inp>.stl`
pub fn convert_inp(inp_file: &Path, xml: bool) -> Result<(PathBuf, PathBuf), DatasetError> {
    let mesh = AbaqusInpParser::parse_file(inp_file)?;
    let summary = GeometricAnalysis::summary(&mesh);
    info!(
        file = %inp_file.display(),
        nodes = summary.num_nodes,
        elements = summary.num_elements,
        "converting mesh"
    );

    let vtk_path = if xml {
        let path = with_suffix(inp_file, ".vtu");
        VtkWriter::write_vtu(&mesh, None, &path)?;
        path
    } else {
        let path = with_suffix(inp_file, ".vtk");
        VtkWriter::write_vtk(&mesh, None, &path)?;
        path
    };

    let stl_path = with_suffix(inp_file, ".stl");
    let surface = GeometricAnalysis::extract_surface(&mesh)?;
    StlWriter::write_binary(&surface, &stl_path)?;

    Ok((vtk_path, stl_path))
}

/// Convert the first mesh file of every `patient/size` case
pub fn convert_all_inp_files(patients_root: &Path, files: &FileConfig) -> Result<usize, DatasetError> {
    let cases = case_dirs(patients_root)?;
    let progress = progress_bar(cases.len());
    let mut done = 0;

    for (_, _, case_dir) in &cases {
        let result = get_file_with_extension(case_dir, &files.mesh_suffix).and_then(|inp| convert_inp(&inp, false));
        match result {
            Ok(_) => done += 1,
            Err(e) => warn!(case = %case_dir.display(), error = %e, "skipping case"),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!(cases = cases.len(), converted = done, "converted meshes");
    Ok(done)
}
