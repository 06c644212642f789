use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Config;
use crate::error::*;
use crate::mesh_analysis::curvature::Curvature;
use crate::parser::abaqus::result_csv::{load_joined_result, JoinKind};
use crate::render::scene::SceneMesh;
use crate::render::snapshot::SnapshotGenerator;
use crate::structs_and_impls::{FieldKind, Split, SurfaceMesh};

use super::file_utils::{clean_dir, get_file_with_extension, list_dirs, progress_bar};
use super::split::train_test_patients;

/// Outcome of one rendering pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub cases: usize,
    pub failed: usize,
    pub frames: usize,
}

impl RenderStats {
    fn add(&mut self, other: RenderStats) {
        self.cases += other.cases;
        self.failed += other.failed;
        self.frames += other.frames;
    }
}

/// Turns every `patient/size` case into a set of rotating snapshots
pub struct DatasetRenderer<'a> {
    config: &'a Config,
    generator: SnapshotGenerator,
}

impl<'a> DatasetRenderer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config, generator: SnapshotGenerator::new(config.render.clone()) }
    }

    /// Folder receiving the snapshots of `kind` for one split
    pub fn output_dir(&self, kind: FieldKind, split: Split) -> PathBuf {
        let dataset = &self.config.dataset;
        dataset
            .images_path()
            .join(dataset.split_dir(split))
            .join(kind.attribute_name())
    }

    /// Stent and aorta of a case as one mesh; the stent comes first and carries zeros
    pub fn case_scene(&self, case_dir: &Path, kind: FieldKind) -> Result<SceneMesh, DatasetError> {
        let files = &self.config.files;
        let aorta = SurfaceMesh::read(get_file_with_extension(case_dir, &files.aorta_suffix)?)?;
        let stent = SurfaceMesh::read(get_file_with_extension(case_dir, &files.stent_suffix)?)?;

        let scalars = match kind {
            FieldKind::Raw => None,
            FieldKind::Curvature => Some(Curvature::gaussian(&aorta)),
            FieldKind::Pressure | FieldKind::Stress => {
                let (suffix, column) = if kind == FieldKind::Pressure {
                    (&files.pressure_suffix, &self.config.columns.pressure)
                } else {
                    (&files.stress_suffix, &self.config.columns.stress)
                };
                let inp = get_file_with_extension(case_dir, &files.mesh_suffix)?;
                let csv = get_file_with_extension(case_dir, suffix)?;
                let rows = load_joined_result(inp, csv, &self.config.columns.node, column, JoinKind::Inner)?;
                Some(aorta.attach_node_values(&rows))
            }
        };

        let aorta = SceneMesh::new(aorta);
        let aorta = match scalars {
            Some(values) => aorta.with_scalars(values, self.config.limits.for_kind(kind))?,
            None => aorta,
        };
        Ok(SceneMesh::new(stent).merge(&aorta))
    }

    pub fn render_case(&self, case_dir: &Path, kind: FieldKind, save_prefix: &Path) -> Result<Vec<PathBuf>, DatasetError> {
        let scene = self.case_scene(case_dir, kind)?;
        let render = &self.config.render;
        Ok(self
            .generator
            .generate_rotating_snapshots(vec![scene], save_prefix, render.rotation_axis, render.rotation_step)?)
    }

    /// Render every case of `patients` into the `kind` folder of `split`.
    /// A failing case is logged and skipped.
    pub fn render_transformation(&self, patients: &[String], kind: FieldKind, split: Split) -> Result<RenderStats, DatasetError> {
        let patients_root = self.config.dataset.patients_path();
        let output_dir = self.output_dir(kind, split);
        let mut stats = RenderStats::default();

        let progress = progress_bar(patients.len());
        for patient in patients {
            let patient_dir = patients_root.join(patient);
            let sizes = match list_dirs(&patient_dir) {
                Ok(sizes) => sizes,
                Err(e) => {
                    warn!(patient = %patient_dir.display(), error = %e, "skipping patient");
                    progress.inc(1);
                    continue;
                }
            };
            for size in sizes {
                let case_dir = patient_dir.join(&size);
                let save_prefix = output_dir.join(format!("{}_{}", patient, size));
                stats.cases += 1;
                match self.render_case(&case_dir, kind, &save_prefix) {
                    Ok(frames) => stats.frames += frames.len(),
                    Err(e) => {
                        stats.failed += 1;
                        warn!(case = %case_dir.display(), error = %e, "skipping case");
                    }
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            transformation = %kind,
            split = ?split,
            cases = stats.cases,
            failed = stats.failed,
            frames = stats.frames,
            "rendered transformation"
        );
        Ok(stats)
    }

    /// Split the patients, then for each transformation clear its Train and Test folders and render both
    pub fn render_all(&self, kinds: &[FieldKind]) -> Result<RenderStats, DatasetError> {
        let split = &self.config.split;
        let (train, test) =
            train_test_patients(&self.config.dataset.patients_path(), split.train_percentage, split.seed)?;

        let mut total = RenderStats::default();
        for &kind in kinds {
            clean_dir(&self.output_dir(kind, Split::Train))?;
            clean_dir(&self.output_dir(kind, Split::Test))?;
            total.add(self.render_transformation(&train, kind, Split::Train)?);
            total.add(self.render_transformation(&test, kind, Split::Test)?);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const AORTA: &str = "*Node\n1,0,0,0\n2,1,0,0\n3,0,1,0\n4,0,0,1\n*Element, type=S3R\n1,1,2,3\n2,1,2,4\n3,2,3,4\n4,1,3,4\n";

    fn write_case(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("case_AORTA.inp"), AORTA).unwrap();
        fs::write(dir.join("case_STENT.obj"), "v 0 0 2\nv 1 0 2\nv 0 1 2\nf 1 2 3\n").unwrap();
        fs::write(
            dir.join("case_SPOS.csv"),
            "Node Label, S-Mises\n1, 0.1\n2, 0.2\n3, 0.3\n4, 0.4\n",
        )
        .unwrap();
    }

    fn config(root: &Path) -> Config {
        let mut config = Config::default();
        config.dataset.data_dir = root.to_path_buf();
        config.files.aorta_suffix = "AORTA.inp".to_string();
        config.render.width = 48;
        config.render.height = 32;
        config.render.crop = 8;
        config.render.rotation_step = 180;
        config.render.anti_aliasing = 1;
        config
    }

    #[test]
    fn test_stent_first_with_zero_scalars() {
        let dir = tempfile::tempdir().unwrap();
        let case = dir.path().join("case");
        write_case(&case);
        let config = config(dir.path());
        let renderer = DatasetRenderer::new(&config);

        let scene = renderer.case_scene(&case, FieldKind::Stress).unwrap();
        assert_eq!(scene.surface.n_points(), 7);
        assert_eq!(scene.scalars.unwrap(), vec![0.0, 0.0, 0.0, 0.1, 0.2, 0.3, 0.4]);
        assert_eq!(scene.clim, [0.0, 0.5]);

        let raw = renderer.case_scene(&case, FieldKind::Raw).unwrap();
        assert!(raw.scalars.is_none());
    }

    #[test]
    fn test_stl_aorta_values_follow_coordinates() {
        use crate::writer::stl_writer::StlWriter;
        use nalgebra::Point3;

        let dir = tempfile::tempdir().unwrap();
        let case = dir.path().join("case");
        write_case(&case);
        fs::write(
            case.join("case_AORTA.inp"),
            "*Node\n1, 24.0385, 0., 0.\n2, 0., 1.0005, 0.\n3, 0., 0., -3.0115\n4, 1.5, 1.5, 1.5\n",
        )
        .unwrap();
        // STL vertices in the order node 3, 1, 2, 4, stored in single precision
        let stl = SurfaceMesh::new(
            vec![
                Point3::new(0.0, 0.0, -3.0115),
                Point3::new(24.0385, 0.0, 0.0),
                Point3::new(0.0, 1.0005, 0.0),
                Point3::new(1.5, 1.5, 1.5),
            ],
            vec![[0, 1, 2], [0, 1, 3]],
        );
        StlWriter::write_binary(&stl, case.join("case_AORTA.inp.stl")).unwrap();

        let mut config = config(dir.path());
        config.files.aorta_suffix = "AORTA.inp.stl".to_string();
        let renderer = DatasetRenderer::new(&config);
        let scene = renderer.case_scene(&case, FieldKind::Stress).unwrap();
        assert_eq!(scene.scalars.unwrap(), vec![0.0, 0.0, 0.0, 0.3, 0.1, 0.2, 0.4]);
    }

    #[test]
    fn test_missing_result_file_fails_case() {
        let dir = tempfile::tempdir().unwrap();
        let case = dir.path().join("case");
        write_case(&case);
        let config = config(dir.path());
        let renderer = DatasetRenderer::new(&config);
        assert!(matches!(
            renderer.case_scene(&case, FieldKind::Pressure),
            Err(DatasetError::NoMatchingFile { .. })
        ));
    }

    #[test]
    fn test_render_transformation_skips_broken_cases() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let patients = config.dataset.patients_path();
        write_case(&patients.join("PATIENT-1").join("26"));
        fs::create_dir_all(patients.join("PATIENT-1").join("29")).unwrap();

        let renderer = DatasetRenderer::new(&config);
        let stats = renderer
            .render_transformation(
                &["PATIENT-1".to_string(), "PATIENT-9".to_string()],
                FieldKind::Curvature,
                Split::Train,
            )
            .unwrap();
        assert_eq!(stats, RenderStats { cases: 2, failed: 1, frames: 2 });

        let out = renderer.output_dir(FieldKind::Curvature, Split::Train);
        assert!(out.join("PATIENT-1_26_z_000.png").is_file());
        assert!(out.join("PATIENT-1_26_z_001.png").is_file());
    }
}
