use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;
use crate::structs_and_impls::{FieldKind, RotationAxis, Split};

/// Top-level configuration, read from an optional TOML file.
/// Every section and field falls back to its default when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub files: FileConfig,
    pub columns: ColumnConfig,
    pub limits: ColorLimits,
    pub split: SplitConfig,
    pub render: RenderConfig,
    pub evaluation: EvaluationConfig,
    pub classification: ClassificationConfig,
}

/// Folder layout below `data_dir`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub data_dir: PathBuf,
    pub patients_dir: String,
    pub images_dir: String,
    pub paired_dir: String,
    pub classification_dir: String,
    pub train_dir: String,
    pub test_dir: String,
    pub good_dir: String,
    pub bad_dir: String,
    /// Transformations rendered by `render` when none are named on the command line
    pub transformations: Vec<FieldKind>,
    /// Input half of a training pair
    pub paired_input: FieldKind,
    /// Target half of a training pair
    pub paired_target: FieldKind,
    /// Image folder copied into the classification dataset
    pub classification_source: FieldKind,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/dataset"),
            patients_dir: "Patients".to_string(),
            images_dir: "Images-new".to_string(),
            paired_dir: "Paired-Images-Stress".to_string(),
            classification_dir: "Classification".to_string(),
            train_dir: "Train".to_string(),
            test_dir: "Test".to_string(),
            good_dir: "Good".to_string(),
            bad_dir: "BAD".to_string(),
            transformations: vec![FieldKind::Stress],
            paired_input: FieldKind::Raw,
            paired_target: FieldKind::Stress,
            classification_source: FieldKind::Pressure,
        }
    }
}

impl DatasetConfig {
    pub fn patients_path(&self) -> PathBuf {
        self.data_dir.join(&self.patients_dir)
    }

    pub fn images_path(&self) -> PathBuf {
        self.data_dir.join(&self.images_dir)
    }

    pub fn paired_path(&self) -> PathBuf {
        self.data_dir.join(&self.paired_dir)
    }

    pub fn classification_path(&self) -> PathBuf {
        self.data_dir.join(&self.classification_dir)
    }

    pub fn split_dir(&self, split: Split) -> &str {
        match split {
            Split::Train => &self.train_dir,
            Split::Test => &self.test_dir,
        }
    }
}

/// File name suffixes looked up in every `patient/size` case folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub mesh_suffix: String,
    pub model_suffix: String,
    pub pressure_suffix: String,
    pub stress_suffix: String,
    pub aorta_suffix: String,
    pub stent_suffix: String,
    pub aorta_part: String,
    pub stent_part: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            mesh_suffix: ".inp".to_string(),
            model_suffix: "MM.inp".to_string(),
            pressure_suffix: "CONTACT.csv".to_string(),
            stress_suffix: "SPOS.csv".to_string(),
            aorta_suffix: "AORTA.inp.stl".to_string(),
            stent_suffix: "STENT.obj".to_string(),
            aorta_part: "AORTA".to_string(),
            stent_part: "STENT".to_string(),
        }
    }
}

/// Column names of the Abaqus CSV reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub node: String,
    pub pressure: String,
    pub stress: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            node: "Node Label".to_string(),
            pressure: "CPRESS     General_Contact_Domain".to_string(),
            stress: "S-Mises".to_string(),
        }
    }
}

/// Colour range per transformation as `[min, max]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorLimits {
    pub pressure: [f64; 2],
    pub stress: [f64; 2],
    pub curvature: [f64; 2],
}

impl Default for ColorLimits {
    fn default() -> Self {
        Self {
            pressure: [0.0, 0.4],
            stress: [0.0, 0.5],
            curvature: [0.0, 0.05],
        }
    }
}

impl ColorLimits {
    /// Raw geometry has no scalars and borrows the curvature range
    pub fn for_kind(&self, kind: FieldKind) -> [f64; 2] {
        match kind {
            FieldKind::Pressure => self.pressure,
            FieldKind::Stress => self.stress,
            FieldKind::Curvature | FieldKind::Raw => self.curvature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub train_percentage: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { train_percentage: 0.8, seed: 1 }
    }
}

/// Off-screen renderer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Columns removed on the left and on the right of every frame
    pub crop: u32,
    pub rotation_step: u32,
    pub rotation_axis: RotationAxis,
    pub initial_rotation_x: f64,
    pub ambient: f64,
    pub diffuse: f64,
    pub zoom: f64,
    pub focal_point: [f64; 3],
    pub elevation: f64,
    pub view_angle: f64,
    /// Supersampling factor per axis
    pub anti_aliasing: u32,
    pub show_edges: bool,
    pub edge_opacity: f64,
    pub edge_color: [u8; 3],
    pub background: [u8; 3],
    /// Colour of meshes without scalars
    pub surface_color: [u8; 3],
    pub colormap_size: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            crop: 128,
            rotation_step: 30,
            rotation_axis: RotationAxis::Z,
            initial_rotation_x: 90.0,
            ambient: 0.3,
            diffuse: 1.0,
            zoom: 2.0,
            focal_point: [0.0, 0.0, 20.0],
            elevation: -20.0,
            view_angle: 30.0,
            anti_aliasing: 2,
            show_edges: true,
            edge_opacity: 0.1,
            edge_color: [0, 0, 0],
            background: [255, 255, 255],
            surface_color: [173, 216, 230],
            colormap_size: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub intensity_threshold: u8,
    /// Background cut-off: grey values above it are not foreground
    pub background_threshold: u8,
    pub crop_column: u32,
    pub resize: [u32; 2],
    pub mask_dir: PathBuf,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            intensity_threshold: 19,
            background_threshold: 254,
            crop_column: 512,
            resize: [256, 256],
            mask_dir: PathBuf::from("masks"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub good_cases: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        let good_cases = [
            "PATIENT-1_26",
            "PATIENT-2_26",
            "PATIENT-3_29",
            "PATIENT-5_26",
            "PATIENT-6_26",
            "PATIENT-7_34",
            "PATIENT-8_29",
            "PATIENT-9_26",
            "PATIENT-10_34",
            "PATIENT-11_34",
            "PATIENT-12_29",
            "PATIENT-13_26",
            "PATIENT-14_29",
            "PATIENT-15_29",
        ];
        Self { good_cases: good_cases.iter().map(|s| s.to_string()).collect() }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Config, DatasetError> {
        let config: Config = toml::from_str(text).map_err(|e| DatasetError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, otherwise the defaults
    pub fn load(path: Option<&Path>) -> Result<Config, DatasetError> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                Self::from_toml_str(&text)
            }
            None => Ok(Config::default()),
        }
    }

    pub fn validate(&self) -> Result<(), DatasetError> {
        let r = &self.render;
        if r.rotation_step == 0 || r.rotation_step > 360 {
            return Err(DatasetError::Config(format!(
                "rotation_step must be in 1..=360, got {}",
                r.rotation_step
            )));
        }
        if r.crop.checked_mul(2).map_or(true, |both| both >= r.width) {
            return Err(DatasetError::Config(format!(
                "crop of {} px per side leaves nothing of a {} px frame",
                r.crop, r.width
            )));
        }
        if r.anti_aliasing == 0 || r.colormap_size == 0 || r.zoom <= 0.0 {
            return Err(DatasetError::Config(
                "anti_aliasing, colormap_size and zoom must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.split.train_percentage) {
            return Err(DatasetError::Config(format!(
                "train_percentage must be within [0, 1], got {}",
                self.split.train_percentage
            )));
        }
        for (name, [lo, hi]) in [
            ("pressure", self.limits.pressure),
            ("stress", self.limits.stress),
            ("curvature", self.limits.curvature),
        ] {
            if lo > hi {
                return Err(DatasetError::Config(format!("{} limits are reversed: [{}, {}]", name, lo, hi)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = Config::default();
        assert_eq!(config.render.width - 2 * config.render.crop, 768);
        assert_eq!(config.limits.for_kind(FieldKind::Stress), [0.0, 0.5]);
        assert_eq!(config.columns.pressure, "CPRESS     General_Contact_Domain");
        assert_eq!(config.classification.good_cases.len(), 14);
        assert_eq!(config.dataset.split_dir(Split::Test), "Test");
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [dataset]
            data_dir = "/data/TAVI"
            transformations = ["Pressure", "Stress"]

            [render]
            rotation_axis = "y"
            rotation_step = 45
            "#,
        )
        .unwrap();
        assert_eq!(config.dataset.patients_path(), PathBuf::from("/data/TAVI/Patients"));
        assert_eq!(config.dataset.transformations, vec![FieldKind::Pressure, FieldKind::Stress]);
        assert_eq!(config.render.rotation_axis, RotationAxis::Y);
        assert_eq!(config.render.zoom, 2.0);
        assert_eq!(config.split.seed, 1);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_toml_str("[render]\nrotation_step = 0\n").is_err());
        assert!(Config::from_toml_str("[render]\ncrop = 600\n").is_err());
        assert!(Config::from_toml_str("[render]\ncrop = 2147483648\n").is_err());
        assert!(Config::from_toml_str("[limits]\nstress = [1.0, 0.0]\n").is_err());
        assert!(Config::from_toml_str("[render]\nrotation_axis = \"w\"\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }
}
