use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading meshes, `.inp` decks and result tables
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),                      // File I/O errors (e.g., file not found)
    #[error("Format error: {0}")]
    FormatError(String),                             // Malformed data, unexpected structure
    #[error("Number parse error: {0}")]
    NumberParseError(String),                        // Failed number conversions
    #[error("Column '{0}' not found in result table")]
    MissingColumn(String),
    #[error("Unsupported mesh file: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("VTK error: {0}")]
    VtkError(String),
}

// Number conversions keep the message so that `?` works in the line parsers
impl From<std::num::ParseFloatError> for ParseError {
    fn from(err: std::num::ParseFloatError) -> Self {
        ParseError::NumberParseError(format!("Float parse error: {}", err))
    }
}

impl From<std::num::ParseIntError> for ParseError {
    fn from(err: std::num::ParseIntError) -> Self {
        ParseError::NumberParseError(format!("Int parse error: {}", err))
    }
}

impl From<vtkio::Error> for ParseError {
    fn from(err: vtkio::Error) -> Self {
        ParseError::VtkError(format!("{:?}", err))
    }
}

// Raised while loading piece data referenced by XML files
impl From<vtkio::model::Error> for ParseError {
    fn from(err: vtkio::model::Error) -> Self {
        ParseError::VtkError(format!("{:?}", err))
    }
}

impl From<tobj::LoadError> for ParseError {
    fn from(err: tobj::LoadError) -> Self {
        ParseError::FormatError(format!("OBJ load error: {}", err))
    }
}

/// Writer errors for output operations
#[derive(Error, Debug)]
pub enum WriterError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("VTK error: {0}")]
    VtkError(String),
}

impl From<vtkio::Error> for WriterError {
    fn from(err: vtkio::Error) -> Self {
        WriterError::VtkError(format!("{:?}", err))
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid rotation axis '{0}', expected x, y or z")]
    InvalidAxis(String),
    #[error("Invalid rotation step {0}, expected 1..=360 degrees")]
    InvalidStep(u32),
    #[error("Scalar array has {got} values but the mesh has {expected} points")]
    ScalarLength { expected: usize, got: usize },
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),
    #[error("Nothing to render: scene has no triangles")]
    EmptyScene,
    #[error("Crop of {crop} px per side does not fit a {width} px wide frame")]
    InvalidCrop { crop: u32, width: u32 },
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Image shapes differ: {0:?} vs {1:?}")]
    ShapeMismatch((u32, u32, u8), (u32, u32, u8)),
    #[error("Image of {0}x{1} is smaller than the {2}x{2} SSIM window")]
    ImageTooSmall(u32, u32, usize),
    #[error("Mask lengths differ: {0} vs {1}")]
    MaskLength(usize, usize),
    #[error("Crop column {0} is outside an image {1} px wide")]
    InvalidCrop(u32, u32),
    #[error("No image pairs found in {0}")]
    NoPairs(PathBuf),
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Errors of the batch drivers; wraps every lower layer
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("No file ending with '{suffix}' in {dir}")]
    NoMatchingFile { dir: PathBuf, suffix: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Writer error: {0}")]
    Writer(#[from] WriterError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
