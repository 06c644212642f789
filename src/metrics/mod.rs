pub mod classification;
pub mod evaluation;
pub mod image_metrics;
