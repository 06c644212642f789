pub mod classification;
pub mod convert;
pub mod extract_parts;
pub mod file_utils;
pub mod geometry_to_image;
pub mod merge;
pub mod paired;
pub mod split;
