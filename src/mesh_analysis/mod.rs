pub mod curvature;
pub mod geometric_analysis;
