pub mod camera;
pub mod colormap;
pub mod rasterizer;
pub mod scene;
pub mod snapshot;
