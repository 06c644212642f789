use std::fs;
use std::path::{Path, PathBuf};

use image::imageops;
use nalgebra::Point3;
use tracing::{debug, info};

use crate::config::RenderConfig;
use crate::error::*;
use crate::structs_and_impls::RotationAxis;

use super::camera::Camera;
use super::colormap::Colormap;
use super::rasterizer::Rasterizer;
use super::scene::SceneMesh;

/// Renders a scene from a fixed camera setup while turning it about one axis
pub struct SnapshotGenerator {
    settings: RenderConfig,
    colormap: Colormap,
}

impl SnapshotGenerator {
    pub fn new(settings: RenderConfig) -> Self {
        let colormap = if settings.colormap_size == 64 {
            Colormap::jet64().clone()
        } else {
            Colormap::jet(settings.colormap_size)
        };
        Self { settings, colormap }
    }

    pub fn settings(&self) -> &RenderConfig {
        &self.settings
    }

    /// Output name of frame `index`: `<prefix>_<axis>_<NNN>.png`
    pub fn frame_path(save_prefix: &Path, axis: RotationAxis, index: u32) -> PathBuf {
        let mut name = save_prefix.as_os_str().to_os_string();
        name.push(format!("_{}_{:03}.png", axis, index));
        PathBuf::from(name)
    }

    /// Number of frames in a full turn
    pub fn frame_count(step: u32) -> Result<u32, RenderError> {
        if step == 0 || step > 360 {
            return Err(RenderError::InvalidStep(step));
        }
        Ok(360 / step)
    }

    /// Camera for the current pose: isometric reset on the bounds, then zoom,
    /// focal point and elevation
    pub fn camera_for(&self, scene: &[SceneMesh]) -> Result<Camera, RenderError> {
        let bounds = scene
            .iter()
            .filter_map(|m| m.surface.bounds())
            .reduce(|(lo_a, hi_a), (lo_b, hi_b)| {
                (
                    Point3::new(lo_a.x.min(lo_b.x), lo_a.y.min(lo_b.y), lo_a.z.min(lo_b.z)),
                    Point3::new(hi_a.x.max(hi_b.x), hi_a.y.max(hi_b.y), hi_a.z.max(hi_b.z)),
                )
            })
            .ok_or(RenderError::EmptyScene)?;

        let mut camera = Camera::reset_to_bounds(bounds, self.settings.view_angle);
        camera.zoom(self.settings.zoom);
        let [fx, fy, fz] = self.settings.focal_point;
        camera.set_focal_point(Point3::new(fx, fy, fz));
        camera.elevation(self.settings.elevation);
        Ok(camera)
    }

    /// Render one cropped frame of the scene as it is
    pub fn render_frame(&self, scene: &[SceneMesh]) -> Result<image::RgbImage, RenderError> {
        let crop = self.settings.crop;
        let width = self.settings.width;
        let kept = match crop.checked_mul(2) {
            Some(both) if both < width => width - both,
            _ => return Err(RenderError::InvalidCrop { crop, width }),
        };

        let camera = self.camera_for(scene)?;
        let frame = Rasterizer::new(&self.settings, &self.colormap).render(scene, &camera)?;
        Ok(imageops::crop_imm(&frame, crop, 0, kept, frame.height()).to_image())
    }

    /// Rotate the scene by the initial x-rotation, then for every step turn it about `axis`
    /// (about the origin, cumulatively), render and save. Returns the written paths.
    pub fn generate_rotating_snapshots(
        &self,
        mut scene: Vec<SceneMesh>,
        save_prefix: &Path,
        axis: RotationAxis,
        step: u32,
    ) -> Result<Vec<PathBuf>, RenderError> {
        let frames = Self::frame_count(step)?;
        if scene.iter().all(|m| m.surface.triangles.is_empty()) {
            return Err(RenderError::EmptyScene);
        }
        if let Some(parent) = save_prefix.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Stand the geometry upright
        for mesh in &mut scene {
            mesh.rotate(RotationAxis::X, self.settings.initial_rotation_x);
        }

        let mut written = Vec::with_capacity(frames as usize);
        for i in 0..frames {
            for mesh in &mut scene {
                mesh.rotate(axis, step as f64);
            }
            let image = self.render_frame(&scene)?;
            let path = Self::frame_path(save_prefix, axis, i);
            image.save(&path)?;
            debug!(file = %path.display(), "saved snapshot");
            written.push(path);
        }

        info!(prefix = %save_prefix.display(), frames, "rendered rotating snapshots");
        Ok(written)
    }
}
