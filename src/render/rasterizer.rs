use std::cmp::Ordering;

use image::{Rgb, RgbImage};
use rayon::prelude::*;
use tracing::debug;

use crate::config::RenderConfig;
use crate::error::*;
use crate::mesh_analysis::geometric_analysis::GeometricAnalysis;

use super::camera::Camera;
use super::colormap::Colormap;
use super::scene::SceneMesh;

/// Rows rasterised by one rayon task
const TILE_ROWS: usize = 16;

/// Nearest depth a vertex may have in front of the camera
const NEAR: f64 = 1e-9;

/// A triangle in supersampled pixel coordinates
struct ScreenTriangle {
    xy: [(f64, f64); 3],
    inv_depth: [f64; 3],
    scalars: Option<[f64; 3]>,
    intensity: [f64; 3],
    mesh: usize,
    y_range: (f64, f64),
    x_range: (f64, f64),
    depth_key: f64,
}

/// Per-mesh shading parameters
struct MeshStyle {
    clim: [f64; 2],
    opacity: f64,
}

/// Z-buffer renderer for scene meshes
pub struct Rasterizer<'a> {
    settings: &'a RenderConfig,
    colormap: &'a Colormap,
}

impl<'a> Rasterizer<'a> {
    pub fn new(settings: &'a RenderConfig, colormap: &'a Colormap) -> Self {
        Self { settings, colormap }
    }

    /// Render a `width` x `height` frame.
    ///
    /// The frame is drawn `anti_aliasing` times larger in each direction and box-filtered down.
    /// Opaque meshes are drawn first with depth writes; translucent meshes follow back to front.
    pub fn render(&self, meshes: &[SceneMesh], camera: &Camera) -> Result<RgbImage, RenderError> {
        if meshes.iter().all(|m| m.surface.triangles.is_empty()) {
            return Err(RenderError::EmptyScene);
        }

        let ssaa = self.settings.anti_aliasing.max(1) as usize;
        let width = self.settings.width as usize * ssaa;
        let height = self.settings.height as usize * ssaa;

        let (opaque, translucent, styles) = self.project(meshes, camera, width as f64, height as f64)?;

        let n_tiles = height.div_ceil(TILE_ROWS);
        let opaque_bins = bin_by_tile(&opaque, n_tiles, height);
        let translucent_bins = bin_by_tile(&translucent, n_tiles, height);

        let background = rgb_to_unit(self.settings.background);
        let mut color = vec![background; width * height];
        let mut depth = vec![f64::INFINITY; width * height];

        let edge_half_width = 0.5 * ssaa as f64;
        let context = TileContext {
            width,
            styles: &styles,
            colormap: self.colormap,
            surface_color: rgb_to_unit(self.settings.surface_color),
            edge_color: rgb_to_unit(self.settings.edge_color),
            edge_opacity: if self.settings.show_edges { self.settings.edge_opacity } else { 0.0 },
            edge_half_width,
        };

        color
            .par_chunks_mut(width * TILE_ROWS)
            .zip(depth.par_chunks_mut(width * TILE_ROWS))
            .enumerate()
            .for_each(|(tile, (color, depth))| {
                let y0 = tile * TILE_ROWS;
                for &t in &opaque_bins[tile] {
                    context.draw(&opaque[t], y0, color, depth, false);
                }
                for &t in &translucent_bins[tile] {
                    context.draw(&translucent[t], y0, color, depth, true);
                }
            });

        debug!(
            opaque = opaque.len(),
            translucent = translucent.len(),
            width,
            height,
            "rasterised frame"
        );

        Ok(downsample(&color, width, height, ssaa))
    }

    fn project(
        &self,
        meshes: &[SceneMesh],
        camera: &Camera,
        width: f64,
        height: f64,
    ) -> Result<(Vec<ScreenTriangle>, Vec<ScreenTriangle>, Vec<MeshStyle>), RenderError> {
        let basis = camera.basis();
        let forward = basis.2;
        let mut opaque = Vec::new();
        let mut translucent = Vec::new();
        let mut styles = Vec::with_capacity(meshes.len());

        for (mesh_idx, mesh) in meshes.iter().enumerate() {
            let surface = &mesh.surface;
            if let Some(scalars) = &mesh.scalars {
                if scalars.len() != surface.n_points() {
                    return Err(RenderError::ScalarLength { expected: surface.n_points(), got: scalars.len() });
                }
            }
            if let Some(i) = surface.triangles.iter().flatten().find(|&&i| i >= surface.n_points()) {
                return Err(RenderError::InvalidMesh(format!(
                    "triangle references point {} of {}",
                    i,
                    surface.n_points()
                )));
            }
            styles.push(MeshStyle { clim: mesh.clim, opacity: mesh.opacity });

            let normals = GeometricAnalysis::vertex_normals(surface);
            // Two-sided headlight along the view direction
            let intensity: Vec<f64> = normals
                .iter()
                .map(|n| (self.settings.ambient + self.settings.diffuse * n.dot(&forward).abs()).min(1.0))
                .collect();
            let projected: Vec<(f64, f64, f64)> = surface
                .points
                .iter()
                .map(|p| {
                    let view = camera.to_view(p, &basis);
                    let (x, y) = camera.project(&view, width, height);
                    (x, y, view.depth)
                })
                .collect();

            for tri in &surface.triangles {
                let v = tri.map(|i| projected[i]);
                if v.iter().any(|p| p.2 <= NEAR) {
                    continue; // behind the camera
                }
                let xs = [v[0].0, v[1].0, v[2].0];
                let ys = [v[0].1, v[1].1, v[2].1];
                let screen = ScreenTriangle {
                    xy: [(xs[0], ys[0]), (xs[1], ys[1]), (xs[2], ys[2])],
                    inv_depth: [1.0 / v[0].2, 1.0 / v[1].2, 1.0 / v[2].2],
                    scalars: mesh.scalars.as_ref().map(|s| tri.map(|i| s[i])),
                    intensity: tri.map(|i| intensity[i]),
                    mesh: mesh_idx,
                    y_range: (min3(ys), max3(ys)),
                    x_range: (min3(xs), max3(xs)),
                    depth_key: (v[0].2 + v[1].2 + v[2].2) / 3.0,
                };
                if screen.x_range.1 < 0.0
                    || screen.x_range.0 > width
                    || screen.y_range.1 < 0.0
                    || screen.y_range.0 > height
                {
                    continue; // off screen
                }
                if mesh.is_translucent() {
                    translucent.push(screen);
                } else {
                    opaque.push(screen);
                }
            }
        }

        // far to near
        translucent.sort_by(|a, b| b.depth_key.partial_cmp(&a.depth_key).unwrap_or(Ordering::Equal));
        Ok((opaque, translucent, styles))
    }
}

struct TileContext<'a> {
    width: usize,
    styles: &'a [MeshStyle],
    colormap: &'a Colormap,
    surface_color: [f64; 3],
    edge_color: [f64; 3],
    edge_opacity: f64,
    edge_half_width: f64,
}

impl TileContext<'_> {
    fn draw(&self, tri: &ScreenTriangle, y0: usize, color: &mut [[f64; 3]], depth: &mut [f64], blend: bool) {
        let rows = color.len() / self.width;
        let [a, b, c] = tri.xy;
        let area = edge(a, b, c);
        if area.abs() < 1e-12 {
            return;
        }
        let lengths = [dist(b, c), dist(c, a), dist(a, b)];

        let row_lo = ((tri.y_range.0 - 0.5).ceil().max(y0 as f64) as usize).max(y0);
        let row_hi = ((tri.y_range.1 - 0.5).floor() + 1.0).clamp(0.0, (y0 + rows) as f64) as usize;
        let col_lo = (tri.x_range.0 - 0.5).ceil().max(0.0) as usize;
        let col_hi = ((tri.x_range.1 - 0.5).floor() + 1.0).clamp(0.0, self.width as f64) as usize;

        for y in row_lo..row_hi {
            let py = y as f64 + 0.5;
            for x in col_lo..col_hi {
                let p = (x as f64 + 0.5, py);
                let w = [edge(b, c, p), edge(c, a, p), edge(a, b, p)];
                // same sign as the triangle's area for both windings
                if w.iter().any(|wi| wi * area < 0.0) {
                    continue;
                }
                let bary = [w[0] / area, w[1] / area, w[2] / area];
                let persp: [f64; 3] = [
                    bary[0] * tri.inv_depth[0],
                    bary[1] * tri.inv_depth[1],
                    bary[2] * tri.inv_depth[2],
                ];
                let inv_z = persp[0] + persp[1] + persp[2];
                if inv_z <= 0.0 {
                    continue;
                }
                let z = 1.0 / inv_z;
                let idx = (y - y0) * self.width + x;
                if z >= depth[idx] {
                    continue;
                }

                let weights = [persp[0] / inv_z, persp[1] / inv_z, persp[2] / inv_z];
                let mut shade = self.shade(tri, &weights);

                let near_edge = (0..3).any(|i| lengths[i] > 0.0 && w[i].abs() / lengths[i] < self.edge_half_width);
                if near_edge && self.edge_opacity > 0.0 {
                    shade = mix(shade, self.edge_color, self.edge_opacity);
                }

                if blend {
                    color[idx] = mix(color[idx], shade, self.styles[tri.mesh].opacity);
                } else {
                    color[idx] = shade;
                    depth[idx] = z;
                }
            }
        }
    }

    /// Scalars are interpolated before the colour lookup
    fn shade(&self, tri: &ScreenTriangle, weights: &[f64; 3]) -> [f64; 3] {
        let base = match tri.scalars {
            Some(s) => {
                let value = weights[0] * s[0] + weights[1] * s[1] + weights[2] * s[2];
                self.colormap.map(value, self.styles[tri.mesh].clim)
            }
            None => self.surface_color,
        };
        let light = weights[0] * tri.intensity[0] + weights[1] * tri.intensity[1] + weights[2] * tri.intensity[2];
        [base[0] * light, base[1] * light, base[2] * light]
    }
}

fn bin_by_tile(triangles: &[ScreenTriangle], n_tiles: usize, height: usize) -> Vec<Vec<usize>> {
    let mut bins = vec![Vec::new(); n_tiles];
    for (t, tri) in triangles.iter().enumerate() {
        let lo = tri.y_range.0.max(0.0) as usize / TILE_ROWS;
        let hi = (tri.y_range.1.min(height as f64 - 1.0).max(0.0) as usize / TILE_ROWS).min(n_tiles.saturating_sub(1));
        for bin in &mut bins[lo.min(hi)..=hi] {
            bin.push(t);
        }
    }
    bins
}

fn downsample(color: &[[f64; 3]], width: usize, height: usize, ssaa: usize) -> RgbImage {
    let out_w = width / ssaa;
    let out_h = height / ssaa;
    let samples = (ssaa * ssaa) as f64;

    RgbImage::from_fn(out_w as u32, out_h as u32, |x, y| {
        let mut sum = [0.0; 3];
        for sy in 0..ssaa {
            let row = (y as usize * ssaa + sy) * width;
            for sx in 0..ssaa {
                let c = color[row + x as usize * ssaa + sx];
                sum[0] += c[0];
                sum[1] += c[1];
                sum[2] += c[2];
            }
        }
        Rgb(sum.map(|s| ((s / samples).clamp(0.0, 1.0) * 255.0).round() as u8))
    })
}

fn edge(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

fn mix(under: [f64; 3], over: [f64; 3], alpha: f64) -> [f64; 3] {
    [
        under[0] * (1.0 - alpha) + over[0] * alpha,
        under[1] * (1.0 - alpha) + over[1] * alpha,
        under[2] * (1.0 - alpha) + over[2] * alpha,
    ]
}

fn rgb_to_unit(c: [u8; 3]) -> [f64; 3] {
    c.map(|v| v as f64 / 255.0)
}

fn min3(v: [f64; 3]) -> f64 {
    v[0].min(v[1]).min(v[2])
}

fn max3(v: [f64; 3]) -> f64 {
    v[0].max(v[1]).max(v[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs_and_impls::SurfaceMesh;
    use nalgebra::{Point3, Vector3};

    fn settings() -> RenderConfig {
        RenderConfig { width: 64, height: 48, show_edges: false, ..Default::default() }
    }

    /// Square in the z = 0 plane seen from +z
    fn square() -> SurfaceMesh {
        SurfaceMesh::new(
            vec![
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(-1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    fn front_camera() -> Camera {
        Camera {
            position: Point3::new(0.0, 0.0, 10.0),
            focal_point: Point3::origin(),
            view_up: Vector3::y(),
            view_angle: 30.0,
        }
    }

    #[test]
    fn test_background_and_centre() {
        let settings = settings();
        let raster = Rasterizer::new(&settings, Colormap::jet64());
        let scene = [SceneMesh::new(square())
            .with_scalars(vec![0.4; 4], [0.0, 0.4])
            .unwrap()];
        let image = raster.render(&scene, &front_camera()).unwrap();

        assert_eq!(image.dimensions(), (64, 48));
        assert_eq!(image.get_pixel(0, 0), &Rgb([255, 255, 255]));
        // facing the headlight: full intensity, top colour of jet
        let centre = image.get_pixel(32, 24);
        assert_eq!(centre, &Rgb([128, 0, 0]));
    }

    #[test]
    fn test_nearer_mesh_wins() {
        let settings = settings();
        let raster = Rasterizer::new(&settings, Colormap::jet64());
        let mut near = square();
        for p in &mut near.points {
            p.z = 1.0;
        }
        let scene = [
            SceneMesh::new(square()).with_scalars(vec![0.0; 4], [0.0, 1.0]).unwrap(),
            SceneMesh::new(near).with_scalars(vec![1.0; 4], [0.0, 1.0]).unwrap(),
        ];
        let image = raster.render(&scene, &front_camera()).unwrap();
        assert_eq!(image.get_pixel(32, 24), &Rgb([128, 0, 0]));
    }

    #[test]
    fn test_translucent_blends_over_background() {
        let settings = settings();
        let raster = Rasterizer::new(&settings, Colormap::jet64());
        let scene = [SceneMesh::new(square())
            .with_scalars(vec![1.0; 4], [0.0, 1.0])
            .unwrap()
            .with_opacity(0.5)];
        let image = raster.render(&scene, &front_camera()).unwrap();
        // halfway between white and (0.5, 0, 0)
        assert_eq!(image.get_pixel(32, 24), &Rgb([191, 128, 128]));
    }

    #[test]
    fn test_empty_scene() {
        let settings = settings();
        let raster = Rasterizer::new(&settings, Colormap::jet64());
        let scene = [SceneMesh::new(SurfaceMesh::default())];
        assert!(matches!(raster.render(&scene, &front_camera()), Err(RenderError::EmptyScene)));
    }

    #[test]
    fn test_out_of_range_triangle_is_an_error() {
        let settings = settings();
        let raster = Rasterizer::new(&settings, Colormap::jet64());
        let mut broken = square();
        broken.triangles.push([0, 2, 9]);
        let scene = [SceneMesh::new(broken)];
        assert!(matches!(raster.render(&scene, &front_camera()), Err(RenderError::InvalidMesh(_))));
    }
}
