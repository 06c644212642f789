use std::f64::consts::PI;

use crate::structs_and_impls::SurfaceMesh;

use super::geometric_analysis::GeometricAnalysis;

pub struct Curvature;

impl Curvature {
    /// Discrete Gaussian curvature per vertex (angle deficit over a third of the incident area):
    /// K = (2π − Σθ) / (A / 3)
    pub fn gaussian(surface: &SurfaceMesh) -> Vec<f64> {
        let n = surface.n_points();
        let mut angle_sum = vec![0.0; n];
        let mut area_sum = vec![0.0; n];

        for tri in &surface.triangles {
            let p = [
                surface.points[tri[0]],
                surface.points[tri[1]],
                surface.points[tri[2]],
            ];
            let area = GeometricAnalysis::triangle_area(&p[0], &p[1], &p[2]);
            if area <= f64::EPSILON {
                continue;   // degenerate
            }

            for k in 0..3 {
                let e1 = p[(k + 1) % 3] - p[k];
                let e2 = p[(k + 2) % 3] - p[k];
                let cos = (e1.dot(&e2) / (e1.norm() * e2.norm())).clamp(-1.0, 1.0);
                angle_sum[tri[k]] += cos.acos();
                area_sum[tri[k]] += area;
            }
        }

        angle_sum
            .iter()
            .zip(&area_sum)
            .map(|(theta, area)| {
                if *area > 0.0 {
                    (2.0 * PI - theta) / (area / 3.0)
                } else {
                    0.0
                }
            })
            .collect()
    }
}
