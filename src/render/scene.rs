use crate::error::*;
use crate::structs_and_impls::{RotationAxis, SurfaceMesh};

/// A surface with optional point scalars, as handed to the renderer
#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub surface: SurfaceMesh,
    pub scalars: Option<Vec<f64>>,      // One value per surface point
    pub clim: [f64; 2],
    pub opacity: f64,                   // 1.0 is opaque
}

impl SceneMesh {
    pub fn new(surface: SurfaceMesh) -> Self {
        Self { surface, scalars: None, clim: [0.0, 1.0], opacity: 1.0 }
    }

    pub fn with_scalars(mut self, scalars: Vec<f64>, clim: [f64; 2]) -> Result<Self, RenderError> {
        if scalars.len() != self.surface.n_points() {
            return Err(RenderError::ScalarLength {
                expected: self.surface.n_points(),
                got: scalars.len(),
            });
        }
        self.scalars = Some(scalars);
        self.clim = clim;
        Ok(self)
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn is_translucent(&self) -> bool {
        self.opacity < 1.0
    }

    pub fn rotate(&mut self, axis: RotationAxis, degrees: f64) {
        self.surface.rotate(axis, degrees);
    }

    /// Concatenate two meshes; a side without scalars contributes zeros
    pub fn merge(&self, other: &SceneMesh) -> SceneMesh {
        let scalars = if self.scalars.is_some() || other.scalars.is_some() {
            let side = |m: &SceneMesh| m.scalars.clone().unwrap_or_else(|| vec![0.0; m.surface.n_points()]);
            let mut values = side(self);
            values.extend(side(other));
            Some(values)
        } else {
            None
        };
        let clim = if self.scalars.is_some() || other.scalars.is_none() { self.clim } else { other.clim };

        SceneMesh {
            surface: self.surface.merge(&other.surface),
            scalars,
            clim,
            opacity: self.opacity.min(other.opacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn triangle() -> SurfaceMesh {
        SurfaceMesh::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_scalar_length_mismatch() {
        let result = SceneMesh::new(triangle()).with_scalars(vec![1.0], [0.0, 1.0]);
        assert!(matches!(result, Err(RenderError::ScalarLength { expected: 3, got: 1 })));
    }

    #[test]
    fn test_merge_zero_fills_plain_side() {
        let stent = SceneMesh::new(triangle());
        let aorta = SceneMesh::new(triangle()).with_scalars(vec![0.1, 0.2, 0.3], [0.0, 0.4]).unwrap();
        let merged = stent.merge(&aorta);
        assert_eq!(merged.scalars.unwrap(), vec![0.0, 0.0, 0.0, 0.1, 0.2, 0.3]);
        assert_eq!(merged.clim, [0.0, 0.4]);
        assert_eq!(merged.surface.triangles[1], [3, 4, 5]);
    }
}
