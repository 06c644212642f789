use nalgebra::{Point3, Rotation3, Unit, Vector3};

/// Perspective camera with the semantics of a VTK camera.
/// `view_angle` is the vertical field of view in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f64>,
    pub focal_point: Point3<f64>,
    pub view_up: Vector3<f64>,
    pub view_angle: f64,
}

/// Camera-space coordinates of a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPoint {
    pub right: f64,
    pub up: f64,
    pub depth: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 1.0),
            focal_point: Point3::origin(),
            view_up: Vector3::y(),
            view_angle: 30.0,
        }
    }
}

impl Camera {
    /// Isometric view of `bounds`, far enough back for the bounding sphere to fit the view angle
    pub fn reset_to_bounds(bounds: (Point3<f64>, Point3<f64>), view_angle: f64) -> Camera {
        let (lo, hi) = bounds;
        let center = nalgebra::center(&lo, &hi);
        let mut radius = 0.5 * (hi - lo).norm();
        if radius <= 0.0 {
            radius = 1.0;
        }
        let distance = radius / (0.5 * view_angle).to_radians().sin();
        let direction = Vector3::new(1.0, 1.0, 1.0).normalize();

        Camera {
            position: center + direction * distance,
            focal_point: center,
            view_up: Vector3::z(),
            view_angle,
        }
    }

    /// Narrow the view angle by `factor`; the position stays
    pub fn zoom(&mut self, factor: f64) {
        if factor > 0.0 {
            self.view_angle /= factor;
        }
    }

    /// Look at `point` from the current position
    pub fn set_focal_point(&mut self, point: Point3<f64>) {
        self.focal_point = point;
    }

    /// Rotate the position about the focal point around the camera's right axis.
    /// Positive angles move the camera up.
    pub fn elevation(&mut self, degrees: f64) {
        let right = self.direction_of_projection().cross(&self.view_up);
        let axis = match Unit::try_new(-right, 1e-12) {
            Some(axis) => axis,
            None => return,     // looking along view_up
        };
        let rotation = Rotation3::from_axis_angle(&axis, degrees.to_radians());
        self.position = self.focal_point + rotation * (self.position - self.focal_point);
    }

    pub fn direction_of_projection(&self) -> Vector3<f64> {
        (self.focal_point - self.position)
            .try_normalize(1e-300)
            .unwrap_or_else(|| -Vector3::z())
    }

    /// Orthonormal (right, up, forward) basis; `view_up` is orthogonalised
    pub fn basis(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let forward = self.direction_of_projection();
        let right = forward
            .cross(&self.view_up)
            .try_normalize(1e-12)
            .unwrap_or_else(|| forward.cross(&Vector3::x()).normalize());
        let up = right.cross(&forward);
        (right, up, forward)
    }

    pub fn to_view(&self, point: &Point3<f64>, basis: &(Vector3<f64>, Vector3<f64>, Vector3<f64>)) -> ViewPoint {
        let d = point - self.position;
        ViewPoint {
            right: d.dot(&basis.0),
            up: d.dot(&basis.1),
            depth: d.dot(&basis.2),
        }
    }

    /// Pixel coordinates (x to the right, y downwards) of a view point on a `width` x `height` frame
    pub fn project(&self, view: &ViewPoint, width: f64, height: f64) -> (f64, f64) {
        let tan_half = (0.5 * self.view_angle).to_radians().tan();
        let aspect = width / height;
        let ndc_x = view.right / (view.depth * tan_half * aspect);
        let ndc_y = view.up / (view.depth * tan_half);
        ((ndc_x + 1.0) * 0.5 * width, (1.0 - ndc_y) * 0.5 * height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> (Point3<f64>, Point3<f64>) {
        (Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_reset_fits_bounding_sphere() {
        let camera = Camera::reset_to_bounds(unit_box(), 30.0);
        let radius = 3f64.sqrt();
        let expected = radius / 15f64.to_radians().sin();
        assert_relative_eq!((camera.position - camera.focal_point).norm(), expected, epsilon = 1e-9);
        assert_relative_eq!(camera.position.x, camera.position.z, epsilon = 1e-12);
        assert_eq!(camera.focal_point, Point3::origin());
    }

    #[test]
    fn test_zoom_and_focal_point() {
        let mut camera = Camera::reset_to_bounds(unit_box(), 30.0);
        let position = camera.position;
        camera.zoom(2.0);
        assert_relative_eq!(camera.view_angle, 15.0);
        camera.set_focal_point(Point3::new(0.0, 0.0, 20.0));
        assert_eq!(camera.position, position);
    }

    #[test]
    fn test_elevation_keeps_distance() {
        let mut camera = Camera {
            position: Point3::new(0.0, -10.0, 0.0),
            focal_point: Point3::origin(),
            view_up: Vector3::z(),
            view_angle: 30.0,
        };
        camera.elevation(90.0);
        assert_relative_eq!(camera.position.z, 10.0, epsilon = 1e-9);
        camera.elevation(-20.0);
        assert_relative_eq!((camera.position - camera.focal_point).norm(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_focal_point_projects_to_centre() {
        let camera = Camera::reset_to_bounds(unit_box(), 30.0);
        let basis = camera.basis();
        let view = camera.to_view(&camera.focal_point, &basis);
        let (x, y) = camera.project(&view, 1024.0, 768.0);
        assert_relative_eq!(x, 512.0, epsilon = 1e-9);
        assert_relative_eq!(y, 384.0, epsilon = 1e-9);
    }
}
