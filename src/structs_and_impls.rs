use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Rotation3, Vector3};

use crate::error::*;

#[derive(Debug, Clone, PartialEq)]  // Clone is needed when a part is copied out of a full deck
pub struct Node {                   // Defines a structure to represent a mesh node/vertex
    pub id: usize,                  // Abaqus node label (1-based, as written in the file)
    pub coordinates: Vec<f64>,      // Spatial coordinates (x, y for 2D, x, y, z for 3D)
}

impl Node {
    /// Coordinates as a 3D point, missing components padded with zero
    pub fn position(&self) -> Point3<f64> {
        let c = |i: usize| self.coordinates.get(i).copied().unwrap_or(0.0);
        Point3::new(c(0), c(1), c(2))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {                // Defines a structure to represent a mesh element
    pub id: usize,                  // Abaqus element label
    pub nodes: Vec<usize>,          // Node labels forming this element
}

/// Element families the surface extraction understands.
/// Quadratic variants list their corner nodes first, so they share the
/// faces of their linear counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Line,
    QuadraticEdge,
    Triangle,
    QuadraticTriangle,
    Quad,
    QuadraticQuad,
    Tetra,
    QuadraticTetra,
    Pyramid,
    Wedge,
    QuadraticWedge,
    Hexahedron,
    QuadraticHexahedron,
}

impl ElementType {
    /// Number of corner nodes (the ones that define the faces)
    pub fn corner_count(&self) -> usize {
        match self {
            ElementType::Line | ElementType::QuadraticEdge => 2,
            ElementType::Triangle | ElementType::QuadraticTriangle => 3,
            ElementType::Quad | ElementType::QuadraticQuad => 4,
            ElementType::Tetra | ElementType::QuadraticTetra => 4,
            ElementType::Pyramid => 5,
            ElementType::Wedge | ElementType::QuadraticWedge => 6,
            ElementType::Hexahedron | ElementType::QuadraticHexahedron => 8,
        }
    }

    /// Shell (2D) elements are themselves part of the surface
    pub fn is_shell(&self) -> bool {
        matches!(
            self,
            ElementType::Triangle
                | ElementType::QuadraticTriangle
                | ElementType::Quad
                | ElementType::QuadraticQuad
        )
    }

    /// Faces as local corner indices. Lines have no faces.
    pub fn faces(&self) -> &'static [&'static [usize]] {
        match self {
            ElementType::Line | ElementType::QuadraticEdge => &[],
            ElementType::Triangle | ElementType::QuadraticTriangle => &[&[0, 1, 2]],
            ElementType::Quad | ElementType::QuadraticQuad => &[&[0, 1, 2, 3]],
            ElementType::Tetra | ElementType::QuadraticTetra => {
                &[&[0, 1, 2], &[0, 3, 1], &[1, 3, 2], &[2, 3, 0]]
            }
            ElementType::Pyramid => &[
                &[0, 1, 2, 3],
                &[0, 1, 4],
                &[1, 2, 4],
                &[2, 3, 4],
                &[3, 0, 4],
            ],
            ElementType::Wedge | ElementType::QuadraticWedge => &[
                &[0, 1, 2],
                &[3, 5, 4],
                &[0, 3, 4, 1],
                &[1, 4, 5, 2],
                &[2, 5, 3, 0],
            ],
            ElementType::Hexahedron | ElementType::QuadraticHexahedron => &[
                &[0, 1, 2, 3],
                &[4, 7, 6, 5],
                &[0, 4, 5, 1],
                &[1, 5, 6, 2],
                &[2, 6, 7, 3],
                &[3, 7, 4, 0],
            ],
        }
    }

    /// VTK cell type used by the mesh writers
    pub fn eltype_vtk(&self) -> vtkio::model::CellType {
        use vtkio::model::CellType;
        match self {
            ElementType::Line => CellType::Line,
            ElementType::QuadraticEdge => CellType::QuadraticEdge,
            ElementType::Triangle => CellType::Triangle,
            ElementType::QuadraticTriangle => CellType::QuadraticTriangle,
            ElementType::Quad => CellType::Quad,
            ElementType::QuadraticQuad => CellType::QuadraticQuad,
            ElementType::Tetra => CellType::Tetra,
            ElementType::QuadraticTetra => CellType::QuadraticTetra,
            ElementType::Pyramid => CellType::Pyramid,
            ElementType::Wedge => CellType::Wedge,
            ElementType::QuadraticWedge => CellType::QuadraticWedge,
            ElementType::Hexahedron => CellType::Hexahedron,
            ElementType::QuadraticHexahedron => CellType::QuadraticHexahedron,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {                               // Defines a structure to represent a mesh
    pub dimension: usize,                           // Spatial dimension (from the first node)
    pub num_nodes: usize,                           // Number of nodes over all *Node sections
    pub nodes: Vec<Node>,                           // All nodes with their coordinates
    pub num_eltypes: usize,                         // Number of *Element sections
    pub elements: Vec<Element>,                     // All elements with their connectivity
    pub element_type_info: Vec<ElementTypeInfo>,    // Information about each element section
}

#[derive(Debug, Clone)]
pub struct ElementTypeInfo {
    pub element_type: ElementType,                  // The actual element type enum
    pub abaqus_name: String,                        // Type name as written, e.g. "S3R" or "C3D8R"
    pub num_elements: usize,                        // Number of elements of this type
    pub start_index: usize,                         // Starting index in the main elements vector
    pub nodes_per_element: usize,                   // Nodes per element for this type
}

impl MeshData {
    /// Axis-aligned bounds of all nodes as (min, max)
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        bounds_of(self.nodes.iter().map(|n| n.position()))
    }
}

/// Node table of the first `*Node` section: columns Node, X, Y, Z
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub nodes: Vec<Node>,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Triangulated surface ready for rendering.
/// `node_ids[i]` is the Abaqus label of point `i` when the surface came from an `.inp` deck.
#[derive(Debug, Clone, Default)]
pub struct SurfaceMesh {
    pub points: Vec<Point3<f64>>,
    pub triangles: Vec<[usize; 3]>,
    pub node_ids: Vec<Option<usize>>,
}

impl SurfaceMesh {
    pub fn new(points: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> Self {
        let node_ids = vec![None; points.len()];
        Self { points, triangles, node_ids }
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn n_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        bounds_of(self.points.iter().copied())
    }

    /// Concatenate `other` after `self`; point indices of `other` are shifted
    pub fn merge(&self, other: &SurfaceMesh) -> SurfaceMesh {
        let offset = self.points.len();
        let mut merged = self.clone();
        merged.points.extend_from_slice(&other.points);
        merged.node_ids.extend_from_slice(&other.node_ids);
        merged.triangles.extend(
            other.triangles.iter().map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
        merged
    }

    /// Rotate in place about the origin by `degrees` around `axis`
    pub fn rotate(&mut self, axis: RotationAxis, degrees: f64) {
        let rotation = axis.rotation(degrees);
        for p in &mut self.points {
            *p = rotation * *p;
        }
    }
}

fn bounds_of<I: Iterator<Item = Point3<f64>>>(points: I) -> Option<(Point3<f64>, Point3<f64>)> {
    let mut result: Option<(Point3<f64>, Point3<f64>)> = None;
    for p in points {
        result = Some(match result {
            None => (p, p),
            Some((lo, hi)) => (
                Point3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Point3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            ),
        });
    }
    result
}

/// Axis of the rotating snapshot sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationAxis {
    X,
    Y,
    Z,
}

impl RotationAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationAxis::X => "x",
            RotationAxis::Y => "y",
            RotationAxis::Z => "z",
        }
    }

    pub fn unit(&self) -> Vector3<f64> {
        match self {
            RotationAxis::X => Vector3::x(),
            RotationAxis::Y => Vector3::y(),
            RotationAxis::Z => Vector3::z(),
        }
    }

    /// Right-handed rotation matrix for `degrees` around this axis
    pub fn rotation(&self, degrees: f64) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&nalgebra::Unit::new_unchecked(self.unit()), degrees.to_radians())
    }
}

impl FromStr for RotationAxis {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "x" => Ok(RotationAxis::X),
            "y" => Ok(RotationAxis::Y),
            "z" => Ok(RotationAxis::Z),
            other => Err(RenderError::InvalidAxis(other.to_string())),
        }
    }
}

impl fmt::Display for RotationAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometry transformation rendered into a dataset folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FieldKind {
    Raw,        // Plain geometry, no scalars
    Curvature,  // Gaussian curvature of the aorta surface
    Pressure,   // Contact pressure (CPRESS)
    Stress,     // von Mises stress (S-Mises)
}

impl FieldKind {
    /// Folder and point-data name, e.g. "Pressure"
    pub fn attribute_name(&self) -> &'static str {
        match self {
            FieldKind::Raw => "Raw",
            FieldKind::Curvature => "Curvature",
            FieldKind::Pressure => "Pressure",
            FieldKind::Stress => "Stress",
        }
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(FieldKind::Raw),
            "curvature" | "c" => Ok(FieldKind::Curvature),
            "pressure" | "cpress" | "p" => Ok(FieldKind::Pressure),
            "stress" | "s-mises" | "s" => Ok(FieldKind::Stress),
            other => Err(format!("unknown transformation '{}'", other)),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_name())
    }
}

/// Train or test half of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rotation_axis_parsing() {
        assert_eq!("x".parse::<RotationAxis>().unwrap(), RotationAxis::X);
        assert_eq!(" Z ".parse::<RotationAxis>().unwrap(), RotationAxis::Z);
        assert!(matches!("w".parse::<RotationAxis>(), Err(RenderError::InvalidAxis(_))));
    }

    #[test]
    fn test_rotate_about_origin() {
        let mut mesh = SurfaceMesh::new(vec![Point3::new(1.0, 0.0, 0.0)], vec![]);
        mesh.rotate(RotationAxis::Z, 90.0);
        assert_abs_diff_eq!(mesh.points[0].x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mesh.points[0].y, 1.0, epsilon = 1e-12);

        // rotate_x(90) maps +y onto +z
        let mut mesh = SurfaceMesh::new(vec![Point3::new(0.0, 1.0, 0.0)], vec![]);
        mesh.rotate(RotationAxis::X, 90.0);
        assert_abs_diff_eq!(mesh.points[0].z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_merge_shifts_triangle_indices() {
        let a = SurfaceMesh::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        );
        let merged = a.merge(&a);
        assert_eq!(merged.n_points(), 6);
        assert_eq!(merged.triangles[1], [3, 4, 5]);
        assert_eq!(merged.node_ids.len(), 6);
    }

    #[test]
    fn test_field_kind_names() {
        assert_eq!("S-Mises".parse::<FieldKind>().unwrap(), FieldKind::Stress);
        assert_eq!(FieldKind::Pressure.attribute_name(), "Pressure");
        assert_eq!("raw".parse::<FieldKind>().unwrap().to_string(), "Raw");
        assert!("mises".parse::<FieldKind>().is_err());
    }
}
