use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

use crate::error::*;
use crate::structs_and_impls::*; // import Node, Element, ElementType, MeshData, SurfaceMesh

/// Counts and extent of a parsed deck, logged after parsing
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSummary {
    pub num_nodes: usize,
    pub num_elements: usize,
    pub element_types: Vec<(String, usize)>,    // (Abaqus name, count) per *Element section
    pub bounds: Option<(Point3<f64>, Point3<f64>)>,
}

/// Geometry routines on parsed meshes (surface extraction, normals, summaries)
pub struct GeometricAnalysis;

impl GeometricAnalysis {
    pub fn summary(mesh_data: &MeshData) -> MeshSummary {
        MeshSummary {
            num_nodes: mesh_data.nodes.len(),
            num_elements: mesh_data.elements.len(),
            element_types: mesh_data
                .element_type_info
                .iter()
                .map(|info| (info.abaqus_name.clone(), info.num_elements))
                .collect(),
            bounds: mesh_data.bounds(),
        }
    }

    /// Outer surface of a mesh as triangles.
    /// Shell elements are taken as they are; for volume elements only the faces that belong
    /// to exactly one element are kept. Polygons are fan-triangulated.
    pub fn extract_surface(mesh_data: &MeshData) -> Result<SurfaceMesh, ParseError> {
        // node label -> position in mesh_data.nodes
        let mut node_index: HashMap<usize, usize> = HashMap::with_capacity(mesh_data.nodes.len());
        for (idx, node) in mesh_data.nodes.iter().enumerate() {
            if node_index.insert(node.id, idx).is_some() {
                warn!(node = node.id, "duplicate node label, the last definition wins");
            }
        }

        let mut shell_faces: Vec<Vec<usize>> = Vec::new();
        let mut volume_faces: Vec<Vec<usize>> = Vec::new();    // in first-seen order
        let mut face_count: HashMap<Vec<usize>, (usize, usize)> = HashMap::new(); // key -> (count, position)

        for type_info in &mesh_data.element_type_info {
            let start_idx = type_info.start_index;
            let end_idx = start_idx + type_info.num_elements;
            let element_type = type_info.element_type;

            for element in &mesh_data.elements[start_idx..end_idx.min(mesh_data.elements.len())] {
                for local_face in element_type.faces() {
                    let face: Vec<usize> = local_face.iter().map(|&i| element.nodes[i]).collect();

                    if element_type.is_shell() {
                        shell_faces.push(face);
                        continue;
                    }

                    let mut key = face.clone();
                    key.sort_unstable();
                    match face_count.get_mut(&key) {
                        Some((count, _)) => *count += 1,
                        None => {
                            face_count.insert(key, (1, volume_faces.len()));
                            volume_faces.push(face);
                        }
                    }
                }
            }
        }

        let mut boundary: Vec<(usize, Vec<usize>)> = face_count
            .into_values()
            .filter(|(count, _)| *count == 1)
            .map(|(_, position)| (position, volume_faces[position].clone()))
            .collect();
        boundary.sort_by_key(|(position, _)| *position);

        let faces: Vec<Vec<usize>> = shell_faces
            .into_iter()
            .chain(boundary.into_iter().map(|(_, face)| face))
            .collect();

        // Keep only referenced nodes, in deck order
        let mut used = vec![false; mesh_data.nodes.len()];
        for face in &faces {
            for label in face {
                let idx = node_index.get(label).ok_or_else(|| {
                    ParseError::FormatError(format!("Element references undefined node {}", label))
                })?;
                used[*idx] = true;
            }
        }

        let mut point_of_node: HashMap<usize, usize> = HashMap::new();
        let mut points = Vec::new();
        let mut node_ids = Vec::new();
        for (idx, node) in mesh_data.nodes.iter().enumerate() {
            if used[idx] {
                point_of_node.insert(node.id, points.len());
                points.push(node.position());
                node_ids.push(Some(node.id));
            }
        }

        let mut triangles = Vec::new();
        for face in &faces {
            let ids: Vec<usize> = face.iter().map(|label| point_of_node[label]).collect();
            for k in 1..ids.len().saturating_sub(1) {
                triangles.push([ids[0], ids[k], ids[k + 1]]);
            }
        }

        debug!(points = points.len(), triangles = triangles.len(), "extracted surface");

        Ok(SurfaceMesh { points, triangles, node_ids })
    }

    /// Twice-area normal of a triangle (not normalised)
    pub fn face_normal(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Vector3<f64> {
        (b - a).cross(&(c - a))
    }

    pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
        0.5 * Self::face_normal(a, b, c).norm()
    }

    /// Area-weighted vertex normals for smooth shading
    pub fn vertex_normals(surface: &SurfaceMesh) -> Vec<Vector3<f64>> {
        let mut normals = vec![Vector3::zeros(); surface.n_points()];

        for tri in &surface.triangles {
            let n = Self::face_normal(
                &surface.points[tri[0]],
                &surface.points[tri[1]],
                &surface.points[tri[2]],
            );
            for &v in tri {
                normals[v] += n;
            }
        }

        normals
            .into_iter()
            .map(|n| n.try_normalize(1e-300).unwrap_or_else(Vector3::z))
            .collect()
    }
}
