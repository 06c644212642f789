use std::path::Path;

use nalgebra::Point3;
use vtkio::model::{CellType, DataSet, IOBuffer, PolyDataPiece, UnstructuredGridPiece, VertexNumbers, Vtk};

use crate::error::*;
use crate::mesh_analysis::geometric_analysis::GeometricAnalysis;
use crate::structs_and_impls::{Element, ElementType, ElementTypeInfo, MeshData, Node, SurfaceMesh};

/// Legacy or XML VTK files holding polydata or an unstructured grid
pub struct VtkParser;

impl VtkParser {
    pub fn parse_file<P: AsRef<Path>>(filename: P) -> Result<SurfaceMesh, ParseError> {
        let path = filename.as_ref();
        let vtk = Vtk::import(path)?;
        Self::from_vtk(vtk, path.parent())
    }

    pub fn from_vtk(vtk: Vtk, source_dir: Option<&Path>) -> Result<SurfaceMesh, ParseError> {
        match vtk.data {
            DataSet::PolyData { pieces, .. } => {
                let mut surface = SurfaceMesh::default();
                for piece in pieces {
                    let piece = piece.into_loaded_piece_data(source_dir)?;
                    surface = surface.merge(&Self::from_polydata(piece)?);
                }
                Ok(surface)
            }
            DataSet::UnstructuredGrid { pieces, .. } => {
                let mut surface = SurfaceMesh::default();
                for piece in pieces {
                    let piece = piece.into_loaded_piece_data(source_dir)?;
                    surface = surface.merge(&Self::from_unstructured(piece)?);
                }
                Ok(surface)
            }
            _ => Err(ParseError::FormatError(
                "Only polydata and unstructured grids can be read as surfaces".to_string(),
            )),
        }
    }

    fn read_points(points: IOBuffer) -> Result<Vec<Point3<f64>>, ParseError> {
        let coords: Vec<f64> = points
            .cast_into::<f64>()
            .ok_or_else(|| ParseError::FormatError("Point coordinates are not numeric".to_string()))?;
        if coords.len() % 3 != 0 {
            return Err(ParseError::FormatError(format!(
                "Point buffer length {} is not a multiple of 3",
                coords.len()
            )));
        }
        Ok(coords.chunks_exact(3).map(|c| Point3::new(c[0], c[1], c[2])).collect())
    }

    /// Cell lists as vectors of point indices
    fn read_cells(cells: VertexNumbers) -> Result<Vec<Vec<usize>>, ParseError> {
        let (connectivity, offsets) = cells.into_xml();
        let mut result = Vec::with_capacity(offsets.len());
        let mut begin = 0usize;
        for end in offsets {
            let end = end as usize;
            if end < begin || end > connectivity.len() {
                return Err(ParseError::FormatError(format!("Bad cell offset {}", end)));
            }
            result.push(connectivity[begin..end].iter().map(|&i| i as usize).collect());
            begin = end;
        }
        Ok(result)
    }

    fn from_polydata(piece: PolyDataPiece) -> Result<SurfaceMesh, ParseError> {
        let points = Self::read_points(piece.points)?;
        let mut triangles = Vec::new();

        if let Some(polys) = piece.polys {
            for poly in Self::read_cells(polys)? {
                for k in 1..poly.len().saturating_sub(1) {
                    triangles.push([poly[0], poly[k], poly[k + 1]]);
                }
            }
        }
        if let Some(strips) = piece.strips {
            for strip in Self::read_cells(strips)? {
                for k in 0..strip.len().saturating_sub(2) {
                    // keep a consistent winding along the strip
                    if k % 2 == 0 {
                        triangles.push([strip[k], strip[k + 1], strip[k + 2]]);
                    } else {
                        triangles.push([strip[k + 1], strip[k], strip[k + 2]]);
                    }
                }
            }
        }

        check_indices(&triangles, points.len())?;
        Ok(SurfaceMesh::new(points, triangles))
    }

    /// Grids go through the same boundary extraction as Abaqus decks,
    /// with point indices standing in for node labels
    fn from_unstructured(piece: UnstructuredGridPiece) -> Result<SurfaceMesh, ParseError> {
        let points = Self::read_points(piece.points)?;
        let cells = Self::read_cells(piece.cells.cell_verts)?;
        if let Some(i) = cells.iter().flatten().find(|&&i| i >= points.len()) {
            return Err(ParseError::FormatError(format!(
                "Cell references point {} but only {} points exist",
                i,
                points.len()
            )));
        }

        let mut mesh_data = MeshData {
            dimension: 3,
            num_nodes: points.len(),
            nodes: points
                .iter()
                .enumerate()
                .map(|(i, p)| Node { id: i, coordinates: vec![p.x, p.y, p.z] })
                .collect(),
            ..Default::default()
        };

        let mut polygons: Vec<[usize; 3]> = Vec::new();
        for (cell, cell_type) in cells.into_iter().zip(piece.cells.types) {
            let element_type = match element_type_of(cell_type) {
                Some(t) => t,
                None => {
                    if cell_type == CellType::Polygon {
                        for k in 1..cell.len().saturating_sub(1) {
                            polygons.push([cell[0], cell[k], cell[k + 1]]);
                        }
                    }
                    continue; // vertices, lines and other cells without faces
                }
            };
            if cell.len() < element_type.corner_count() {
                return Err(ParseError::FormatError(format!(
                    "{:?} cell {} has {} points, expected at least {}",
                    cell_type,
                    mesh_data.elements.len(),
                    cell.len(),
                    element_type.corner_count()
                )));
            }

            // Consecutive cells of one type share a block, like an *Element section
            let same_block = mesh_data
                .element_type_info
                .last()
                .map(|info| info.element_type == element_type)
                .unwrap_or(false);
            if !same_block {
                mesh_data.element_type_info.push(ElementTypeInfo {
                    element_type,
                    abaqus_name: format!("{:?}", cell_type),
                    num_elements: 0,
                    start_index: mesh_data.elements.len(),
                    nodes_per_element: cell.len(),
                });
            }
            if let Some(info) = mesh_data.element_type_info.last_mut() {
                info.num_elements += 1;
            }
            let id = mesh_data.elements.len();
            mesh_data.elements.push(Element { id, nodes: cell });
        }
        mesh_data.num_eltypes = mesh_data.element_type_info.len();

        let mut surface = GeometricAnalysis::extract_surface(&mesh_data)?;
        // labels were point indices, not Abaqus node labels
        surface.node_ids = vec![None; surface.n_points()];

        if !polygons.is_empty() {
            check_indices(&polygons, points.len())?;
            let free = SurfaceMesh::new(points, polygons);
            surface = surface.merge(&free);
        }
        Ok(surface)
    }
}

fn element_type_of(cell_type: CellType) -> Option<ElementType> {
    Some(match cell_type {
        CellType::Triangle => ElementType::Triangle,
        CellType::QuadraticTriangle => ElementType::QuadraticTriangle,
        CellType::Quad => ElementType::Quad,
        CellType::QuadraticQuad => ElementType::QuadraticQuad,
        CellType::Tetra => ElementType::Tetra,
        CellType::QuadraticTetra => ElementType::QuadraticTetra,
        CellType::Pyramid => ElementType::Pyramid,
        CellType::Wedge => ElementType::Wedge,
        CellType::QuadraticWedge => ElementType::QuadraticWedge,
        CellType::Hexahedron => ElementType::Hexahedron,
        CellType::QuadraticHexahedron => ElementType::QuadraticHexahedron,
        _ => return None,
    })
}

fn check_indices(triangles: &[[usize; 3]], n_points: usize) -> Result<(), ParseError> {
    match triangles.iter().flatten().find(|&&i| i >= n_points) {
        Some(i) => Err(ParseError::FormatError(format!(
            "Cell references point {} but only {} points exist",
            i, n_points
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtkio::model::{Attributes, ByteOrder, Cells, Version};

    fn polydata(polys: VertexNumbers) -> Vtk {
        Vtk {
            version: Version { major: 4, minor: 2 },
            title: String::from("patch"),
            byte_order: ByteOrder::BigEndian,
            file_path: None,
            data: DataSet::inline(PolyDataPiece {
                points: IOBuffer::F64(vec![
                    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
                ]),
                polys: Some(polys),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_polydata_quad_is_fanned() {
        let vtk = polydata(VertexNumbers::Legacy { num_cells: 1, vertices: vec![4, 0, 1, 2, 3] });
        let surface = VtkParser::from_vtk(vtk, None).unwrap();
        assert_eq!(surface.n_points(), 4);
        assert_eq!(surface.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_polydata_bad_index() {
        let vtk = polydata(VertexNumbers::Legacy { num_cells: 1, vertices: vec![3, 0, 1, 7] });
        assert!(VtkParser::from_vtk(vtk, None).is_err());
    }

    #[test]
    fn test_unstructured_tetra_boundary() {
        let vtk = Vtk {
            version: Version { major: 4, minor: 2 },
            title: String::new(),
            byte_order: ByteOrder::BigEndian,
            file_path: None,
            data: DataSet::inline(UnstructuredGridPiece {
                points: IOBuffer::F64(vec![
                    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
                ]),
                cells: Cells {
                    cell_verts: VertexNumbers::XML { connectivity: vec![0, 1, 2, 3], offsets: vec![4] },
                    types: vec![CellType::Tetra],
                },
                data: Attributes::new(),
            }),
        };
        let surface = VtkParser::from_vtk(vtk, None).unwrap();
        assert_eq!(surface.n_triangles(), 4);
        assert!(surface.node_ids.iter().all(|id| id.is_none()));
    }

    #[test]
    fn test_short_cell_is_rejected() {
        let vtk = Vtk {
            version: Version { major: 4, minor: 2 },
            title: String::new(),
            byte_order: ByteOrder::BigEndian,
            file_path: None,
            data: DataSet::inline(UnstructuredGridPiece {
                points: IOBuffer::F64(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
                cells: Cells {
                    cell_verts: VertexNumbers::XML { connectivity: vec![0, 1, 2], offsets: vec![3] },
                    types: vec![CellType::Tetra],
                },
                data: Attributes::new(),
            }),
        };
        assert!(matches!(VtkParser::from_vtk(vtk, None), Err(ParseError::FormatError(_))));
    }
}
