pub mod obj;
pub mod stl;
pub mod vtk;

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::*;
use crate::mesh_analysis::geometric_analysis::GeometricAnalysis;
use crate::parser::abaqus::abaqus_inp::AbaqusInpParser;
use crate::parser::abaqus::result_csv::JoinedRow;
use crate::structs_and_impls::SurfaceMesh;

use self::obj::ObjParser;
use self::stl::StlParser;
use self::vtk::VtkParser;

/// Coordinates closer than this are the same point when matching by position
const MATCH_TOLERANCE: f64 = 1e-3;

impl SurfaceMesh {
    /// Read a surface mesh, picking the reader from the file extension
    pub fn read<P: AsRef<Path>>(filename: P) -> Result<SurfaceMesh, ParseError> {
        let path = filename.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let surface = match extension.as_str() {
            "obj" => ObjParser::parse_file(path)?,
            "stl" => StlParser::parse_file(path)?,
            "vtk" | "vtu" | "vtp" => VtkParser::parse_file(path)?,
            "inp" => GeometricAnalysis::extract_surface(&AbaqusInpParser::parse_file(path)?)?,
            _ => return Err(ParseError::UnsupportedFormat(path.to_path_buf())),
        };

        debug!(
            file = %path.display(),
            points = surface.n_points(),
            triangles = surface.n_triangles(),
            "read surface"
        );
        Ok(surface)
    }

    /// One value per point from rows keyed by node label.
    ///
    /// Points with a known label are looked up by label. Unlabelled surfaces (STL, OBJ)
    /// take the value of the nearest row within `MATCH_TOLERANCE` of each point.
    /// Points without a match get 0.0.
    pub fn attach_node_values(&self, rows: &[JoinedRow]) -> Vec<f64> {
        if self.node_ids.iter().any(|id| id.is_some()) {
            let by_label: HashMap<usize, f64> = rows.iter().map(|r| (r.node, r.value)).rev().collect();
            return self
                .node_ids
                .iter()
                .map(|id| id.and_then(|id| by_label.get(&id).copied()).unwrap_or(0.0))
                .collect();
        }

        let grid = NodeGrid::new(rows);
        let mut unmatched = 0usize;
        let values: Vec<f64> = self
            .points
            .iter()
            .map(|p| match grid.nearest([p.x, p.y, p.z]) {
                Some(row) => row.value,
                None => {
                    unmatched += 1;
                    0.0
                }
            })
            .collect();
        if unmatched > 0 {
            warn!(unmatched, points = self.n_points(), "surface points without a node within tolerance");
        }
        values
    }
}

/// Rows bucketed on a grid of `MATCH_TOLERANCE` cells
struct NodeGrid<'a> {
    cells: HashMap<[i64; 3], Vec<&'a JoinedRow>>,
}

impl<'a> NodeGrid<'a> {
    fn new(rows: &'a [JoinedRow]) -> Self {
        let mut cells: HashMap<[i64; 3], Vec<&'a JoinedRow>> = HashMap::with_capacity(rows.len());
        for row in rows {
            cells.entry(Self::cell(row.coordinates)).or_default().push(row);
        }
        Self { cells }
    }

    fn cell(c: [f64; 3]) -> [i64; 3] {
        c.map(|x| (x / MATCH_TOLERANCE).floor() as i64)
    }

    /// Nearest row within the tolerance; a point and its node may sit in adjacent cells
    fn nearest(&self, p: [f64; 3]) -> Option<&'a JoinedRow> {
        let [cx, cy, cz] = Self::cell(p);
        let mut best: Option<(f64, &'a JoinedRow)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(rows) = self.cells.get(&[cx + dx, cy + dy, cz + dz]) else {
                        continue;
                    };
                    for &row in rows {
                        let d2: f64 = (0..3).map(|k| (row.coordinates[k] - p[k]).powi(2)).sum();
                        if d2 <= MATCH_TOLERANCE * MATCH_TOLERANCE && best.map_or(true, |(b, _)| d2 < b) {
                            best = Some((d2, row));
                        }
                    }
                }
            }
        }
        best.map(|(_, row)| row)
    }
}
