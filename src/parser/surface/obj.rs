use std::io::BufReader;
use std::path::Path;

use nalgebra::Point3;

use crate::error::*;
use crate::structs_and_impls::SurfaceMesh;

/// Wavefront OBJ reader; polygons are fanned into triangles and every object lands in one mesh
pub struct ObjParser;

impl ObjParser {
    fn load_options() -> tobj::LoadOptions {
        tobj::LoadOptions { triangulate: true, single_index: true, ..Default::default() }
    }

    pub fn parse_file<P: AsRef<Path>>(filename: P) -> Result<SurfaceMesh, ParseError> {
        // materials are not needed, a missing .mtl is fine
        let (models, _) = tobj::load_obj(filename.as_ref(), &Self::load_options())?;
        Ok(Self::to_surface(&models))
    }

    pub fn parse_str(content: &str) -> Result<SurfaceMesh, ParseError> {
        let mut reader = BufReader::new(content.as_bytes());
        let (models, _) =
            tobj::load_obj_buf(&mut reader, &Self::load_options(), |_| Err(tobj::LoadError::OpenFileFailed))?;
        Ok(Self::to_surface(&models))
    }

    fn to_surface(models: &[tobj::Model]) -> SurfaceMesh {
        let mut points = Vec::new();
        let mut triangles = Vec::new();

        for model in models {
            let mesh = &model.mesh;
            let offset = points.len();
            points.extend(
                mesh.positions
                    .chunks_exact(3)
                    .map(|p| Point3::new(p[0] as f64, p[1] as f64, p[2] as f64)),
            );
            triangles.extend(
                mesh.indices
                    .chunks_exact(3)
                    .map(|t| [offset + t[0] as usize, offset + t[1] as usize, offset + t[2] as usize]),
            );
        }

        SurfaceMesh::new(points, triangles)
    }
}
