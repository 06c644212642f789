use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::*;
use crate::mesh_analysis::geometric_analysis::GeometricAnalysis;
use crate::structs_and_impls::SurfaceMesh;

pub struct StlWriter;

impl StlWriter {
    /// Binary STL: 80-byte header, triangle count, then 50 bytes per facet
    pub fn write_binary<P: AsRef<Path>>(surface: &SurfaceMesh, output_path: P) -> Result<(), WriterError> {
        let count = u32::try_from(surface.n_triangles())
            .map_err(|_| WriterError::InvalidData("Too many triangles for STL".to_string()))?;
        if let Some(i) = surface.triangles.iter().flatten().find(|&&i| i >= surface.n_points()) {
            return Err(WriterError::InvalidData(format!("Triangle references missing point {}", i)));
        }

        let mut out = BufWriter::new(File::create(output_path)?);

        let mut header = [0u8; 80];
        let title = b"binary STL written by fea2img";
        header[..title.len()].copy_from_slice(title);
        out.write_all(&header)?;
        out.write_all(&count.to_le_bytes())?;

        for tri in &surface.triangles {
            let [a, b, c] = tri.map(|i| surface.points[i]);
            let normal = GeometricAnalysis::face_normal(&a, &b, &c)
                .try_normalize(1e-300)
                .unwrap_or_else(nalgebra::Vector3::zeros);

            for v in [normal.x, normal.y, normal.z] {
                out.write_all(&(v as f32).to_le_bytes())?;
            }
            for p in [a, b, c] {
                for v in [p.x, p.y, p.z] {
                    out.write_all(&(v as f32).to_le_bytes())?;
                }
            }
            out.write_all(&0u16.to_le_bytes())?;
        }

        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::surface::stl::StlParser;
    use nalgebra::Point3;

    #[test]
    fn test_binary_layout_and_reread() {
        let surface = SurfaceMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AORTA.inp.stl");
        StlWriter::write_binary(&surface, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 84 + 2 * 50);

        let back = StlParser::parse_file(&path).unwrap();
        assert_eq!(back.n_points(), 4);
        assert_eq!(back.triangles, surface.triangles);
    }
}
