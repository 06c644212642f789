use std::collections::HashMap;
use std::fs;
use std::path::Path;

use nalgebra::Point3;

use crate::error::*;
use crate::structs_and_impls::SurfaceMesh;

/// STL reader for both the ASCII and the binary flavour.
/// Coincident vertices are merged so that the surface is connected for shading and curvature.
pub struct StlParser;

impl StlParser {
    pub fn parse_file<P: AsRef<Path>>(filename: P) -> Result<SurfaceMesh, ParseError> {
        let bytes = fs::read(filename)?;
        Self::parse_bytes(&bytes)
    }

    pub fn parse_bytes(bytes: &[u8]) -> Result<SurfaceMesh, ParseError> {
        if Self::is_binary(bytes) {
            Self::parse_binary(bytes)
        } else {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| ParseError::FormatError(format!("STL is neither binary nor text: {}", e)))?;
            Self::parse_ascii(text)
        }
    }

    /// Binary files are recognised by their size; some exporters write "solid" into the header
    fn is_binary(bytes: &[u8]) -> bool {
        if bytes.len() < 84 {
            return false;
        }
        let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
        bytes.len() == 84 + count * 50
    }

    fn parse_binary(bytes: &[u8]) -> Result<SurfaceMesh, ParseError> {
        let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
        let mut builder = VertexMerger::default();

        for t in 0..count {
            let record = &bytes[84 + t * 50..84 + (t + 1) * 50];
            let mut tri = [0usize; 3];
            for (k, slot) in tri.iter_mut().enumerate() {
                // skip the 12-byte facet normal
                let base = 12 + k * 12;
                let f = |o: usize| {
                    f32::from_le_bytes([record[base + o], record[base + o + 1], record[base + o + 2], record[base + o + 3]])
                        as f64
                };
                *slot = builder.index_of(Point3::new(f(0), f(4), f(8)));
            }
            builder.triangles.push(tri);
        }

        Ok(builder.finish())
    }

    fn parse_ascii(text: &str) -> Result<SurfaceMesh, ParseError> {
        let mut builder = VertexMerger::default();
        let mut facet: Vec<usize> = Vec::with_capacity(3);

        for line in text.lines() {
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("vertex") => {
                    let c = tokens
                        .take(3)
                        .map(|t| t.parse::<f64>())
                        .collect::<Result<Vec<f64>, _>>()?;
                    if c.len() != 3 {
                        return Err(ParseError::FormatError(format!("Bad STL vertex '{}'", line.trim())));
                    }
                    facet.push(builder.index_of(Point3::new(c[0], c[1], c[2])));
                }
                Some("endloop") => {
                    for k in 1..facet.len().saturating_sub(1) {
                        builder.triangles.push([facet[0], facet[k], facet[k + 1]]);
                    }
                    facet.clear();
                }
                _ => {}
            }
        }

        Ok(builder.finish())
    }
}

#[derive(Default)]
struct VertexMerger {
    lookup: HashMap<[u64; 3], usize>,
    points: Vec<Point3<f64>>,
    triangles: Vec<[usize; 3]>,
}

impl VertexMerger {
    fn index_of(&mut self, p: Point3<f64>) -> usize {
        // +0.0 and -0.0 are the same vertex
        let key = [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()];
        let next = self.points.len();
        let idx = *self.lookup.entry(key).or_insert(next);
        if idx == next {
            self.points.push(p);
        }
        idx
    }

    fn finish(self) -> SurfaceMesh {
        SurfaceMesh::new(self.points, self.triangles)
    }
}
