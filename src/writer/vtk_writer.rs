use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;
use vtkio::model::*; // import model definition of a VTK file

use crate::error::*;
use crate::structs_and_impls::MeshData;

/// Named scalar per mesh node, in `MeshData::nodes` order
pub struct PointScalars<'a> {
    pub name: &'a str,
    pub values: &'a [f64],
}

pub struct VtkWriter;

impl VtkWriter {
    /// Legacy ASCII `.vtk` unstructured grid
    pub fn write_vtk<P: AsRef<Path>>(
        mesh_data: &MeshData,
        point_data: Option<PointScalars>,
        output_path: P,
    ) -> Result<(), WriterError> {
        let vtk = Self::build(mesh_data, point_data, Version { major: 4, minor: 2 }, true)?;
        vtk.export_ascii(output_path.as_ref())?;
        debug!(file = %output_path.as_ref().display(), "wrote legacy vtk");
        Ok(())
    }

    /// XML `.vtu` unstructured grid
    pub fn write_vtu<P: AsRef<Path>>(
        mesh_data: &MeshData,
        point_data: Option<PointScalars>,
        output_path: P,
    ) -> Result<(), WriterError> {
        let mut vtu = Vec::new();
        Self::build(mesh_data, point_data, Version { major: 2, minor: 2 }, false)?.write_xml(&mut vtu)?;

        fs::write(output_path.as_ref(), &vtu)?;
        debug!(file = %output_path.as_ref().display(), bytes = vtu.len(), "wrote vtu");
        Ok(())
    }

    fn build(
        mesh_data: &MeshData,
        point_data: Option<PointScalars>,
        version: Version,
        legacy: bool,
    ) -> Result<Vtk, WriterError> {
        // 1. Points, always three components
        let points_data: Vec<f64> = mesh_data
            .nodes
            .iter()
            .flat_map(|node| {
                let p = node.position();
                [p.x, p.y, p.z]
            })
            .collect();

        // Connectivity refers to positions in the point list, not to node labels
        let index_of: HashMap<usize, u64> = mesh_data
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id, i as u64))
            .collect();

        // 2. Pre-calculate sizes
        let total_connectivity: usize = mesh_data.elements.iter().map(|e| e.nodes.len()).sum();
        let mut connectivity = Vec::with_capacity(total_connectivity);
        let mut offsets = Vec::with_capacity(mesh_data.elements.len());
        let mut cell_types = vec![CellType::Vertex; mesh_data.elements.len()];
        let mut current_offset = 0;

        // 3. Connectivity and offsets per element
        for element in &mesh_data.elements {
            for label in &element.nodes {
                let idx = index_of.get(label).ok_or_else(|| {
                    WriterError::InvalidData(format!(
                        "Element {} references undefined node {}",
                        element.id, label
                    ))
                })?;
                connectivity.push(*idx);
            }
            current_offset += element.nodes.len() as u64;
            offsets.push(current_offset);
        }

        // 4. Cell types per element section
        for group in &mesh_data.element_type_info {
            let vtk_type = group.element_type.eltype_vtk();
            let end = group.start_index + group.num_elements;
            if end > cell_types.len() {
                return Err(WriterError::InvalidData(format!(
                    "Element section {} ends at {} but only {} elements exist",
                    group.abaqus_name,
                    end,
                    cell_types.len()
                )));
            }
            for cell_type in &mut cell_types[group.start_index..end] {
                *cell_type = vtk_type;
            }
        }

        let mut attributes = Attributes::new();
        if let Some(scalars) = point_data {
            if scalars.values.len() != mesh_data.nodes.len() {
                return Err(WriterError::InvalidData(format!(
                    "{} has {} values for {} nodes",
                    scalars.name,
                    scalars.values.len(),
                    mesh_data.nodes.len()
                )));
            }
            attributes.point.push(
                Attribute::scalars(scalars.name, 1).with_data(IOBuffer::F64(scalars.values.to_vec())),
            );
        }

        let cell_verts = if legacy {
            let mut vertices = Vec::with_capacity(connectivity.len() + offsets.len());
            let mut begin = 0usize;
            for &end in &offsets {
                let end = end as usize;
                vertices.push((end - begin) as u32);
                vertices.extend(connectivity[begin..end].iter().map(|&i| i as u32));
                begin = end;
            }
            VertexNumbers::Legacy { num_cells: offsets.len() as u32, vertices }
        } else {
            VertexNumbers::XML { connectivity, offsets }
        };

        Ok(Vtk {
            version,
            title: String::from("fea2img"),
            byte_order: ByteOrder::LittleEndian,
            file_path: None,
            data: DataSet::inline(UnstructuredGridPiece {
                points: IOBuffer::F64(points_data),
                cells: Cells { cell_verts, types: cell_types },
                data: attributes,
            }),
        })
    }
}
