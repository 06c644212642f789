use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::*;
use crate::parser::abaqus::result_csv::JoinedRow;

pub struct CsvWriter;

impl CsvWriter {
    /// Merged node table with the header `Node,X,Y,Z,<value_name>`
    pub fn write_joined<P: AsRef<Path>>(
        rows: &[JoinedRow],
        value_name: &str,
        output_path: P,
    ) -> Result<(), WriterError> {
        if value_name.contains([',', '"', '\n']) {
            return Err(WriterError::InvalidData(format!("Column name '{}' needs quoting", value_name)));
        }

        let mut out = BufWriter::new(File::create(output_path)?);
        writeln!(out, "Node,X,Y,Z,{}", value_name)?;
        for row in rows {
            let [x, y, z] = row.coordinates;
            writeln!(out, "{},{},{},{},{}", row.node, x, y, z, row.value)?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::abaqus::result_csv::ResultTable;

    #[test]
    fn test_header_and_rows() {
        let rows = vec![
            JoinedRow { node: 1, coordinates: [0.5, 0.0, -1.25], value: 0.125 },
            JoinedRow { node: 2, coordinates: [1.0, 2.0, 3.0], value: 0.0 },
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        CsvWriter::write_joined(&rows, "Value", &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Node,X,Y,Z,Value\n1,0.5,0,-1.25,0.125\n2,1,2,3,0\n");

        let table = ResultTable::parse_file(&path).unwrap();
        let values = table.node_values("Node", "Value").unwrap();
        assert_eq!(values[0], (Some(1), Some(0.125)));
    }

    #[test]
    fn test_rejects_unquotable_name() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CsvWriter::write_joined(&[], "a,b", dir.path().join("x.csv")).is_err());
    }
}
