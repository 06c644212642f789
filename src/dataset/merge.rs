use std::path::Path;

use tracing::info;

use crate::error::*;
use crate::parser::abaqus::result_csv::{load_joined_result, JoinKind};
use crate::writer::csv_writer::CsvWriter;

/// Name of the value column in merged tables
pub const VALUE_COLUMN: &str = "Value";

/// Outer-join the nodes of `inp_file` with `value_column` of `result_file`
/// and write `Node,X,Y,Z,Value` to `output`. Returns the number of rows.
pub fn write_merged(
    inp_file: &Path,
    result_file: &Path,
    node_column: &str,
    value_column: &str,
    output: &Path,
) -> Result<usize, DatasetError> {
    let rows = load_joined_result(inp_file, result_file, node_column, value_column, JoinKind::Outer)?;
    CsvWriter::write_joined(&rows, VALUE_COLUMN, output)?;
    info!(file = %output.display(), rows = rows.len(), "wrote merged table");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_merged_table_keeps_every_node() {
        let dir = tempfile::tempdir().unwrap();
        let inp = dir.path().join("AORTA_FULL.inp");
        let csv = dir.path().join("AORTA_FULL.csv");
        fs::write(&inp, "*Node\n3, 1.5, 0., 0.\n1, 0., 0., 0.\n*Element, type=S3\n").unwrap();
        fs::write(&csv, "Node Label, S-Mises\n1, 0.25\n7, 0.5\n").unwrap();

        let out = dir.path().join("merged.csv");
        assert_eq!(write_merged(&inp, &csv, "Node Label", "S-Mises", &out).unwrap(), 3);
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "Node,X,Y,Z,Value\n1,0,0,0,0.25\n3,1.5,0,0,0\n7,0,0,0,0.5\n"
        );
    }
}
