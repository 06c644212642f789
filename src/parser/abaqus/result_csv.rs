use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::*;
use crate::structs_and_impls::*;

/// Result report exported from Abaqus/CAE as CSV: one header row, one row per node
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    pub columns: Vec<String>,           // Header names, leading blanks removed
    pub rows: Vec<Vec<String>>,         // Raw cells, one vector per data row
}

/// How mesh nodes and result rows are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,  // Only nodes present in both tables, mesh order
    Left,   // Every mesh node, mesh order
    Outer,  // Union of both, sorted by node label
}

/// One row of the merged table: Node, X, Y, Z, Value
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub node: usize,
    pub coordinates: [f64; 3],
    pub value: f64,
}

impl ResultTable {
    pub fn parse_file<P: AsRef<Path>>(filename: P) -> Result<ResultTable, ParseError> {
        let content = fs::read_to_string(filename.as_ref())?;
        let table = Self::parse_str(&content)?;
        debug!(
            file = %filename.as_ref().display(),
            columns = table.columns.len(),
            rows = table.rows.len(),
            "parsed result table"
        );
        Ok(table)
    }

    /// Parse CSV text. Blanks after a delimiter are skipped, quoted fields may hold commas.
    pub fn parse_str(content: &str) -> Result<ResultTable, ParseError> {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| ParseError::FormatError("Result table has no header row".to_string()))?;
        let columns: Vec<String> = Self::split_record(header)?
            .into_iter()
            .map(|c| c.trim_end().to_string())
            .collect();

        let mut rows = Vec::new();
        for line in lines {
            let mut cells = Self::split_record(line)?;
            // Short rows are padded like missing values, long rows are an error
            if cells.len() > columns.len() {
                return Err(ParseError::FormatError(format!(
                    "Row has {} fields but the header has {}: '{}'",
                    cells.len(),
                    columns.len(),
                    line
                )));
            }
            cells.resize(columns.len(), String::new());
            rows.push(cells);
        }

        Ok(ResultTable { columns, rows })
    }

    fn split_record(line: &str) -> Result<Vec<String>, ParseError> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut at_field_start = true;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                ' ' | '\t' if at_field_start && !in_quotes => {}    // skipinitialspace
                '"' if in_quotes => {
                    if chars.peek() == Some(&'"') {
                        field.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                }
                '"' if at_field_start => {
                    in_quotes = true;
                    at_field_start = false;
                }
                ',' if !in_quotes => {
                    fields.push(std::mem::take(&mut field));
                    at_field_start = true;
                }
                _ => {
                    field.push(c);
                    at_field_start = false;
                }
            }
        }

        if in_quotes {
            return Err(ParseError::FormatError(format!("Unterminated quote in '{}'", line)));
        }
        fields.push(field);
        Ok(fields)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, ParseError> {
        let wanted = name.trim();
        self.columns
            .iter()
            .position(|c| c.trim() == wanted)
            .ok_or_else(|| ParseError::MissingColumn(name.to_string()))
    }

    /// Node label and value per row. Cells that are not numbers become `None`.
    pub fn node_values(
        &self,
        node_column: &str,
        value_column: &str,
    ) -> Result<Vec<(Option<usize>, Option<f64>)>, ParseError> {
        let node_idx = self.column_index(node_column)?;
        let value_idx = self.column_index(value_column)?;

        Ok(self
            .rows
            .iter()
            .map(|row| {
                let node = coerce_number(&row[node_idx])
                    .filter(|v| *v >= 0.0 && v.fract() == 0.0)
                    .map(|v| v as usize);
                let value = coerce_number(&row[value_idx]);
                (node, value)
            })
            .collect())
    }
}

/// `pd.to_numeric(errors="coerce")` for a single cell
fn coerce_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Join mesh nodes with result values on the node label; unmatched values are 0.0
pub fn join_on_node(
    points: &PointCloud,
    values: &[(Option<usize>, Option<f64>)],
    kind: JoinKind,
) -> Vec<JoinedRow> {
    // First value wins for duplicated labels
    let mut lookup: HashMap<usize, f64> = HashMap::with_capacity(values.len());
    let mut duplicates = 0usize;
    for (node, value) in values {
        if let Some(node) = node {
            if lookup.contains_key(node) {
                duplicates += 1;
                continue;
            }
            lookup.insert(*node, value.unwrap_or(0.0));
        }
    }
    if duplicates > 0 {
        warn!(duplicates, "result table repeats node labels, keeping the first value");
    }

    let row_for = |node: &Node, value: f64| {
        let p = node.position();
        JoinedRow { node: node.id, coordinates: [p.x, p.y, p.z], value }
    };

    match kind {
        JoinKind::Inner => points
            .nodes
            .iter()
            .filter_map(|n| lookup.get(&n.id).map(|v| row_for(n, *v)))
            .collect(),
        JoinKind::Left => points
            .nodes
            .iter()
            .map(|n| row_for(n, lookup.get(&n.id).copied().unwrap_or(0.0)))
            .collect(),
        JoinKind::Outer => {
            let mut union: BTreeMap<usize, JoinedRow> = BTreeMap::new();
            for n in &points.nodes {
                union
                    .entry(n.id)
                    .or_insert_with(|| row_for(n, lookup.get(&n.id).copied().unwrap_or(0.0)));
            }
            for (node, value) in &lookup {
                union.entry(*node).or_insert(JoinedRow {
                    node: *node,
                    coordinates: [0.0; 3],
                    value: *value,
                });
            }
            union.into_values().collect()
        }
    }
}

/// Point cloud of `inp_file` joined with `value_column` of `result_file`
pub fn load_joined_result<P: AsRef<Path>, Q: AsRef<Path>>(
    inp_file: P,
    result_file: Q,
    node_column: &str,
    value_column: &str,
    kind: JoinKind,
) -> Result<Vec<JoinedRow>, ParseError> {
    let points = super::abaqus_inp::AbaqusInpParser::point_cloud_from_file(inp_file)?;
    let table = ResultTable::parse_file(result_file)?;
    let values = table.node_values(node_column, value_column)?;
    Ok(join_on_node(&points, &values, kind))
}
