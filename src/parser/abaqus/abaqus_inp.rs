// Import standard library modules for file I/O operations
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::*;
use crate::structs_and_impls::*;

// Implementation block for ElementType enum - Abaqus naming lives next to the parser
impl ElementType {

    /// Convert Abaqus element type string to our internal ElementType enum
    /// Takes an Abaqus element name (like "C3D8", "S4R") and returns corresponding ElementType
    pub fn from_str_abaqus(s: &str) -> Option<ElementType> {
        let s = s.to_uppercase();

        // 1D elements (links, beams, trusses)
        if s.contains("C1D2") || s.starts_with("B31") || s.starts_with("T3D2") {
            return Some(ElementType::Line);
        } else if s.contains("C1D3") || s.starts_with("B32") || s.starts_with("T3D3") {
            return Some(ElementType::QuadraticEdge);
        }

        // Membranes, surface and rigid elements carry "3D" but are 2D facets
        else if s.starts_with("M3D") || s.starts_with("SFM3D") || s.starts_with("R3D") {
            let nodes = s.split("3D").nth(1).unwrap_or("");
            return match nodes.trim_end_matches(|c: char| c.is_ascii_alphabetic()) {
                "3" => Some(ElementType::Triangle),
                "4" => Some(ElementType::Quad),
                "6" => Some(ElementType::QuadraticTriangle),
                "8" | "9" => Some(ElementType::QuadraticQuad),
                _ => None,
            };
        }

        // Check 3D elements first to avoid substring conflicts with 2D elements
        // (e.g., "C3D4" contains "D4" but is a tetrahedron, not a membrane)
        else if s.contains("3D10") {   // 10-node quadratic tetrahedron
            return Some(ElementType::QuadraticTetra);
        } else if s.contains("3D15") { // 15-node quadratic wedge
            return Some(ElementType::QuadraticWedge);
        } else if s.contains("3D20") { // 20-node quadratic brick
            return Some(ElementType::QuadraticHexahedron);
        } else if s.contains("3D4") {  // 4-node linear tetrahedron
            return Some(ElementType::Tetra);
        } else if s.contains("3D5") {  // 5-node pyramid
            return Some(ElementType::Pyramid);
        } else if s.contains("3D6") {  // 6-node wedge
            return Some(ElementType::Wedge);
        } else if s.contains("3D8") {  // 8-node brick
            return Some(ElementType::Hexahedron);
        }

        // Shells and membranes: S=shell, M3D=membrane, R3D=rigid, SFM3D=surface
        else if s.starts_with("STRI65") || s.contains("S6") || s.contains("D6") {
            return Some(ElementType::QuadraticTriangle);
        } else if s.contains("S8") || s.contains("D8") || s.contains("D9") {
            return Some(ElementType::QuadraticQuad);
        } else if s.contains("S3") || s.contains("D3") || s.starts_with("STRI3") {
            return Some(ElementType::Triangle);
        } else if s.contains("S4") || s.contains("D4") {
            return Some(ElementType::Quad);
        }

        None
    }
}

// Public structure for the Abaqus INP file parser
pub struct AbaqusInpParser;

impl AbaqusInpParser {
    /// Main entry point for parsing an Abaqus .inp file
    pub fn parse_file<P: AsRef<Path>>(filename: P) -> Result<MeshData, ParseError> {
        let content = fs::read_to_string(filename.as_ref())?;
        let mesh = Self::parse_str(&content)?;
        debug!(
            file = %filename.as_ref().display(),
            nodes = mesh.num_nodes,
            elements = mesh.elements.len(),
            "parsed Abaqus deck"
        );
        Ok(mesh)
    }

    /// Parse the content of an Abaqus INP deck: every *Node and *Element section
    pub fn parse_str(content: &str) -> Result<MeshData, ParseError> {
        let mut mesh_data = MeshData {
            dimension: 3,                // Default to 3D (updated from the first node)
            ..Default::default()
        };

        let lines: Vec<&str> = content.lines().collect();
        let mut line_num = 0;

        // Main parsing loop - keyword lines start a section, data lines belong to it
        while line_num < lines.len() {
            let trimmed = lines[line_num].trim();
            line_num += 1;

            if trimmed.is_empty() || trimmed.starts_with("**") {
                continue;
            }

            match Self::keyword(trimmed).as_str() {
                "*NODE" => {
                    let (nodes, lines_consumed) = Self::parse_nodes(&lines[line_num..])?;
                    if mesh_data.nodes.is_empty() {
                        if let Some(first) = nodes.first() {
                            mesh_data.dimension = first.coordinates.len();
                        }
                    }
                    mesh_data.nodes.extend(nodes);
                    mesh_data.num_nodes = mesh_data.nodes.len();
                    line_num += lines_consumed;
                }
                "*ELEMENT" => {
                    let start_index = mesh_data.elements.len();  // Where this element type starts in elements array
                    let (elements, type_info, lines_consumed) = Self::parse_single_element_type(
                        &lines[line_num..],
                        trimmed,             // The *ELEMENT header line (contains type info)
                        start_index,
                    )?;
                    mesh_data.elements.extend(elements);
                    mesh_data.element_type_info.push(type_info);
                    mesh_data.num_eltypes = mesh_data.element_type_info.len();
                    line_num += lines_consumed;
                }
                // Ignore all other keywords (*Part, *Nset, *Material, ...)
                _ => {}
            }
        }

        Ok(mesh_data)
    }

    /// Node table of the first *Node section only (columns Node, X, Y, Z).
    /// Decks with one part per file keep the node labels unique this way.
    pub fn point_cloud(content: &str) -> Result<PointCloud, ParseError> {
        let lines: Vec<&str> = content.lines().collect();

        let start = lines
            .iter()
            .position(|line| Self::keyword(line.trim()) == "*NODE");

        match start {
            Some(idx) => {
                let (nodes, _) = Self::parse_nodes(&lines[idx + 1..])?;
                Ok(PointCloud { nodes })
            }
            None => Ok(PointCloud::default()),
        }
    }

    pub fn point_cloud_from_file<P: AsRef<Path>>(filename: P) -> Result<PointCloud, ParseError> {
        let content = fs::read_to_string(filename)?;
        Self::point_cloud(&content)
    }

    /// Upper-case keyword of a header line, without its parameters
    fn keyword(line: &str) -> String {
        if !line.starts_with('*') || line.starts_with("**") {
            return String::new();
        }
        line.split(',').next().unwrap_or("").trim().to_uppercase()
    }

    /// Parse node data lines until the next keyword.
    /// Returns the nodes and how many lines were consumed.
    fn parse_nodes(lines: &[&str]) -> Result<(Vec<Node>, usize), ParseError> {
        let mut nodes = Vec::new();
        let mut lines_consumed = 0;

        for line in lines {
            let trimmed = line.trim();

            if trimmed.starts_with('*') && !trimmed.starts_with("**") {
                break;
            }
            lines_consumed += 1;
            if trimmed.is_empty() || trimmed.starts_with("**") {
                continue;
            }

            // Split line by commas to get node ID and coordinates
            let parts: Vec<&str> = trimmed
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect();

            // Need at least node ID and one coordinate
            if parts.len() < 2 {
                return Err(ParseError::FormatError(format!("Malformed node line '{}'", trimmed)));
            }

            let node_id = parts[0].parse::<usize>().map_err(|e| {
                ParseError::NumberParseError(format!("Invalid node ID '{}': {}", parts[0], e))
            })?;

            let coordinates = parts[1..]
                .iter()
                .map(|s| s.parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| {
                    ParseError::NumberParseError(format!("Invalid coordinate in node {}: {}", node_id, e))
                })?;

            nodes.push(Node { id: node_id, coordinates });
        }

        Ok((nodes, lines_consumed))
    }

    /// Parse a single element type section (one *ELEMENT keyword).
    /// Data lines ending in a comma continue on the next line (C3D20 and friends).
    fn parse_single_element_type(
        lines: &[&str],
        header_line: &str,
        start_index: usize,
    ) -> Result<(Vec<Element>, ElementTypeInfo, usize), ParseError> {
        let abaqus_name = Self::extract_full_element_type_from_header(header_line)?;
        let element_type = ElementType::from_str_abaqus(&abaqus_name).ok_or_else(|| {
            ParseError::FormatError(format!("Unknown element type: {}", abaqus_name))
        })?;

        let mut elements = Vec::new();
        let mut lines_consumed = 0;
        let mut nodes_per_element = 0;
        let mut pending = String::new();     // Joined continuation lines

        for line in lines {
            let trimmed = line.trim();

            if trimmed.starts_with('*') && !trimmed.starts_with("**") {
                break;
            }
            lines_consumed += 1;
            if trimmed.is_empty() || trimmed.starts_with("**") {
                continue;
            }

            pending.push_str(trimmed);
            if trimmed.ends_with(',') {
                continue;                    // Record continues on the next line
            }

            let record = std::mem::take(&mut pending);
            let element = Self::parse_element_record(&record)?;

            // All elements of one section share the node count
            if nodes_per_element == 0 {
                nodes_per_element = element.nodes.len();
            } else if element.nodes.len() != nodes_per_element {
                return Err(ParseError::FormatError(format!(
                    "Element {} has {} nodes, expected {}",
                    element.id,
                    element.nodes.len(),
                    nodes_per_element
                )));
            }
            if element.nodes.len() < element_type.corner_count() {
                return Err(ParseError::FormatError(format!(
                    "Element {} of type {} has only {} nodes",
                    element.id,
                    abaqus_name,
                    element.nodes.len()
                )));
            }

            elements.push(element);
        }

        if !pending.is_empty() {
            return Err(ParseError::FormatError(format!(
                "Unterminated element record '{}'",
                pending
            )));
        }

        let type_info = ElementTypeInfo {
            element_type,
            abaqus_name,
            num_elements: elements.len(),
            start_index,
            nodes_per_element,
        };

        Ok((elements, type_info, lines_consumed))
    }

    fn parse_element_record(record: &str) -> Result<Element, ParseError> {
        let parts: Vec<&str> = record
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() < 2 {
            return Err(ParseError::FormatError(format!("Malformed element line '{}'", record)));
        }

        let id = parts[0].parse::<usize>().map_err(|e| {
            ParseError::NumberParseError(format!("Invalid element ID '{}': {}", parts[0], e))
        })?;

        let nodes = parts[1..]
            .iter()
            .map(|s| s.parse::<usize>())
            .collect::<Result<Vec<usize>, _>>()
            .map_err(|e| {
                ParseError::NumberParseError(format!("Invalid node ID in element {}: {}", id, e))
            })?;

        Ok(Element { id, nodes })
    }

    /// Extract the Abaqus element type name from the *ELEMENT header line
    /// Looks for "TYPE=" and extracts the element type that follows
    fn extract_full_element_type_from_header(header_line: &str) -> Result<String, ParseError> {
        let upper_line = header_line.to_uppercase();

        if let Some(type_start) = upper_line.find("TYPE=") {
            let type_part = &header_line[type_start + 5..];
            let full_type_name = type_part.split(',').next().unwrap_or("").trim();

            if full_type_name.is_empty() {
                return Err(ParseError::FormatError(format!(
                    "Empty element type in header: {}", header_line
                )));
            }

            Ok(full_type_name.to_string())
        } else {
            Err(ParseError::FormatError(format!(
                "Could not extract element type from header: {}", header_line
            )))
        }
    }
}

/// Extract one part block from a full deck.
/// Starts at the line beginning with `*Part, name=<part_name>` and stops before the first
/// `*End Part` line; an absent part yields an empty string.
pub fn extract_part(data: &str, part_name: &str) -> String {
    let start_line = format!("*Part, name={}", part_name);
    let end_line = "*End Part";

    let mut in_part = false;
    let mut part_data: Vec<&str> = Vec::new();

    for line in data.lines() {
        if line.starts_with(&start_line) {
            in_part = true;
        } else if in_part && line == end_line {
            break;
        }
        if in_part {
            part_data.push(line);
        }
    }

    part_data.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECK: &str = "\
*Heading
** generated
*Part, name=AORTA
*Node
      1,   0.0,   0.0,   0.0
      2,   1.0,   0.0,   0.0
      3,   1.0,   1.0,   0.0
      4,   0.0,   1.0,   0.0
*Element, type=S3R
1, 1, 2, 3
2, 1, 3, 4
*End Part
*Part, name=STENT
*Node
      1,   5.0,   5.0,   5.0
      2,   6.0,   5.0,   5.0
      3,   6.0,   6.0,   5.0
      4,   5.0,   5.0,   6.0
*Element, type=C3D4
1, 1, 2, 3, 4
*End Part
";

    #[test]
    fn test_parse_all_sections() {
        let mesh = AbaqusInpParser::parse_str(DECK).unwrap();
        assert_eq!(mesh.num_nodes, 8);
        assert_eq!(mesh.dimension, 3);
        assert_eq!(mesh.num_eltypes, 2);
        assert_eq!(mesh.element_type_info[0].element_type, ElementType::Triangle);
        assert_eq!(mesh.element_type_info[1].element_type, ElementType::Tetra);
        assert_eq!(mesh.element_type_info[1].start_index, 2);
        assert_eq!(mesh.elements[2].nodes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_point_cloud_reads_first_node_section_only() {
        let cloud = AbaqusInpParser::point_cloud(DECK).unwrap();
        assert_eq!(cloud.len(), 4);
        assert_eq!(cloud.nodes[2], Node { id: 3, coordinates: vec![1.0, 1.0, 0.0] });
    }

    #[test]
    fn test_point_cloud_without_nodes_is_empty() {
        let cloud = AbaqusInpParser::point_cloud("*Heading\n*Material, name=STEEL\n").unwrap();
        assert!(cloud.is_empty());
    }

    #[test]
    fn test_extract_part() {
        let stent = extract_part(DECK, "STENT");
        assert!(stent.starts_with("*Part, name=STENT"));
        assert!(!stent.contains("*End Part"));
        assert!(!stent.contains("AORTA"));
        assert_eq!(stent.lines().count(), 8);

        let stent_mesh = AbaqusInpParser::parse_str(&stent).unwrap();
        assert_eq!(stent_mesh.num_nodes, 4);
        assert_eq!(stent_mesh.elements.len(), 1);
    }

    #[test]
    fn test_extract_missing_part_is_empty() {
        assert_eq!(extract_part(DECK, "LEAFLET"), "");
    }

    #[test]
    fn test_continuation_lines() {
        let deck = "*Node\n1,0,0,0\n2,1,0,0\n3,0,1,0\n4,0,0,1\n*Element, type=C3D4\n1, 1, 2,\n 3, 4\n";
        let mesh = AbaqusInpParser::parse_str(deck).unwrap();
        assert_eq!(mesh.elements[0].nodes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_errors() {
        let bad_node = "*Node\n1, 0.0, abc, 0.0\n";
        assert!(matches!(
            AbaqusInpParser::parse_str(bad_node),
            Err(ParseError::NumberParseError(_))
        ));

        let bad_type = "*Node\n1,0,0,0\n*Element, type=XYZ99\n1, 1\n";
        assert!(matches!(
            AbaqusInpParser::parse_str(bad_type),
            Err(ParseError::FormatError(_))
        ));
    }

    #[test]
    fn test_abaqus_names() {
        assert_eq!(ElementType::from_str_abaqus("C3D8R"), Some(ElementType::Hexahedron));
        assert_eq!(ElementType::from_str_abaqus("C3D10M"), Some(ElementType::QuadraticTetra));
        assert_eq!(ElementType::from_str_abaqus("S4R"), Some(ElementType::Quad));
        assert_eq!(ElementType::from_str_abaqus("M3D3"), Some(ElementType::Triangle));
        assert_eq!(ElementType::from_str_abaqus("SFM3D4R"), Some(ElementType::Quad));
        assert_eq!(ElementType::from_str_abaqus("B31"), Some(ElementType::Line));
    }
}
