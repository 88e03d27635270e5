//! XML item layout: `<Items>` with `<Flower x=".." y=".." quantity=".."/>` and `<Paper .../>`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use super::items::{ItemLayout, ItemPlacement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    MissingAttribute,
    InvalidValue,
}

#[derive(Debug, Clone)]
pub struct LayoutError {
    pub code: LayoutErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

pub fn load_item_layout(path: &Path) -> Result<ItemLayout, LayoutError> {
    let raw = fs::read_to_string(path).map_err(|error| LayoutError {
        code: LayoutErrorCode::ReadFile,
        message: format!("failed to read layout: {error}"),
        file_path: path.to_path_buf(),
        location: None,
    })?;
    parse_item_layout(path, &raw)
}

pub fn parse_item_layout(file_path: &Path, raw: &str) -> Result<ItemLayout, LayoutError> {
    let doc = Document::parse(raw).map_err(|error| LayoutError {
        code: LayoutErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Items" {
        return Err(error_at_node(
            LayoutErrorCode::InvalidRoot,
            "root element must be <Items>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut layout = ItemLayout::empty();
    for child in root.children().filter(|node| node.is_element()) {
        let placements = match child.tag_name().name() {
            "Flower" => &mut layout.flowers,
            "Paper" => &mut layout.papers,
            other => {
                return Err(error_at_node(
                    LayoutErrorCode::UnknownElement,
                    format!("unsupported element <{other}>; expected <Flower> or <Paper>"),
                    file_path,
                    &doc,
                    child,
                ))
            }
        };
        placements.push(parse_placement(file_path, &doc, child)?);
    }

    Ok(layout)
}

fn parse_placement(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<ItemPlacement, LayoutError> {
    let x = required_attribute::<i32>(file_path, doc, node, "x")?;
    let y = required_attribute::<i32>(file_path, doc, node, "y")?;
    let quantity = required_attribute::<u32>(file_path, doc, node, "quantity")?;
    Ok(ItemPlacement::new(x, y, quantity))
}

fn required_attribute<T: std::str::FromStr>(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<T, LayoutError> {
    let Some(raw) = node.attribute(name) else {
        return Err(error_at_node(
            LayoutErrorCode::MissingAttribute,
            format!(
                "missing attribute '{name}' on <{}>",
                node.tag_name().name()
            ),
            file_path,
            doc,
            node,
        ));
    };
    raw.trim().parse::<T>().map_err(|_| {
        error_at_node(
            LayoutErrorCode::InvalidValue,
            format!("attribute '{name}' has invalid value '{raw}'"),
            file_path,
            doc,
            node,
        )
    })
}

fn error_at_node(
    code: LayoutErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> LayoutError {
    let pos = doc.text_pos_at(node.range().start);
    LayoutError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn parse(raw: &str) -> Result<ItemLayout, LayoutError> {
        parse_item_layout(Path::new("items.xml"), raw)
    }

    #[test]
    fn parses_flowers_and_papers_in_order() {
        let layout = parse(
            r#"<Items>
                <Flower x="1" y="2" quantity="3"/>
                <Paper x="4" y="5" quantity="6"/>
                <Flower x="7" y="8" quantity="9"/>
            </Items>"#,
        )
        .expect("layout");

        assert_eq!(
            layout.flowers,
            vec![ItemPlacement::new(1, 2, 3), ItemPlacement::new(7, 8, 9)]
        );
        assert_eq!(layout.papers, vec![ItemPlacement::new(4, 5, 6)]);
    }

    #[test]
    fn wrong_root_is_rejected() {
        let error = parse("<Defs/>").expect_err("must fail");
        assert_eq!(error.code, LayoutErrorCode::InvalidRoot);
    }

    #[test]
    fn unknown_element_reports_location() {
        let error = parse("<Items>\n  <Rock x=\"1\" y=\"1\" quantity=\"1\"/>\n</Items>")
            .expect_err("must fail");
        assert_eq!(error.code, LayoutErrorCode::UnknownElement);
        assert_eq!(error.location, Some(SourceLocation { line: 2, column: 3 }));
    }

    #[test]
    fn missing_and_invalid_attributes_are_rejected() {
        let missing = parse(r#"<Items><Flower x="1" y="1"/></Items>"#).expect_err("missing");
        assert_eq!(missing.code, LayoutErrorCode::MissingAttribute);

        let invalid =
            parse(r#"<Items><Paper x="1" y="1" quantity="-2"/></Items>"#).expect_err("invalid");
        assert_eq!(invalid.code, LayoutErrorCode::InvalidValue);
    }

    #[test]
    fn malformed_xml_is_rejected() {
        let error = parse("<Items><Flower></Items>").expect_err("must fail");
        assert_eq!(error.code, LayoutErrorCode::XmlMalformed);
        assert!(error.location.is_some());
    }

    #[test]
    fn loads_layout_from_disk() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("items.xml");
        fs::write(&path, r#"<Items><Paper x="0" y="0" quantity="1"/></Items>"#).expect("write");

        let layout = load_item_layout(&path).expect("layout");
        assert_eq!(layout.papers.len(), 1);

        let missing = load_item_layout(&temp.path().join("missing.xml")).expect_err("missing");
        assert_eq!(missing.code, LayoutErrorCode::ReadFile);
    }
}
