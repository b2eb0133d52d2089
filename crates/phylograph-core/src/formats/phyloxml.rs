//! # PhyloXML Export
//!
//! Write-only codec from the ortholog tree view to PhyloXML.
//!
//! The root clade is named after the tree root, its children are ortholog
//! groups, and each gene leaf carries a display name and a
//! `taxonomy/scientific_name`. An empty forest is never written: `export`
//! returns `PLACEHOLDER_PHYLOXML` instead, so consumers always receive a
//! renderable tree.

use crate::graph::GraphStore;
use crate::tree::{TreeNode, export_tree};
use crate::PhyloError;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// The fixed document returned when a tree has no groups.
pub const PLACEHOLDER_PHYLOXML: &str = "<phyloxml><phylogeny rooted='true'><clade>\
<name>FallbackGene1</name><taxonomy><scientific_name>Arabidopsis thaliana</scientific_name></taxonomy>\
<clade><name>FallbackGene2</name><taxonomy><scientific_name>Oryza sativa</scientific_name></taxonomy></clade>\
</clade></phylogeny></phyloxml>";

/// Display label for a leaf: the last `/`-separated segment.
#[must_use]
pub fn display_label(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Write a tree as a PhyloXML document.
///
/// The tree is written as given, even when it has no groups.
pub fn write(tree: &TreeNode) -> Result<String, PhyloError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    let mut root = BytesStart::new("phyloxml");
    root.push_attribute(("xmlns", "http://www.phyloxml.org"));
    emit(&mut writer, Event::Start(root))?;
    let mut phylogeny = BytesStart::new("phylogeny");
    phylogeny.push_attribute(("rooted", "true"));
    emit(&mut writer, Event::Start(phylogeny))?;

    write_clade(&mut writer, tree, 0)?;

    emit(&mut writer, Event::End(BytesEnd::new("phylogeny")))?;
    emit(&mut writer, Event::End(BytesEnd::new("phyloxml")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| PhyloError::SerializationError(e.to_string()))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), PhyloError> {
    writer
        .write_event(event)
        .map_err(|e| PhyloError::SerializationError(e.to_string()))
}

fn text_element(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> Result<(), PhyloError> {
    emit(writer, Event::Start(BytesStart::new(tag)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(tag)))
}

/// Depth 0 is the root, depth 1 a group, anything deeper a gene leaf.
fn write_clade(writer: &mut Writer<Vec<u8>>, node: &TreeNode, depth: usize) -> Result<(), PhyloError> {
    emit(writer, Event::Start(BytesStart::new("clade")))?;

    let name = if depth >= 2 {
        display_label(&node.name)
    } else {
        node.name.as_str()
    };
    text_element(writer, "name", name)?;

    if let Some(species) = &node.species {
        emit(writer, Event::Start(BytesStart::new("taxonomy")))?;
        text_element(writer, "scientific_name", species)?;
        emit(writer, Event::End(BytesEnd::new("taxonomy")))?;
    }

    for child in &node.children {
        write_clade(writer, child, depth + 1)?;
    }

    emit(writer, Event::End(BytesEnd::new("clade")))
}

/// Export the ortholog tree of a graph as PhyloXML.
///
/// When the tree has no groups (no membership facts, or none for
/// `group_id`), the result is `PLACEHOLDER_PHYLOXML`.
pub fn export<G: GraphStore + ?Sized>(graph: &G, group_id: Option<&str>) -> Result<String, PhyloError> {
    let tree = export_tree(graph, group_id)?;
    if tree.children.is_empty() {
        return Ok(PLACEHOLDER_PHYLOXML.to_string());
    }
    write(&tree)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, species: &str) -> TreeNode {
        TreeNode {
            name: name.to_string(),
            species: Some(species.to_string()),
            children: Vec::new(),
        }
    }

    fn branch(name: &str, children: Vec<TreeNode>) -> TreeNode {
        TreeNode {
            name: name.to_string(),
            species: None,
            children,
        }
    }

    #[test]
    fn placeholder_is_exact() {
        assert_eq!(
            PLACEHOLDER_PHYLOXML,
            "<phyloxml><phylogeny rooted='true'><clade><name>FallbackGene1</name><taxonomy>\
<scientific_name>Arabidopsis thaliana</scientific_name></taxonomy><clade><name>FallbackGene2</name>\
<taxonomy><scientific_name>Oryza sativa</scientific_name></taxonomy></clade></clade></phylogeny></phyloxml>"
        );
    }

    #[test]
    fn display_label_is_last_segment() {
        assert_eq!(display_label("http://example.org/AT1G01010"), "AT1G01010");
        assert_eq!(display_label("Gene1"), "Gene1");
    }

    #[test]
    fn write_nests_groups_and_leaves() {
        let tree = branch(
            "GraphOrthologs",
            vec![branch(
                "G1",
                vec![
                    leaf("http://example.org/AT1G01010", "Arabidopsis thaliana"),
                    leaf("Os01g0100100", "Oryza sativa"),
                ],
            )],
        );
        let xml = write(&tree).expect("write");

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<phylogeny rooted=\"true\">"));
        assert!(xml.contains("<name>GraphOrthologs</name>"));
        assert!(xml.contains("<name>G1</name>"));
        assert!(xml.contains("<name>AT1G01010</name>"));
        assert!(xml.contains("<scientific_name>Oryza sativa</scientific_name>"));
        assert_eq!(xml.matches("<clade>").count(), 4);
        assert_eq!(xml.matches("</clade>").count(), 4);
    }

    #[test]
    fn names_are_escaped() {
        let tree = branch("GraphOrthologs", vec![branch("A&B", vec![leaf("g<1>", "S")])]);
        let xml = write(&tree).expect("write");
        assert!(xml.contains("<name>A&amp;B</name>"));
        assert!(xml.contains("<name>g&lt;1&gt;</name>"));
    }
}
