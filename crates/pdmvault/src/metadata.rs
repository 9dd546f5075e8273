//! # Metadata Reader
//!
//! Reads descriptive properties out of a FreeCAD document without FreeCAD. A
//! `.FCStd` file is a zip archive; its `Document.xml` entry holds the property
//! tree and `thumbnails/Thumbnail.png` the optional preview.
//!
//! Assemblies are recognised by markers in the object graph:
//!
//! | Marker | Variant |
//! |---|---|
//! | `Property[@name='a2p_Version']/String` | [`DocumentVariant::A2plus`] |
//! | `Property[@name='Proxy']/Python[@module='freecad.asm3.assembly']` | [`DocumentVariant::Assembly3`] |
//! | `Property[@name='SolverId']/String[@value='Asm4EE']` | [`DocumentVariant::Assembly4`] |
//!
//! When several markers are present the later row of the table wins.

use crate::error::{Result, VaultError};
use crate::model::DocumentVariant;
use roxmltree::{Document, Node};
use serde::Serialize;
use std::io::{Cursor, Read};
use zip::ZipArchive;

pub const PROPERTY_TREE: &str = "Document.xml";
pub const THUMBNAIL: &str = "thumbnails/Thumbnail.png";

const ASM3_MODULE: &str = "freecad.asm3.assembly";
const ASM4_SOLVER: &str = "Asm4EE";

/// A document linked into an Assembly4 assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentLink {
    pub file: String,
    pub name: String,
    pub stamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentProperties {
    pub comment: Option<String>,
    pub company: Option<String>,
    pub created_by: Option<String>,
    pub creation_date: Option<String>,
    pub id: Option<String>,
    pub label: Option<String>,
    pub last_modified_by: Option<String>,
    pub last_modified_date: Option<String>,
    pub uid: Option<String>,
    /// Archive entry of the preview image, when the document has one.
    pub thumbnail: Option<String>,
    pub variant: DocumentVariant,
    /// Linked components; only filled in for Assembly4 documents.
    pub components: Vec<ComponentLink>,
}

pub fn inspect_bytes(bytes: &[u8]) -> Result<DocumentProperties> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| VaultError::CorruptDocument(format!("not a zip container: {}", e)))?;

    let mut xml = String::new();
    {
        let mut entry = archive.by_name(PROPERTY_TREE).map_err(|_| {
            VaultError::CorruptDocument(format!("{} missing from container", PROPERTY_TREE))
        })?;
        entry
            .read_to_string(&mut xml)
            .map_err(|e| VaultError::CorruptDocument(format!("unreadable {}: {}", PROPERTY_TREE, e)))?;
    }
    let thumbnail = archive.by_name(THUMBNAIL).is_ok().then(|| THUMBNAIL.to_string());

    let mut props = parse_property_tree(&xml)?;
    props.thumbnail = thumbnail;
    Ok(props)
}

/// Extracts properties and the assembly variant from a `Document.xml` body.
pub fn parse_property_tree(xml: &str) -> Result<DocumentProperties> {
    let doc = Document::parse(xml)
        .map_err(|e| VaultError::CorruptDocument(format!("bad property tree: {}", e)))?;

    let string_prop = |name: &str| property(&doc, name, "String").and_then(|n| attr(n, "value"));

    let variant = classify(&doc);
    let components = match variant {
        DocumentVariant::Assembly4 => linked_components(&doc),
        _ => Vec::new(),
    };

    Ok(DocumentProperties {
        comment: string_prop("Comment"),
        company: string_prop("Company"),
        created_by: string_prop("CreatedBy"),
        creation_date: string_prop("CreationDate"),
        id: string_prop("Id"),
        label: string_prop("Label"),
        last_modified_by: string_prop("LastModifiedBy"),
        last_modified_date: string_prop("LastModifiedDate"),
        uid: property(&doc, "Uid", "Uuid").and_then(|n| attr(n, "value")),
        thumbnail: None,
        variant,
        components,
    })
}

fn attr(node: Node, name: &str) -> Option<String> {
    node.attribute(name).map(str::to_string)
}

fn properties<'a, 'input: 'a>(
    doc: &'a Document<'input>,
    name: &'a str,
    child: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    doc.descendants()
        .filter(move |n| n.has_tag_name("Property") && n.attribute("name") == Some(name))
        .filter_map(move |p| p.children().find(|c| c.has_tag_name(child)))
}

/// First `Property[@name=name]/child` in document order.
fn property<'a, 'input: 'a>(
    doc: &'a Document<'input>,
    name: &'a str,
    child: &'a str,
) -> Option<Node<'a, 'input>> {
    properties(doc, name, child).next()
}

fn classify(doc: &Document) -> DocumentVariant {
    let asm4 = properties(doc, "SolverId", "String").any(|n| n.attribute("value") == Some(ASM4_SOLVER));
    if asm4 {
        return DocumentVariant::Assembly4;
    }
    let asm3 = properties(doc, "Proxy", "Python").any(|n| n.attribute("module") == Some(ASM3_MODULE));
    if asm3 {
        return DocumentVariant::Assembly3;
    }
    if property(doc, "a2p_Version", "String").is_some() {
        return DocumentVariant::A2plus;
    }
    DocumentVariant::Plain
}

/// External `XLink`s under `ObjectData`, in document order.
fn linked_components(doc: &Document) -> Vec<ComponentLink> {
    let Some(object_data) = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name("ObjectData"))
    else {
        return Vec::new();
    };

    object_data
        .descendants()
        .filter(|n| n.has_tag_name("Property") && n.attribute("name") == Some("LinkedObject"))
        .flat_map(|p| p.children().filter(|c| c.has_tag_name("XLink")))
        .filter_map(|link| {
            let file = link.attribute("file").filter(|f| !f.is_empty())?;
            Some(ComponentLink {
                file: file.to_string(),
                name: link.attribute("name").unwrap_or_default().to_string(),
                stamp: link.attribute("stamp").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{document_xml, fcstd_bytes};

    #[test]
    fn reads_document_properties() {
        let xml = document_xml("Bracket", "");
        let props = inspect_bytes(&fcstd_bytes(&xml, false)).unwrap();

        assert_eq!(props.label.as_deref(), Some("Bracket"));
        assert_eq!(props.created_by.as_deref(), Some("alice"));
        assert_eq!(props.company.as_deref(), Some("Acme"));
        assert_eq!(
            props.uid.as_deref(),
            Some("6f1c9a52-93a7-4c83-a0f4-0c8d1a5e2b11")
        );
        assert_eq!(props.variant, DocumentVariant::Plain);
        assert_eq!(props.thumbnail, None);
        assert!(props.components.is_empty());
    }

    #[test]
    fn reports_thumbnail_when_present() {
        let props = inspect_bytes(&fcstd_bytes(&document_xml("P", ""), true)).unwrap();
        assert_eq!(props.thumbnail.as_deref(), Some(THUMBNAIL));
    }

    #[test]
    fn detects_a2plus() {
        let objects = r#"<Object name="a"><Properties>
            <Property name="a2p_Version" type="App::PropertyString"><String value="0.4"/></Property>
        </Properties></Object>"#;
        let props = parse_property_tree(&document_xml("Assy", objects)).unwrap();
        assert_eq!(props.variant, DocumentVariant::A2plus);
    }

    #[test]
    fn detects_assembly3() {
        let objects = r#"<Object name="a"><Properties>
            <Property name="Proxy" type="App::PropertyPythonObject"><Python value="" module="freecad.asm3.assembly"/></Property>
        </Properties></Object>"#;
        let props = parse_property_tree(&document_xml("Assy", objects)).unwrap();
        assert_eq!(props.variant, DocumentVariant::Assembly3);
    }

    #[test]
    fn other_python_proxies_are_plain() {
        let objects = r#"<Object name="a"><Properties>
            <Property name="Proxy" type="App::PropertyPythonObject"><Python value="" module="Draft"/></Property>
        </Properties></Object>"#;
        let props = parse_property_tree(&document_xml("Part", objects)).unwrap();
        assert_eq!(props.variant, DocumentVariant::Plain);
    }

    #[test]
    fn assembly4_wins_and_lists_components() {
        let objects = r#"<Object name="Model"><Properties>
            <Property name="a2p_Version" type="App::PropertyString"><String value="0.4"/></Property>
            <Property name="SolverId" type="App::PropertyString"><String value="Asm4EE"/></Property>
        </Properties></Object>"#;
        let object_data = r#"<ObjectData Count="2">
            <Object name="Link"><Properties>
                <Property name="LinkedObject" type="App::PropertyXLink">
                    <XLink file="bolt.FCStd" stamp="2023-05-01T10:00:00Z" name="Body"/>
                </Property>
            </Properties></Object>
            <Object name="Local"><Properties>
                <Property name="LinkedObject" type="App::PropertyXLink"><XLink name="Sketch"/></Property>
            </Properties></Object>
        </ObjectData>"#;
        let xml = document_xml("Assy", objects).replace("</Document>", &format!("{object_data}</Document>"));

        let props = parse_property_tree(&xml).unwrap();
        assert_eq!(props.variant, DocumentVariant::Assembly4);
        assert_eq!(
            props.components,
            vec![ComponentLink {
                file: "bolt.FCStd".to_string(),
                name: "Body".to_string(),
                stamp: "2023-05-01T10:00:00Z".to_string(),
            }]
        );
    }

    #[test]
    fn non_zip_is_corrupt() {
        assert!(matches!(
            inspect_bytes(b"plain text, not a document"),
            Err(VaultError::CorruptDocument(_))
        ));
    }

    #[test]
    fn zip_without_property_tree_is_corrupt() {
        let bytes = crate::test_utils::zip_bytes(&[("readme.txt", b"hi".as_slice())]);
        assert!(matches!(
            inspect_bytes(&bytes),
            Err(VaultError::CorruptDocument(msg)) if msg.contains(PROPERTY_TREE)
        ));
    }

    #[test]
    fn malformed_xml_is_corrupt() {
        let bytes = crate::test_utils::zip_bytes(&[(PROPERTY_TREE, b"<Document><Properties>".as_slice())]);
        assert!(matches!(
            inspect_bytes(&bytes),
            Err(VaultError::CorruptDocument(_))
        ));
    }
}
