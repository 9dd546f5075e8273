use crate::commands::{init, VaultCtx};
use crate::metadata::{PROPERTY_TREE, THUMBNAIL};
use crate::model::SourceFile;
use crate::owner::ConfigOwners;
use crate::store::memory::MemFs;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A fresh in-memory vault acting as `user`.
pub fn mem_ctx(user: &str) -> VaultCtx<MemFs> {
    let fs = MemFs::new();
    init::run(&fs).expect("failed to initialize vault");
    mem_ctx_on(&fs, user)
}

/// Another user on the same in-memory vault.
pub fn mem_ctx_on(fs: &MemFs, user: &str) -> VaultCtx<MemFs> {
    VaultCtx::new(
        fs.clone(),
        Some(user.to_string()),
        None,
        Box::new(ConfigOwners::default()),
        vec![".FCStd".to_string()],
    )
}

pub fn source(name: &str, bytes: &[u8]) -> SourceFile {
    SourceFile {
        name: name.to_string(),
        bytes: bytes.to_vec(),
    }
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in entries {
        writer.start_file(*name, options).expect("zip entry");
        writer.write_all(data).expect("zip write");
    }
    writer.finish().expect("zip finish").into_inner()
}

/// A FreeCAD document archive around `xml`, optionally with a thumbnail.
pub fn fcstd_bytes(xml: &str, thumbnail: bool) -> Vec<u8> {
    let png: &[u8] = b"\x89PNG\r\n\x1a\n";
    let mut entries: Vec<(&str, &[u8])> = vec![(PROPERTY_TREE, xml.as_bytes())];
    if thumbnail {
        entries.push((THUMBNAIL, png));
    }
    zip_bytes(&entries)
}

/// A minimal `Document.xml` with the usual document properties and `objects`
/// spliced into the object list.
pub fn document_xml(label: &str, objects: &str) -> String {
    format!(
        r#"<?xml version='1.0' encoding='utf-8'?>
<Document SchemaVersion="4" ProgramVersion="0.21R33771 (Git)" FileVersion="1">
    <Properties Count="9" TransientCount="0">
        <Property name="Comment" type="App::PropertyString"><String value="bracket for the frame"/></Property>
        <Property name="Company" type="App::PropertyString"><String value="Acme"/></Property>
        <Property name="CreatedBy" type="App::PropertyString"><String value="alice"/></Property>
        <Property name="CreationDate" type="App::PropertyString"><String value="2023-04-05T10:00:00Z"/></Property>
        <Property name="Id" type="App::PropertyString"><String value=""/></Property>
        <Property name="Label" type="App::PropertyString"><String value="{label}"/></Property>
        <Property name="LastModifiedBy" type="App::PropertyString"><String value="bob"/></Property>
        <Property name="LastModifiedDate" type="App::PropertyString"><String value="2023-04-06T09:30:00Z"/></Property>
        <Property name="Uid" type="App::PropertyUUID"><Uuid value="6f1c9a52-93a7-4c83-a0f4-0c8d1a5e2b11"/></Property>
    </Properties>
    <Objects Count="0">{objects}</Objects>
</Document>"#
    )
}
