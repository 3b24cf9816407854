//! Workbook container access
//!
//! A `.xlsx` file is a zip archive of XML parts. [`PackageSource`] abstracts
//! the archive so tests can feed parts from memory, and [`Workbook`] resolves
//! the sheet list, shared strings and styles once per extraction.

use crate::error::{MixerError, MixerResult};
use crate::excel::sheet::read_sheet_part;
use crate::excel::styles::{resolve_shared_strings, resolve_styles, StyleTable};
use crate::excel::xml;
use crate::types::SheetGrid;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
pub const STYLES_PART: &str = "xl/styles.xml";

/// Read access to the parts of an Office Open XML package
pub trait PackageSource {
    /// Text of the entry at `path`, or None when the archive has no such entry
    fn read_entry(&mut self, path: &str) -> MixerResult<Option<String>>;
}

//==============================================================================
// Zip-backed package
//==============================================================================

/// Package read from a zip archive
pub struct ZipPackage<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl ZipPackage<BufReader<File>> {
    /// Open a workbook file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> MixerResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl ZipPackage<Cursor<Vec<u8>>> {
    /// Wrap workbook bytes already in memory (uploads, tests)
    pub fn from_bytes(bytes: Vec<u8>) -> MixerResult<Self> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ZipPackage<R> {
    pub fn new(reader: R) -> MixerResult<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }
}

impl<R: Read + Seek> PackageSource for ZipPackage<R> {
    fn read_entry(&mut self, path: &str) -> MixerResult<Option<String>> {
        let mut entry = match self.archive.by_name(path) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

//==============================================================================
// In-memory package
//==============================================================================

/// Package held as a path → text map
#[derive(Debug, Clone, Default)]
pub struct MemoryPackage {
    entries: HashMap<String, String>,
}

impl MemoryPackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.entries.insert(path.into(), content.into());
    }

    /// Builder form of [`MemoryPackage::insert`]
    pub fn with_entry(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }
}

impl PackageSource for MemoryPackage {
    fn read_entry(&mut self, path: &str) -> MixerResult<Option<String>> {
        Ok(self.entries.get(path).cloned())
    }
}

//==============================================================================
// Relationships and paths
//==============================================================================

/// One `<Relationship>` of a `.rels` part
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    /// True when the relationship type URI ends in `/<kind>`
    pub fn is_kind(&self, kind: &str) -> bool {
        self.rel_type
            .rsplit('/')
            .next()
            .is_some_and(|last| last.eq_ignore_ascii_case(kind))
    }
}

/// Parse a `.rels` part
pub fn parse_relationships(part: &str, xml_text: &str) -> MixerResult<Vec<Relationship>> {
    let mut reader = xml::reader(xml_text);
    let mut buf = Vec::new();
    let mut rels = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (xml::attr(e, b"Id"), xml::attr(e, b"Target")) {
                    rels.push(Relationship {
                        id,
                        rel_type: xml::attr(e, b"Type").unwrap_or_default(),
                        target,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(MixerError::xml(part, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Resolve a relationship target against the directory of its source part
///
/// Absolute targets (`/xl/tables/table1.xml`) are package-rooted; `..` and `.`
/// segments are folded.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let relative = match target.strip_prefix('/') {
        Some(absolute) => absolute,
        None => {
            segments.extend(base_dir.split('/').filter(|s| !s.is_empty()));
            target
        }
    };
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Directory part of a package path (`xl/worksheets/sheet1.xml` → `xl/worksheets`)
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Relationship part of a package path (`xl/worksheets/_rels/sheet1.xml.rels`)
pub fn rels_path_for(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", path),
    }
}

//==============================================================================
// Workbook
//==============================================================================

/// A sheet listed in `xl/workbook.xml`, with its resolved part path
#[derive(Debug, Clone, PartialEq)]
pub struct SheetEntry {
    pub name: String,
    pub path: String,
}

/// Opened workbook: sheet list plus the shared lookups every sheet needs
pub struct Workbook<S: PackageSource> {
    source: S,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    styles: StyleTable,
}

impl<S: PackageSource> Workbook<S> {
    /// Read the workbook descriptor and its relationships
    ///
    /// Both parts are required. Shared strings and styles are optional.
    pub fn open(mut source: S) -> MixerResult<Self> {
        let workbook_xml = require(&mut source, WORKBOOK_PART)?;
        let rels_xml = require(&mut source, WORKBOOK_RELS_PART)?;

        let rels = parse_relationships(WORKBOOK_RELS_PART, &rels_xml)?;
        let targets: HashMap<&str, &str> = rels
            .iter()
            .map(|r| (r.id.as_str(), r.target.as_str()))
            .collect();

        let mut sheets = Vec::new();
        for (name, rel_id) in parse_sheet_list(&workbook_xml)? {
            match targets.get(rel_id.as_str()) {
                Some(target) => sheets.push(SheetEntry {
                    name,
                    path: resolve_target("xl", target),
                }),
                None => debug!(sheet = %name, rel_id = %rel_id, "sheet has no relationship target"),
            }
        }

        let shared_strings = match source.read_entry(SHARED_STRINGS_PART)? {
            Some(text) => resolve_shared_strings(&text)?,
            None => Vec::new(),
        };
        let styles = match source.read_entry(STYLES_PART)? {
            Some(text) => resolve_styles(&text)?,
            None => StyleTable::default(),
        };

        debug!(
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            "workbook opened"
        );

        Ok(Self {
            source,
            sheets,
            shared_strings,
            styles,
        })
    }

    pub fn sheets(&self) -> &[SheetEntry] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn shared_strings(&self) -> &[String] {
        &self.shared_strings
    }

    /// Raw text of any package part
    pub fn read_part(&mut self, path: &str) -> MixerResult<Option<String>> {
        self.source.read_entry(path)
    }

    /// Relationships declared by a sheet; an absent `.rels` part means none
    pub fn sheet_relationships(&mut self, sheet: &SheetEntry) -> MixerResult<Vec<Relationship>> {
        let rels_path = rels_path_for(&sheet.path);
        match self.source.read_entry(&rels_path)? {
            Some(text) => parse_relationships(&rels_path, &text),
            None => Ok(Vec::new()),
        }
    }

    /// Parse a sheet into its cell grid
    pub fn sheet_grid(&mut self, sheet: &SheetEntry) -> MixerResult<SheetGrid> {
        let text = require(&mut self.source, &sheet.path)?;
        read_sheet_part(&sheet.path, &text, &self.shared_strings, &self.styles)
    }
}

fn require<S: PackageSource>(source: &mut S, path: &str) -> MixerResult<String> {
    source
        .read_entry(path)?
        .ok_or_else(|| MixerError::MissingEntry(path.to_string()))
}

/// `(name, r:id)` of every `<sheet>` in workbook order
fn parse_sheet_list(xml_text: &str) -> MixerResult<Vec<(String, String)>> {
    let mut reader = xml::reader(xml_text);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"sheet" =>
            {
                if let (Some(name), Some(id)) = (xml::attr(e, b"name"), xml::attr(e, b"id")) {
                    sheets.push((name, id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(MixerError::xml(WORKBOOK_PART, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const WORKBOOK: &str = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Formula" sheetId="1" r:id="rId1"/><sheet name="Comida" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

    const WORKBOOK_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl", "/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(
            resolve_target("xl/worksheets", "../tables/table1.xml"),
            "xl/tables/table1.xml"
        );
        assert_eq!(resolve_target("xl/worksheets", "./x.xml"), "xl/worksheets/x.xml");
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(
            rels_path_for("xl/worksheets/sheet3.xml"),
            "xl/worksheets/_rels/sheet3.xml.rels"
        );
        assert_eq!(parent_dir("xl/worksheets/sheet3.xml"), "xl/worksheets");
    }

    #[test]
    fn test_relationship_kind() {
        let rels = parse_relationships("rels", WORKBOOK_RELS).unwrap();
        assert_eq!(rels.len(), 2);
        assert!(rels[0].is_kind("worksheet"));
        assert!(!rels[0].is_kind("table"));
    }

    #[test]
    fn test_open_resolves_sheet_paths() {
        let pkg = MemoryPackage::new()
            .with_entry(WORKBOOK_PART, WORKBOOK)
            .with_entry(WORKBOOK_RELS_PART, WORKBOOK_RELS);
        let wb = Workbook::open(pkg).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Formula", "Comida"]);
        assert_eq!(wb.sheets()[1].path, "xl/worksheets/sheet2.xml");
        assert!(wb.shared_strings().is_empty());
    }

    #[test]
    fn test_open_requires_descriptor_parts() {
        let pkg = MemoryPackage::new().with_entry(WORKBOOK_PART, WORKBOOK);
        match Workbook::open(pkg) {
            Err(MixerError::MissingEntry(path)) => assert_eq!(path, WORKBOOK_RELS_PART),
            other => panic!("expected missing entry, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_missing_sheet_part_is_reported() {
        let pkg = MemoryPackage::new()
            .with_entry(WORKBOOK_PART, WORKBOOK)
            .with_entry(WORKBOOK_RELS_PART, WORKBOOK_RELS);
        let mut wb = Workbook::open(pkg).unwrap();
        let sheet = wb.sheets()[0].clone();
        assert!(wb.sheet_relationships(&sheet).unwrap().is_empty());
        assert!(matches!(wb.sheet_grid(&sheet), Err(MixerError::MissingEntry(_))));
    }

    #[test]
    fn test_zip_package_reads_entries() {
        let mut bytes = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut bytes));
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file(WORKBOOK_PART, options).unwrap();
            writer.write_all(WORKBOOK.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        let mut pkg = ZipPackage::from_bytes(bytes).unwrap();
        assert!(pkg.read_entry(WORKBOOK_PART).unwrap().unwrap().contains("Comida"));
        assert!(pkg.read_entry("xl/missing.xml").unwrap().is_none());
    }

    #[test]
    fn test_zip_package_rejects_garbage() {
        assert!(matches!(
            ZipPackage::from_bytes(b"not a zip".to_vec()),
            Err(MixerError::Zip(_))
        ));
    }
}
