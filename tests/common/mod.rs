//! Workbook fixtures shared by the integration tests
//!
//! Builds real `.xlsx` archives with `zip::ZipWriter`: shared strings for
//! text, `<v>` numbers, optional Excel Table definitions per sheet.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

struct SheetSpec {
    name: String,
    rows: Vec<Vec<String>>,
    /// (table name, ref)
    table: Option<(String, String)>,
}

/// Builder for small workbooks
///
/// Cell strings that parse as numbers are written as numeric cells, empty
/// strings are left out, everything else goes through the shared string table.
#[derive(Default)]
pub struct WorkbookBuilder {
    sheets: Vec<SheetSpec>,
}

fn column_letter(col: usize) -> char {
    (b'A' + col as u8) as char
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(mut self, name: &str, rows: &[&[&str]]) -> Self {
        self.sheets.push(SheetSpec {
            name: name.to_string(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            table: None,
        });
        self
    }

    /// Attach an Excel Table definition to the most recently added sheet
    pub fn table(mut self, name: &str, reference: &str) -> Self {
        if let Some(sheet) = self.sheets.last_mut() {
            sheet.table = Some((name.to_string(), reference.to_string()));
        }
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut shared: Vec<String> = Vec::new();
        let mut sheet_parts = Vec::new();

        for sheet in &self.sheets {
            let mut data = String::new();
            for (r, row) in sheet.rows.iter().enumerate() {
                data.push_str(&format!(r#"<row r="{}">"#, r + 1));
                for (c, value) in row.iter().enumerate() {
                    if value.is_empty() {
                        continue;
                    }
                    let addr = format!("{}{}", column_letter(c), r + 1);
                    if value.parse::<f64>().is_ok() {
                        data.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, addr, value));
                    } else {
                        let idx = match shared.iter().position(|s| s == value) {
                            Some(i) => i,
                            None => {
                                shared.push(value.clone());
                                shared.len() - 1
                            }
                        };
                        data.push_str(&format!(r#"<c r="{}" t="s"><v>{}</v></c>"#, addr, idx));
                    }
                }
                data.push_str("</row>");
            }
            sheet_parts.push(format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{}" xmlns:r="{}"><sheetData>{}</sheetData></worksheet>"#,
                MAIN_NS, REL_NS, data
            ));
        }

        let mut bytes = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut bytes));
            let options = SimpleFileOptions::default();
            let mut put = |path: &str, content: &str| {
                zip.start_file(path, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            };

            put(
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#,
            );

            let sheets_xml: String = self
                .sheets
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    format!(
                        r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                        escape(&s.name),
                        i + 1,
                        i + 1
                    )
                })
                .collect();
            put(
                "xl/workbook.xml",
                &format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{}" xmlns:r="{}"><sheets>{}</sheets></workbook>"#,
                    MAIN_NS, REL_NS, sheets_xml
                ),
            );

            let rels_xml: String = (0..self.sheets.len())
                .map(|i| {
                    format!(
                        r#"<Relationship Id="rId{}" Type="{}/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                        i + 1,
                        REL_NS,
                        i + 1
                    )
                })
                .collect();
            put(
                "xl/_rels/workbook.xml.rels",
                &format!(r#"<Relationships xmlns="{}">{}</Relationships>"#, PKG_REL_NS, rels_xml),
            );

            let sst: String = shared
                .iter()
                .map(|s| format!("<si><t>{}</t></si>", escape(s)))
                .collect();
            put(
                "xl/sharedStrings.xml",
                &format!(
                    r#"<sst xmlns="{}" count="{}" uniqueCount="{}">{}</sst>"#,
                    MAIN_NS,
                    shared.len(),
                    shared.len(),
                    sst
                ),
            );

            for (i, (sheet, part)) in self.sheets.iter().zip(&sheet_parts).enumerate() {
                put(&format!("xl/worksheets/sheet{}.xml", i + 1), part);
                if let Some((name, reference)) = &sheet.table {
                    put(
                        &format!("xl/worksheets/_rels/sheet{}.xml.rels", i + 1),
                        &format!(
                            r#"<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}/table" Target="../tables/table{}.xml"/></Relationships>"#,
                            PKG_REL_NS,
                            REL_NS,
                            i + 1
                        ),
                    );
                    put(
                        &format!("xl/tables/table{}.xml", i + 1),
                        &format!(
                            r#"<table xmlns="{}" id="{}" name="{}" displayName="{}" ref="{}"/>"#,
                            MAIN_NS,
                            i + 1,
                            escape(name),
                            escape(name),
                            reference
                        ),
                    );
                }
            }
            zip.finish().unwrap();
        }
        bytes
    }

    pub fn write(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.to_bytes()).unwrap();
        path
    }
}

/// Formula + Comida workbook with Excel Table definitions
///
/// Mixer 1 feeds C1 (100 head × 5 kg) and C2 (50 head × 4 kg) on Inicio:
/// 250 + 100 kg per round. Mixer 2 feeds C3 on Terminacion.
pub fn standard_workbook() -> WorkbookBuilder {
    WorkbookBuilder::new()
        .sheet(
            "Formula",
            &[
                &["Insumo", "Inicio", "Recria", "Terminacion"],
                &["Maiz", "50", "60", "70"],
                &["Silo", "30", "25", "20"],
                &["Nucleo", "20", "15", "10"],
                &["Total", "100", "100", "100"],
            ],
        )
        .table("Formula", "A1:D5")
        .sheet(
            "Comida",
            &[
                &["Corral", "Cab", "KgTC/Dia", "Ajuste", "Etapa", "MIXER"],
                &["C1", "100", "5", "100", "Inicio", "1"],
                &["C2", "50", "4", "100", "Inicio", "1"],
                &["C3", "80", "10", "100", "Terminacion", "Mixer 2"],
            ],
        )
        .table("Comida", "A1:F4")
}

/// Workbook without table definitions: located by sheet names and headers
pub fn heuristic_workbook() -> WorkbookBuilder {
    WorkbookBuilder::new()
        .sheet(
            "Comida",
            &[
                &["Planilla de raciones"],
                &[""],
                &["Corral", "Cabezas", "Dieta", "KgTC/Dia", "Mixer"],
                &["C1", "40", "Recria", "6", "Carro Nº 3"],
                &["C2", "60", "Recria", "5", "III"],
            ],
        )
        .sheet(
            "Fórmula",
            &[
                &["Insumo", "Recria"],
                &["Maiz", "0.6"],
                &["Silo", "0.4"],
            ],
        )
}
