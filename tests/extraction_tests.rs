//! Workbook extraction tests: real .xlsx archives through the full reader

mod common;

use common::{heuristic_workbook, standard_workbook, WorkbookBuilder};
use feedlot_mixer::error::MixerError;
use feedlot_mixer::excel::{WorkbookImporter, ZipPackage};
use feedlot_mixer::types::TableStrategy;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// ═══════════════════════════════════════════════════════════════════════════
// STRATEGY A: TABLE DEFINITIONS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_tables_found_by_definition() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");

    let extraction = WorkbookImporter::open(&path).unwrap().extract().unwrap();
    assert_eq!(extraction.sheet_names, vec!["Formula", "Comida"]);

    let formula = extraction.formula.as_ref().unwrap();
    assert_eq!(formula.strategy, TableStrategy::TableDefinition);
    assert_eq!(formula.headers, vec!["Insumo", "Inicio", "Recria", "Terminacion"]);
    assert_eq!(formula.row_count(), 4);

    let comida = extraction.comida.as_ref().unwrap();
    assert_eq!(comida.strategy, TableStrategy::TableDefinition);
    assert_eq!(comida.sheet_name, "Comida");
    assert_eq!(comida.row_count(), 3);
    assert_eq!(comida.rows[0].cells[0].text, "C1");
    assert_eq!(comida.rows[2].cells[5].text, "Mixer 2");
}

#[test]
fn test_missing_order_table_is_not_fatal() {
    let bytes = standard_workbook().to_bytes();
    let extraction = WorkbookImporter::new(ZipPackage::from_bytes(bytes).unwrap())
        .unwrap()
        .extract()
        .unwrap();
    assert!(extraction.formula.is_ok());
    assert!(extraction.comida.is_ok());
    assert!(matches!(
        extraction.discharge_order,
        Err(MixerError::TableNotFound(_))
    ));
}

// ═══════════════════════════════════════════════════════════════════════════
// STRATEGY B: SHEET NAME + HEADER HEURISTIC
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_comida_sheet_with_corral_cabezas_dieta() {
    let bytes = heuristic_workbook().to_bytes();
    let extraction = WorkbookImporter::new(ZipPackage::from_bytes(bytes).unwrap())
        .unwrap()
        .extract()
        .unwrap();

    let comida = extraction.comida.as_ref().unwrap();
    assert_eq!(comida.strategy, TableStrategy::SheetHeuristic);
    assert_eq!(
        comida.headers,
        vec!["Corral", "Cabezas", "Dieta", "KgTC/Dia", "Mixer"]
    );
    assert_eq!(comida.row_count(), 2);
    assert_eq!(comida.range.start.row, 2);
}

#[test]
fn test_accented_sheet_name_matches_formula() {
    let bytes = heuristic_workbook().to_bytes();
    let extraction = WorkbookImporter::new(ZipPackage::from_bytes(bytes).unwrap())
        .unwrap()
        .extract()
        .unwrap();

    let formula = extraction.formula.as_ref().unwrap();
    assert_eq!(formula.sheet_name, "Fórmula");
    assert_eq!(formula.headers, vec!["Insumo", "Recria"]);
}

#[test]
fn test_no_matching_sheets() {
    let bytes = WorkbookBuilder::new()
        .sheet("Hoja1", &[&["a", "b", "c"], &["1", "2", "3"]])
        .to_bytes();
    let extraction = WorkbookImporter::new(ZipPackage::from_bytes(bytes).unwrap())
        .unwrap()
        .extract()
        .unwrap();

    assert_eq!(
        extraction.formula.unwrap_err().to_string(),
        "no Formula table found"
    );
    assert_eq!(
        extraction.comida.unwrap_err().to_string(),
        "no Comida table found"
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTAINER ERRORS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_file_is_io_error() {
    let result = WorkbookImporter::open("/nonexistent/raciones.xlsx");
    assert!(matches!(result, Err(MixerError::Io(_))));
}

#[test]
fn test_archive_without_workbook_part() {
    use std::io::{Cursor, Write};
    let mut bytes = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut bytes));
        zip.start_file("docProps/app.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<Properties/>").unwrap();
        zip.finish().unwrap();
    }
    let result = WorkbookImporter::new(ZipPackage::from_bytes(bytes).unwrap());
    match result {
        Err(MixerError::MissingEntry(part)) => assert_eq!(part, "xl/workbook.xml"),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("expected MissingEntry"),
    }
}
