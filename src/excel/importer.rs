//! Workbook importer - .xlsx → located Formula / Comida / order tables

use crate::error::{MixerError, MixerResult};
use crate::excel::locator::{TableLocator, TableTarget, DEFAULT_HEADER_SCAN_ROWS};
use crate::excel::package::{PackageSource, Workbook, ZipPackage};
use crate::types::{ExtractedTable, TableRange, TableStrategy};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Tables located in one workbook, each resolved independently
#[derive(Debug)]
pub struct WorkbookExtraction {
    pub sheet_names: Vec<String>,
    pub formula: MixerResult<ExtractedTable>,
    pub comida: MixerResult<ExtractedTable>,
    /// Optional authored discharge order
    pub discharge_order: MixerResult<ExtractedTable>,
}

impl WorkbookExtraction {
    pub fn table(&self, target: TableTarget) -> &MixerResult<ExtractedTable> {
        match target {
            TableTarget::Formula => &self.formula,
            TableTarget::Comida => &self.comida,
            TableTarget::DischargeOrder => &self.discharge_order,
        }
    }

    /// Every target with its outcome, in [`TableTarget::ALL`] order
    pub fn tables(&self) -> impl Iterator<Item = (TableTarget, &MixerResult<ExtractedTable>)> {
        TableTarget::ALL.into_iter().map(move |t| (t, self.table(t)))
    }

    pub fn summaries(&self) -> Vec<TableSummary> {
        self.tables()
            .map(|(target, result)| TableSummary::new(target, result))
            .collect()
    }
}

/// Where a target table was found, or why it was not
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub target: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<TableStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TableRange>,
    pub headers: Vec<String>,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableSummary {
    pub fn new(target: TableTarget, result: &MixerResult<ExtractedTable>) -> Self {
        match result {
            Ok(table) => Self {
                target: target.label().to_string(),
                found: true,
                sheet: Some(table.sheet_name.clone()),
                table: Some(table.table_name.clone()),
                strategy: Some(table.strategy),
                range: Some(table.range),
                headers: table.headers.clone(),
                rows: table.row_count(),
                error: None,
            },
            Err(e) => Self {
                target: target.label().to_string(),
                found: false,
                sheet: None,
                table: None,
                strategy: None,
                range: None,
                headers: Vec::new(),
                rows: 0,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Excel importer for locating planner tables in a workbook
pub struct WorkbookImporter<S: PackageSource> {
    workbook: Workbook<S>,
    locator: TableLocator,
}

impl WorkbookImporter<ZipPackage<BufReader<File>>> {
    /// Open a `.xlsx` file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> MixerResult<Self> {
        debug!(path = %path.as_ref().display(), "opening workbook");
        Self::new(ZipPackage::open(path)?)
    }
}

impl<S: PackageSource> WorkbookImporter<S> {
    /// Read the workbook descriptor; fails when the package is not a workbook
    pub fn new(source: S) -> MixerResult<Self> {
        Ok(Self {
            workbook: Workbook::open(source)?,
            locator: TableLocator::new(DEFAULT_HEADER_SCAN_ROWS),
        })
    }

    /// Override how many leading rows the header heuristic inspects
    pub fn with_header_scan_rows(mut self, rows: usize) -> Self {
        self.locator = TableLocator::new(rows);
        self
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// Locate all planner tables
    pub fn extract(&mut self) -> MixerResult<WorkbookExtraction> {
        let mut located = self.locator.locate(&mut self.workbook, &TableTarget::ALL)?;

        let mut take = |target: TableTarget| -> MixerResult<ExtractedTable> {
            located
                .iter()
                .position(|(t, _)| *t == target)
                .map(|i| located.swap_remove(i).1)
                .unwrap_or_else(|| Err(target.not_found()))
        };
        let extraction = WorkbookExtraction {
            sheet_names: self.workbook.sheet_names(),
            formula: take(TableTarget::Formula),
            comida: take(TableTarget::Comida),
            discharge_order: take(TableTarget::DischargeOrder),
        };

        for (target, result) in extraction.tables() {
            match result {
                Ok(table) => info!(
                    target = %target,
                    sheet = %table.sheet_name,
                    rows = table.row_count(),
                    "table extracted"
                ),
                Err(MixerError::TableNotFound(_)) => debug!(target = %target, "table not found"),
                Err(e) => debug!(target = %target, error = %e, "table unreadable"),
            }
        }

        Ok(extraction)
    }
}
