//! Excel workbook reading for the mixer planner
//!
//! This module turns an `.xlsx` package into located tables:
//! - Package: zip container, workbook descriptor, relationships
//! - Styles: shared strings, number formats, display text
//! - Sheet: sparse cell grid with merged-cell propagation
//! - Locator: explicit Excel Tables first, sheet heuristics second

pub mod address;
pub mod importer;
pub mod locator;
pub mod package;
pub mod sheet;
pub mod styles;
mod xml;

pub use address::{column_label_to_index, index_to_column_label, parse_cell_address, parse_range_address};
pub use importer::{TableSummary, WorkbookExtraction, WorkbookImporter};
pub use locator::{TableLocator, TableTarget};
pub use package::{MemoryPackage, PackageSource, Workbook, ZipPackage};
pub use sheet::read_sheet_cells;
pub use styles::StyleTable;
