//! Record documents for the baseline dataset, imports, and exports.
//!
//! All documents share one loose record schema (see [`records`]). Two input
//! shapes are accepted everywhere: a bare marker array, or an object with
//! `markers` and optional `zones`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mapnote::format::{parse_import, ExportDocument};
//!
//! let records = parse_import(&json)?;
//! let (summary, _) = store.apply_import(&records);
//! ```

mod document;
mod error;
pub mod records;

#[cfg(test)]
mod tests;

pub use document::{
    ExportDocument, RecordSet, UserExportDocument, parse_baseline, parse_import, parse_records,
};
pub use error::FormatError;
pub use records::{MarkerRecord, PointRecord, ZoneRecord};
