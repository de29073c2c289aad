//! Field extraction and validation
//!
//! `extract` turns a loaded detail page into a [`RawRecord`] or an
//! [`ExtractionFailure`]; `validate` range-checks a raw record and produces
//! the [`ValidatedRecord`] that output sinks accept.

mod fields;
mod record;
mod validate;

pub use fields::{extract, ExtractionFailure};
pub use record::{RawRecord, RecordField, RentalMode, CRAWLED_AT_FORMAT};
pub use validate::{validate, ValidatedRecord, ValidationBounds, ValidationFailure};

#[cfg(test)]
pub(crate) use record::fixtures;
