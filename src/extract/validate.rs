//! Range checks on extracted records

use crate::config::ValidationConfig;
use crate::extract::RawRecord;
use std::ops::{Deref, RangeInclusive};
use thiserror::Error;

/// Why a record was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationFailure {
    #[error("price {price} outside [{min}, {max}]")]
    PriceOutOfRange { price: u32, min: u32, max: u32 },

    #[error("area {area} outside [{min}, {max}]")]
    AreaOutOfRange { area: f64, min: f64, max: f64 },
}

/// Inclusive bounds a record must satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationBounds {
    /// When false every record is accepted as-is
    pub enabled: bool,
    pub price: RangeInclusive<u32>,
    pub area: RangeInclusive<f64>,
}

impl ValidationBounds {
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            enabled: config.enabled,
            price: config.min_price..=config.max_price,
            area: config.min_area..=config.max_area,
        }
    }

    /// Bounds that accept everything
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            price: 0..=u32::MAX,
            area: 0.0..=f64::MAX,
        }
    }
}

/// A record that passed validation
///
/// Only [`validate`] constructs this type, so holding one proves the checks
/// ran.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord(RawRecord);

impl ValidatedRecord {
    pub fn record(&self) -> &RawRecord {
        &self.0
    }

    pub fn into_inner(self) -> RawRecord {
        self.0
    }
}

impl Deref for ValidatedRecord {
    type Target = RawRecord;

    fn deref(&self) -> &RawRecord {
        &self.0
    }
}

/// Checks price and area against `bounds`
///
/// Bounds are inclusive on both ends. The outcome depends only on the
/// record and the bounds, so re-validating yields the same answer.
pub fn validate(
    record: RawRecord,
    bounds: &ValidationBounds,
) -> Result<ValidatedRecord, ValidationFailure> {
    if !bounds.enabled {
        return Ok(ValidatedRecord(record));
    }

    if !bounds.price.contains(&record.price) {
        return Err(ValidationFailure::PriceOutOfRange {
            price: record.price,
            min: *bounds.price.start(),
            max: *bounds.price.end(),
        });
    }

    if !bounds.area.contains(&record.area) {
        return Err(ValidationFailure::AreaOutOfRange {
            area: record.area,
            min: *bounds.area.start(),
            max: *bounds.area.end(),
        });
    }

    Ok(ValidatedRecord(record))
}
