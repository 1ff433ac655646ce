use crate::sheet::utils;
use arrow::array::{Array, ArrayRef, Float64Builder, Int64Builder, StringArray};
use std::sync::Arc;

/// Time axis → i64. Cells that don't coerce become null.
pub fn to_year_column(sarr: &StringArray) -> ArrayRef {
    let mut b = Int64Builder::with_capacity(sarr.len());
    for opt in sarr.iter() {
        b.append_option(opt.and_then(utils::parse_year));
    }
    Arc::new(b.finish())
}

/// Numeric → f64. Cells that don't coerce become null.
pub fn to_numeric_column(sarr: &StringArray) -> ArrayRef {
    let mut b = Float64Builder::with_capacity(sarr.len());
    for opt in sarr.iter() {
        b.append_option(opt.and_then(utils::parse_numeric));
    }
    Arc::new(b.finish())
}
