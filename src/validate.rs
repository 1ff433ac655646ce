//! Gate deciding whether a cleaned frame is worth analyzing.
use crate::clean::CleanedFrame;
use arrow::array::{Array, Float64Array};

/// Rows with no null and no NaN in any column.
pub fn usable_rows(frame: &CleanedFrame) -> usize {
    let batch = frame.batch();
    (0..batch.num_rows())
        .filter(|&row| {
            batch.columns().iter().all(|col| {
                if col.is_null(row) {
                    return false;
                }
                match col.as_any().downcast_ref::<Float64Array>() {
                    Some(arr) => !arr.value(row).is_nan(),
                    None => true,
                }
            })
        })
        .count()
}

/// `true` iff the frame has at least `min_rows` usable rows.
pub fn is_valid(frame: &CleanedFrame, min_rows: usize) -> bool {
    usable_rows(frame) >= min_rows
}
