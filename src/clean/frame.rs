use crate::sheet::RawSheet;
use arrow::{
    array::{Array, Float64Array, Int64Array},
    datatypes::Schema,
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Canonical name of the time-axis column.
pub const TIME_AXIS: &str = "Year";

/// A validated, fully numeric sheet.
///
/// Column 0 is always [`TIME_AXIS`] as `Int64`; every other column is
/// `Float64`. No column carries nulls. A frame with zero rows has no columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedFrame {
    batch: RecordBatch,
}

impl CleanedFrame {
    pub fn empty() -> Self {
        Self {
            batch: RecordBatch::new_empty(Arc::new(Schema::empty())),
        }
    }

    pub(crate) fn from_batch(batch: RecordBatch) -> Self {
        if batch.num_rows() == 0 {
            return Self::empty();
        }
        Self { batch }
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Every column except the time axis, in frame order.
    pub fn variables(&self) -> Vec<String> {
        self.column_names().into_iter().skip(1).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.batch.column_by_name(name).is_some()
    }

    pub fn years(&self) -> Option<&[i64]> {
        self.batch
            .column_by_name(TIME_AXIS)?
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| &a.values()[..])
    }

    /// Values of `name` as `f64`; nulls come back as NaN.
    pub fn column_values(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.batch.column_by_name(name)?;
        if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
            return Some(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect());
        }
        col.as_any()
            .downcast_ref::<Int64Array>()
            .map(|arr| arr.iter().map(|v| v.map_or(f64::NAN, |y| y as f64)).collect())
    }

    /// Render the frame back into a sheet whose first row is the header,
    /// so it can be fed through cleaning again.
    pub fn to_raw_sheet(&self) -> RawSheet {
        let names = self.column_names();
        let columns: Vec<Vec<String>> = self
            .batch
            .columns()
            .iter()
            .map(|col| render_column(col.as_ref()))
            .collect();

        let mut rows = Vec::with_capacity(self.num_rows() + 1);
        rows.push(names);
        for r in 0..self.num_rows() {
            rows.push(columns.iter().map(|c| c[r].clone()).collect());
        }
        RawSheet::new(Vec::new(), rows)
    }
}

fn render_column(col: &dyn Array) -> Vec<String> {
    if let Some(arr) = col.as_any().downcast_ref::<Int64Array>() {
        arr.iter().map(|v| v.map(|y| y.to_string()).unwrap_or_default()).collect()
    } else if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        arr.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()).collect()
    } else {
        vec![String::new(); col.len()]
    }
}
