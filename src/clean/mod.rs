// src/clean/mod.rs
pub mod convert;
pub mod frame;

pub use frame::{CleanedFrame, TIME_AXIS};

use crate::sheet::{
    utils::{clean_str, is_missing},
    RawSheet,
};
use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, StringArray},
    compute::{and, filter_record_batch, is_not_null},
    datatypes::{DataType, Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::{collections::HashSet, fmt, sync::Arc};
use tracing::{debug, warn};

/// Why a column didn't make it into the cleaned frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Every data cell was missing.
    Empty,
    /// Not a single cell coerced to a number.
    NonNumeric,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Empty => write!(f, "entirely empty"),
            DropReason::NonNumeric => write!(f, "no numeric values"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedColumn {
    pub name: String,
    pub reason: DropReason,
}

/// What cleaning threw away. Nothing here is an error: these drops are the
/// cleaning policy, surfaced so callers can audit them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningDiagnostics {
    /// Data rows below the promoted header.
    pub input_rows: usize,
    pub output_rows: usize,
    pub dropped_columns: Vec<DroppedColumn>,
    /// Removed by the first any-missing pass.
    pub rows_with_missing: usize,
    /// Removed because the time axis didn't coerce.
    pub rows_with_bad_year: usize,
    /// Removed by the second any-missing pass, after numeric coercion.
    pub rows_with_bad_numbers: usize,
}

/// Normalize a raw sheet into a [`CleanedFrame`]. Never fails; a sheet with
/// nothing usable yields an empty frame.
pub fn clean(sheet: &RawSheet) -> CleanedFrame {
    clean_with_diagnostics(sheet).0
}

/// [`clean`], plus a record of every row and column it dropped.
pub fn clean_with_diagnostics(sheet: &RawSheet) -> (CleanedFrame, CleaningDiagnostics) {
    let mut diag = CleaningDiagnostics::default();
    let frame = match try_clean(sheet, &mut diag) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "cleaning failed; returning empty frame");
            CleanedFrame::empty()
        }
    };
    diag.output_rows = frame.num_rows();
    debug!(
        input_rows = diag.input_rows,
        output_rows = diag.output_rows,
        columns = frame.num_columns(),
        dropped = diag.dropped_columns.len(),
        "cleaned sheet"
    );
    (frame, diag)
}

fn try_clean(sheet: &RawSheet, diag: &mut CleaningDiagnostics) -> Result<CleanedFrame, ArrowError> {
    // ─── 1) promote the first row to the header ──────────────────────
    let Some((header, data)) = sheet.rows.split_first() else {
        return Ok(CleanedFrame::empty());
    };
    diag.input_rows = data.len();
    let width = sheet.rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return Ok(CleanedFrame::empty());
    }

    let names: Vec<String> = (0..width)
        .map(|i| {
            let name = header.get(i).map(|h| clean_str(h)).unwrap_or_default();
            if name.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                name
            }
        })
        .collect();

    let arrays: Vec<ArrayRef> = (0..width)
        .map(|i| {
            let col: StringArray = data
                .iter()
                .map(|row| row.get(i).filter(|c| !is_missing(c)).map(|c| clean_str(c)))
                .collect();
            Arc::new(col) as ArrayRef
        })
        .collect();
    let raw = RecordBatch::try_new(utf8_schema(&names), arrays)?;

    // ─── 2) drop entirely empty columns ──────────────────────────────
    let mut keep = Vec::with_capacity(width);
    for (i, col) in raw.columns().iter().enumerate() {
        if col.null_count() == col.len() {
            warn!(column = %names[i], reason = %DropReason::Empty, "dropping column");
            diag.dropped_columns.push(DroppedColumn {
                name: names[i].clone(),
                reason: DropReason::Empty,
            });
        } else {
            keep.push(i);
        }
    }
    if keep.is_empty() {
        return Ok(CleanedFrame::empty());
    }
    let raw = raw.project(&keep)?;
    let names: Vec<String> = keep.iter().map(|&i| names[i].clone()).collect();

    // ─── 3) first any-missing row pass ───────────────────────────────
    let (raw, removed) = drop_rows_with_nulls(&raw)?;
    diag.rows_with_missing = removed;

    // ─── 4) time axis: rename, coerce, drop failures ─────────────────
    let years = convert::to_year_column(utf8_column(&raw, 0)?);
    let year_mask = is_not_null(years.as_ref())?;
    let raw = filter_record_batch(&raw, &year_mask)?;
    let years = arrow::compute::filter(years.as_ref(), &year_mask)?;
    diag.rows_with_bad_year = year_mask.len() - raw.num_rows();

    // ─── 5) numeric coercion; columns with no numbers are excluded ───
    let mut out_names = vec![TIME_AXIS.to_string()];
    let mut out_arrays = vec![years];
    for i in 1..raw.num_columns() {
        let numeric = convert::to_numeric_column(utf8_column(&raw, i)?);
        if numeric.len() > 0 && numeric.null_count() == numeric.len() {
            warn!(column = %names[i], reason = %DropReason::NonNumeric, "dropping column");
            diag.dropped_columns.push(DroppedColumn {
                name: names[i].clone(),
                reason: DropReason::NonNumeric,
            });
            continue;
        }
        out_names.push(names[i].clone());
        out_arrays.push(numeric);
    }
    let out_names = dedupe(out_names);
    let typed = RecordBatch::try_new(typed_schema(&out_names, true), out_arrays)?;

    // ─── 6) second any-missing row pass ──────────────────────────────
    let (typed, removed) = drop_rows_with_nulls(&typed)?;
    diag.rows_with_bad_numbers = removed;

    let finished = RecordBatch::try_new(
        typed_schema(&out_names, false),
        typed.columns().to_vec(),
    )?;
    Ok(CleanedFrame::from_batch(finished))
}

fn utf8_schema(names: &[String]) -> Arc<Schema> {
    Arc::new(Schema::new(
        names
            .iter()
            .map(|n| Field::new(n, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ))
}

fn typed_schema(names: &[String], nullable: bool) -> Arc<Schema> {
    Arc::new(Schema::new(
        names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let ty = if i == 0 { DataType::Int64 } else { DataType::Float64 };
                Field::new(n, ty, nullable)
            })
            .collect::<Vec<_>>(),
    ))
}

fn utf8_column(batch: &RecordBatch, i: usize) -> Result<&StringArray, ArrowError> {
    batch.column(i).as_string_opt::<i32>().ok_or_else(|| {
        ArrowError::InvalidArgumentError(format!("column {} is not Utf8", i))
    })
}

/// Keep only rows where every column is non-null. Returns the number removed.
fn drop_rows_with_nulls(batch: &RecordBatch) -> Result<(RecordBatch, usize), ArrowError> {
    let mut mask = BooleanArray::from(vec![true; batch.num_rows()]);
    for col in batch.columns() {
        mask = and(&mask, &is_not_null(col.as_ref())?)?;
    }
    let filtered = filter_record_batch(batch, &mask)?;
    let removed = batch.num_rows() - filtered.num_rows();
    Ok((filtered, removed))
}

/// First occurrence keeps its name; later ones get `.1`, `.2`, …
fn dedupe(names: Vec<String>) -> Vec<String> {
    let mut used = HashSet::with_capacity(names.len());
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut n = 0;
            while !used.insert(candidate.clone()) {
                n += 1;
                candidate = format!("{}.{}", name, n);
            }
            candidate
        })
        .collect()
}
