// src/sheet/mod.rs
pub mod utils;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use glob::glob;
use indexmap::IndexMap;
use std::{fs::File, io::Read, path::Path};
use tracing::{debug, info, warn};

/// One untyped sheet, exactly as a spreadsheet reader hands it over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    /// Header row the reader inferred. Exports usually carry a title row here,
    /// so cleaning ignores it and promotes `rows[0]` instead.
    pub headers: Vec<String>,
    /// Every remaining row, one `String` per cell. Rows may be ragged.
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Build a sheet whose first row is the real header, with no reader header.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = Vec<C>>,
        C: Into<String>,
    {
        Self {
            headers: Vec::new(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Widest row, counting the reader header.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Parse CSV bytes. The first record becomes `headers`, the rest `rows`.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut sheet = RawSheet::default();
        for (idx, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
            let cells: Vec<String> = record.iter().map(str::to_string).collect();
            if idx == 0 {
                sheet.headers = cells;
            } else {
                sheet.rows.push(cells);
            }
        }
        Ok(sheet)
    }
}

/// Load one CSV file as a [`RawSheet`].
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_sheet_csv<P: AsRef<Path>>(path: P) -> Result<RawSheet> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open sheet: {:?}", path.as_ref()))?;
    let sheet = RawSheet::from_csv_reader(file)
        .with_context(|| format!("Failed to read sheet: {:?}", path.as_ref()))?;
    debug!(rows = sheet.rows.len(), width = sheet.width(), "loaded sheet");
    Ok(sheet)
}

/// Load every CSV matching `pattern`, keyed by file stem, in sorted path order.
#[tracing::instrument(level = "info")]
pub fn load_sheets(pattern: &str) -> Result<IndexMap<String, RawSheet>> {
    let mut paths: Vec<_> = glob(pattern)
        .with_context(|| format!("Failed to read glob pattern '{}'", pattern))?
        .filter_map(|entry| match entry {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("cannot read glob entry: {}", e);
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let mut sheets = IndexMap::with_capacity(paths.len());
    for path in paths {
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let sheet = load_sheet_csv(&path)?;
        if sheets.insert(id.clone(), sheet).is_some() {
            warn!(sheet = %id, "duplicate sheet id; keeping the last file");
        }
    }
    info!(count = sheets.len(), "loaded sheets");
    Ok(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    const HOUSING: &str = "Housing Table 1,,\nYear,Total housing units,Occupied units\n2000,100,90\n2001,110,95\n";

    #[test]
    fn csv_first_record_is_reader_header() -> Result<()> {
        let sheet = RawSheet::from_csv_reader(Cursor::new(HOUSING))?;
        assert_eq!(sheet.headers, vec!["Housing Table 1", "", ""]);
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[0], vec!["Year", "Total housing units", "Occupied units"]);
        Ok(())
    }

    #[test]
    fn ragged_rows_are_kept() -> Result<()> {
        let sheet = RawSheet::from_csv_reader(Cursor::new("t\na,b,c\n1\n1,2,3,4\n"))?;
        assert_eq!(sheet.rows[1], vec!["1"]);
        assert_eq!(sheet.width(), 4);
        Ok(())
    }

    #[test]
    fn load_sheets_from_dir_in_sorted_order() -> Result<()> {
        let dir = TempDir::new()?;
        for name in ["b_sheet.csv", "a_sheet.csv", "notes.txt"] {
            let mut f = File::create(dir.path().join(name))?;
            f.write_all(HOUSING.as_bytes())?;
        }
        let pattern = format!("{}/*.csv", dir.path().display());
        let sheets = load_sheets(&pattern)?;
        let ids: Vec<&str> = sheets.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["a_sheet", "b_sheet"]);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_sheet_csv("does/not/exist.csv").unwrap_err();
        assert!(err.to_string().contains("Failed to open sheet"));
    }
}
