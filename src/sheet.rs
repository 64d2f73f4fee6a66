//! Spreadsheet input.
//!
//! Column order: reader name, masjid name, region label, map URL, audio URL,
//! notes. The first row is a header. `.xlsx` files are read from the named
//! worksheet; `.csv` files are taken to be an export of that worksheet.

use crate::error::{PrepError, Result};
use crate::masjid::{PlaceRecord, RegionField};
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::path::Path;

/// Read place records from `path`, skipping blank rows and rows without a map URL.
pub fn read_places(path: &Path, worksheet: &str) -> Result<Vec<PlaceRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let rows = match ext.as_deref() {
        Some("xlsx") | Some("xlsm") => read_xlsx_rows(path, worksheet)?,
        Some("csv") => read_csv_rows(path)?,
        _ => return Err(PrepError::UnsupportedInput(path.to_path_buf())),
    };

    let mut places = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        // header is line 1
        let line = i + 2;
        if row.iter().all(Option::is_none) {
            continue;
        }
        match place_from_row(row) {
            Some(place) => places.push(place),
            None => tracing::warn!(line, "row has no map URL, skipped"),
        }
    }
    Ok(places)
}

fn place_from_row(mut row: Vec<Option<String>>) -> Option<PlaceRecord> {
    row.resize(6, None);
    let mut cells = row.into_iter();
    let mut next = || cells.next().flatten();

    let reader_name = next().unwrap_or_default();
    let masjid_name = next().unwrap_or_default();
    let region_label = next().unwrap_or_default();
    let google_maps_url = next()?;
    let audio_url = next().unwrap_or_default();
    let notes = next();

    Some(PlaceRecord {
        reader_name,
        masjid_name,
        region: RegionField::from_label(&region_label),
        google_maps_url,
        audio_url,
        notes,
        coordinates: None,
    })
}

fn read_xlsx_rows(path: &Path, worksheet: &str) -> Result<Vec<Vec<Option<String>>>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    if !workbook.sheet_names().iter().any(|name| name == worksheet) {
        return Err(PrepError::MissingWorksheet {
            sheet: worksheet.to_string(),
            path: path.to_path_buf(),
        });
    }
    let range = workbook.worksheet_range(worksheet)?;
    Ok(range
        .rows()
        .skip(1)
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<Option<String>>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    let field = field.trim();
                    (!field.is_empty()).then(|| field.to_string())
                })
                .collect(),
        );
    }
    Ok(rows)
}
