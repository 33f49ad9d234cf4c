use std::{fs, path::Path};

use calamine::{open_workbook_auto, Data, Reader};
use log::debug;

use super::{
    row::{Cell, Row},
    SheetError, SheetResult,
};

/// Сколько строк показываем перед запуском.
pub const PREVIEW_ROWS: usize = 5;

const EMPTY_HEADER: &str = "__EMPTY";

/// Строки первого листа, ключи берутся из строки заголовков.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn preview(&self) -> &[Row] {
        &self.rows[..self.rows.len().min(PREVIEW_ROWS)]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Читает локальную таблицу.
/// CSV разбирается через csv, всё остальное через calamine.
pub fn read_file(path: &Path) -> SheetResult<Sheet> {
    let is_csv = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or_default();

    debug!("Читаем строки из {:?}", path);

    if is_csv {
        let text = fs::read_to_string(path)?;
        return parse_csv(&text);
    }

    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range_at(0).ok_or(SheetError::NoSheet)??;

    let mut lines = range.rows();
    let headers: Vec<String> = match lines.next() {
        Some(cells) => cells.iter().map(header_name).collect(),
        None => return Ok(Sheet::default()),
    };

    let rows = lines
        .map(|cells| {
            let mut row = Row::new();
            for (header, data) in headers.iter().zip(cells) {
                if let Some(cell) = to_cell(data) {
                    row.push(header, cell);
                }
            }
            row
        })
        .filter(|row| !row.is_empty())
        .collect();

    Ok(Sheet { headers, rows })
}

/// Разбирает CSV, первая запись которого содержит заголовки.
pub fn parse_csv(text: &str) -> SheetResult<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| {
            if h.trim().is_empty() {
                EMPTY_HEADER.to_owned()
            } else {
                h.to_owned()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;

        let mut row = Row::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            if !value.is_empty() {
                row.push(header, Cell::Text(value.to_owned()));
            }
        }

        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(Sheet { headers, rows })
}

fn header_name(data: &Data) -> String {
    match data {
        Data::Empty => EMPTY_HEADER.to_owned(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_cell(data: &Data) -> Option<Cell> {
    let cell = match data {
        Data::Empty => return None,
        Data::String(s) if s.is_empty() => return None,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::Date)
            .unwrap_or(Cell::Float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    };

    Some(cell)
}
