use std::fmt::Display;

use chrono::{NaiveDateTime, Timelike};

/// Ячейка таблицы в том виде, в котором её отдал парсер.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                write!(f, "{}", *v as i64)
            }
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Date(d) if d.num_seconds_from_midnight() == 0 => {
                write!(f, "{}", d.format("%Y-%m-%d"))
            }
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

/// Строка данных с ключами из заголовков, в порядке колонок.
///
/// Пустые ячейки не хранятся, поэтому поиск по ним ведёт себя как для
/// отсутствующей колонки.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Cell)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, header: &str, cell: Cell) {
        self.cells.push((header.to_owned(), cell));
    }

    pub fn get(&self, header: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, c)| c)
    }

    /// Текст ячейки или пустая строка, если колонки нет.
    pub fn text(&self, header: &str) -> String {
        self.get(header).map(Cell::to_string).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Row {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut row = Row::new();
        for (h, v) in pairs {
            row.push(h, Cell::Text(v.to_owned()));
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    macro_rules! to_string_tests {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (expected, input) = $value;
                assert_eq!(expected, input.to_string());
            }
        )*
        }
    }

    to_string_tests! {
        to_string_text: ("John", Cell::Text("John".into())),
        to_string_int: ("42", Cell::Int(42)),
        to_string_whole_float: ("2024", Cell::Float(2024.0)),
        to_string_float: ("1.5", Cell::Float(1.5)),
        to_string_bool: ("true", Cell::Bool(true)),
        to_string_date: ("2024-05-01", Cell::Date(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        )),
        to_string_datetime: ("2024-05-01T13:30:00", Cell::Date(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(13, 30, 0).unwrap()
        )),
    }

    #[test]
    fn missing_column_is_empty_text() {
        let row = Row::from([("Name", "John Doe")]);

        assert_eq!("John Doe", row.text("Name"));
        assert_eq!("", row.text("Email"));
        assert_eq!(None, row.get("name"));
    }
}
