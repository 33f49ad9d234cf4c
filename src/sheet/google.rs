use std::{sync::OnceLock, time::Duration};

use log::debug;
use regex::Regex;
use reqwest::Url;

use crate::api::USER_AGENT;

use super::{reader, reader::Sheet, SheetError, SheetResult};

const SHEETS_BASE: &str = "https://docs.google.com/spreadsheets/d";
const SLIDES_BASE: &str = "https://docs.google.com/presentation/d";

fn sheet_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"/d/([a-zA-Z0-9_-]+)", r"id=([a-zA-Z0-9_-]+)"]
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

fn slide_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"/presentation/d/e/([a-zA-Z0-9_-]+)",
            r"/presentation/d/([a-zA-Z0-9_-]+)",
            r"id=([a-zA-Z0-9_-]+)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

fn first_capture(patterns: &[Regex], url: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|p| p.captures(url))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Извлекает идентификатор документа из ссылки на Google Sheets.
pub fn extract_sheet_id(url: &str) -> Option<String> {
    first_capture(sheet_patterns(), url)
}

/// Извлекает идентификатор презентации из ссылки на Google Slides.
pub fn extract_slide_id(url: &str) -> Option<String> {
    first_capture(slide_patterns(), url)
}

/// Строит ссылку на выгрузку документа в CSV.
/// Если указано имя листа, то выгрузка идёт через gviz.
pub fn sheet_csv_url(id: &str, sheet_name: Option<&str>) -> SheetResult<Url> {
    let parse = |s: String| Url::parse(&s).map_err(|_| SheetError::InvalidUrl);

    match sheet_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let mut url = parse(format!("{}/{}/gviz/tq", SHEETS_BASE, id))?;
            url.query_pairs_mut()
                .append_pair("tqx", "out:csv")
                .append_pair("sheet", name);
            Ok(url)
        }
        None => parse(format!("{}/{}/export?format=csv", SHEETS_BASE, id)),
    }
}

pub fn slide_embed_url(id: &str) -> String {
    format!(
        "{}/{}/embed?start=false&loop=false&delayms=3000",
        SLIDES_BASE, id
    )
}

/// Загружает публичную Google таблицу и разбирает её как локальный CSV файл.
pub fn fetch_sheet(share_url: &str, sheet_name: Option<&str>) -> SheetResult<Sheet> {
    let id = extract_sheet_id(share_url).ok_or(SheetError::InvalidUrl)?;

    fetch_csv(sheet_csv_url(&id, sheet_name)?)
}

/// Скачивает CSV по ссылке на выгрузку и разбирает его.
pub fn fetch_csv(url: Url) -> SheetResult<Sheet> {
    debug!("Скачиваем выгрузку таблицы {}", url);

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| SheetError::Fetch(e.to_string()))?;

    let resp = client
        .get(url)
        .send()
        .map_err(|e| SheetError::Fetch(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(SheetError::Fetch(format!("status {}", resp.status())));
    }

    let text = resp.text().map_err(|e| SheetError::Fetch(e.to_string()))?;

    reader::parse_csv(&text)
}
