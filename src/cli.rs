use inquire::validator::Validation;
use inquire::Text;

use crate::sheet::Sheet;

/// Возвращает переданное значение или запрашивает его у пользователя.
pub fn value_or_ask(value: Option<String>, title: &str) -> anyhow::Result<String> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => Ok(v),
        None => prompt(title),
    }
}

fn prompt(title: &str) -> anyhow::Result<String> {
    // Все запрашиваемые значения обязательны.
    let prompt = Text::new(title).with_validator(|s: &str| {
        if s.trim().is_empty() {
            return Ok(Validation::Invalid("required".into()));
        };
        Ok(Validation::Valid)
    });

    Ok(prompt.prompt()?)
}

/// Печатает строки предпросмотра таблицей через табуляцию.
pub fn render_preview(sheet: &Sheet) -> String {
    let mut out = sheet.headers.join("\t");
    out.push('\n');

    for row in sheet.preview() {
        let line: Vec<String> = sheet.headers.iter().map(|h| row.text(h)).collect();
        out.push_str(&line.join("\t"));
        out.push('\n');
    }

    out
}
