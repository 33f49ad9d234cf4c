use std::{collections::BTreeMap, path::Path};

use anyhow::{anyhow, bail, Context};
use log::info;

use crate::{
    api::{
        files::{self, FileInfo},
        models::{AiBranding, CustomTemplate, GoogleSlidesTemplate, TemplateType},
    },
    config::Config,
    sheet::{google, reader, Sheet},
};

/// Параметры Google Slides из командной строки.
#[derive(Debug, Clone, Default)]
pub struct SlidesOptions {
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub image_width: Option<u64>,
    pub image_height: Option<u64>,
    pub position_x: Option<u64>,
    pub position_y: Option<u64>,
    pub placeholders: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateParts {
    pub custom: Option<CustomTemplate>,
    pub slides: Option<GoogleSlidesTemplate>,
    pub branding: Option<AiBranding>,
}

/// Проверяет и кодирует всё, что нужно выбранному типу шаблона.
///
/// Все проверки выполняются здесь, до отправки запроса.
pub fn template_parts(
    cfg: &Config,
    template_type: TemplateType,
    template_file: Option<&Path>,
    brand_colors: Option<&str>,
    logo: Option<&Path>,
    slides: &SlidesOptions,
) -> anyhow::Result<TemplateParts> {
    let mut parts = TemplateParts::default();

    match template_type {
        TemplateType::Custom => {
            let path = template_file.ok_or(anyhow!("custom template requires a template file"))?;
            parts.custom = Some(CustomTemplate::new(encode_checked(
                path,
                &cfg.supported_image_formats,
                cfg.max_file_size,
            )?));
        }
        TemplateType::Ai => {
            let colors = brand_colors
                .or(cfg.brand_colors.as_deref())
                .and_then(AiBranding::parse_colors);
            let logo = match logo {
                Some(path) => Some(encode_checked(
                    path,
                    &cfg.supported_image_formats,
                    cfg.max_file_size,
                )?),
                None => None,
            };
            parts.branding = Some(AiBranding { colors, logo });
        }
        TemplateType::GoogleSlides => {
            parts.slides = Some(slides_template(slides)?);
        }
    }

    Ok(parts)
}

fn encode_checked(path: &Path, allowed: &[String], max_size: u64) -> anyhow::Result<String> {
    check_file(path, allowed, max_size)?;

    files::to_base64(path).with_context(|| format!("read {:?}", path))
}

/// Возвращает ошибку с текстом для пользователя, если файл не того типа или слишком большой.
pub fn check_file(path: &Path, allowed: &[String], max_size: u64) -> anyhow::Result<()> {
    let info = FileInfo::inspect(path).with_context(|| format!("inspect {:?}", path))?;

    let validation = files::validate(&info, allowed, max_size);
    if !validation.valid {
        bail!(validation.error.unwrap_or_else(|| "Invalid file".to_owned()));
    }

    Ok(())
}

pub fn slides_template(opts: &SlidesOptions) -> anyhow::Result<GoogleSlidesTemplate> {
    let url = opts
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(anyhow!("Google Slides template requires a slides URL"))?;

    let id = google::extract_slide_id(url)
        .ok_or(anyhow!("Invalid Google Slides URL. Please paste a valid link."))?;

    let with_image = opts.image_url.as_deref().is_some_and(|u| !u.trim().is_empty());
    let image = |v: Option<u64>| if with_image { v } else { None };

    let placeholder_mapping = if opts.placeholders.is_empty() {
        None
    } else {
        let mut m = BTreeMap::new();
        for raw in &opts.placeholders {
            let (placeholder, column) = raw
                .split_once('=')
                .ok_or_else(|| anyhow!("placeholder \"{}\" should look like name=Column", raw))?;
            m.insert(placeholder.trim().to_owned(), column.trim().to_owned());
        }
        Some(m)
    };

    Ok(GoogleSlidesTemplate {
        url: url.to_owned(),
        embed_url: google::slide_embed_url(&id),
        image_url: if with_image { opts.image_url.clone() } else { None },
        image_width: image(opts.image_width),
        image_height: image(opts.image_height),
        position_x: image(opts.position_x),
        position_y: image(opts.position_y),
        slide_id: Some(id),
        placeholder_mapping,
    })
}

/// Источник строк для массовой генерации.
#[derive(Debug, Clone)]
pub enum Source<'a> {
    File(&'a Path),
    GoogleSheets { url: &'a str, sheet_name: &'a str },
}

/// Загружает строки из локальной таблицы или из Google Sheets.
pub fn load_sheet(cfg: &Config, source: &Source) -> anyhow::Result<Sheet> {
    let sheet = match source {
        Source::File(path) => {
            check_file(path, &cfg.supported_excel_formats, cfg.max_file_size)?;
            reader::read_file(path)?
        }
        Source::GoogleSheets { url, sheet_name } => {
            google::fetch_sheet(url, Some(sheet_name))?
        }
    };

    info!("Loaded {} rows", sheet.len());

    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn slides(url: &str) -> SlidesOptions {
        SlidesOptions {
            url: Some(url.to_owned()),
            image_width: Some(3000000),
            ..Default::default()
        }
    }

    #[test]
    fn slides_without_image_drops_dimensions() {
        let t = slides_template(&slides("https://docs.google.com/presentation/d/abc/edit")).unwrap();

        assert_eq!(Some("abc".to_owned()), t.slide_id);
        assert_eq!(None, t.image_width);
        assert_eq!(None, t.placeholder_mapping);
    }

    #[test]
    fn slides_with_image_and_placeholders() {
        let mut opts = slides("https://docs.google.com/presentation/d/abc/edit");
        opts.image_url = Some("https://x.com/logo.png".into());
        opts.placeholders = vec!["{{name}}=Name".into()];

        let t = slides_template(&opts).unwrap();

        assert_eq!(Some(3000000), t.image_width);
        assert_eq!(
            Some("Name"),
            t.placeholder_mapping.as_ref().unwrap().get("{{name}}").map(String::as_str)
        );
    }

    #[test]
    fn slides_invalid_url() {
        let err = slides_template(&slides("https://example.com")).unwrap_err();

        assert_eq!(
            "Invalid Google Slides URL. Please paste a valid link.",
            err.to_string()
        );
    }

    #[test]
    fn custom_template_rejects_wrong_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.txt");
        fs::write(&path, "hello").unwrap();

        let err = template_parts(
            &Config::default(),
            TemplateType::Custom,
            Some(&path),
            None,
            None,
            &SlidesOptions::default(),
        )
        .unwrap_err();

        assert!(err.to_string().starts_with("Invalid file type"));
    }

    #[test]
    fn custom_template_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.png");
        fs::write(&path, [1u8, 2, 3]).unwrap();

        let parts = template_parts(
            &Config::default(),
            TemplateType::Custom,
            Some(&path),
            None,
            None,
            &SlidesOptions::default(),
        )
        .unwrap();

        assert_eq!("data:image/png;base64,AQID", parts.custom.unwrap().base64);
        assert_eq!(None, parts.branding);
    }

    #[test]
    fn ai_colors_fall_back_to_config() {
        let cfg = Config {
            brand_colors: Some("#0ea5e9, #d946ef".into()),
            ..Default::default()
        };

        let parts = template_parts(
            &cfg,
            TemplateType::Ai,
            None,
            None,
            None,
            &SlidesOptions::default(),
        )
        .unwrap();

        assert_eq!(
            Some(vec!["#0ea5e9".to_owned(), "#d946ef".to_owned()]),
            parts.branding.unwrap().colors
        );
    }

    #[test]
    fn oversized_sheet_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "Name\nJohn\n").unwrap();
        let cfg = Config {
            max_file_size: 4,
            ..Default::default()
        };

        let err = load_sheet(&cfg, &Source::File(&path)).unwrap_err();

        assert_eq!("File size exceeds maximum allowed size of 0MB", err.to_string());
    }
}
