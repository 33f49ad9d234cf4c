use std::{env, path::PathBuf, time::Duration};

use log::debug;
use serde::{Deserialize, Serialize};

use resolve_path::PathResolveExt;

/// Переопределяет `webhook_url`, если задана.
pub const WEBHOOK_URL_ENV: &str = "CERTGEN_WEBHOOK_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Адрес вебхука, который генерирует и рассылает сертификаты.
    pub webhook_url: String,

    /// Директория с историей генерации.
    pub history_path: PathBuf,

    /// Ограничение на размер загружаемого файла в байтах.
    pub max_file_size: u64,

    pub supported_image_formats: Vec<String>,

    pub supported_excel_formats: Vec<String>,

    /// Максимум строк в одном прогоне, 0 отключает проверку.
    pub max_batch_size: usize,

    /// Пауза после каждой строки в миллисекундах.
    pub row_delay_ms: u64,

    /// Отправитель по умолчанию.
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,

    /// Цвета бренда через запятую для AI шаблонов.
    pub brand_colors: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_url: "http://localhost:5678/webhook/certificate".to_owned(),
            history_path: PathBuf::from("./history"),
            max_file_size: 10 * 1024 * 1024,
            supported_image_formats: vec![
                "image/png".to_owned(),
                "image/jpeg".to_owned(),
                "application/pdf".to_owned(),
            ],
            supported_excel_formats: vec![
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_owned(),
                "application/vnd.ms-excel".to_owned(),
                "text/csv".to_owned(),
            ],
            max_batch_size: 100,
            row_delay_ms: 500,
            sender_name: None,
            sender_email: None,
            brand_colors: None,
        }
    }
}

impl Config {
    pub fn row_delay(&self) -> Duration {
        Duration::from_millis(self.row_delay_ms)
    }
}

/// Загружает конфигурацию.
/// Если файла нет, то он будет создан со значениями по умолчанию.
pub fn load(path: PathBuf) -> anyhow::Result<Config> {
    let mut cfg: Config = confy::load_path(path)?;

    normalize(&mut cfg)?;

    Ok(cfg)
}

pub fn normalize(cfg: &mut Config) -> anyhow::Result<()> {
    // Относительные пути считаем от рабочей директории.
    cfg.history_path = cfg.history_path.try_resolve()?.into_owned();

    if let Ok(url) = env::var(WEBHOOK_URL_ENV) {
        if !url.trim().is_empty() {
            debug!("Адрес вебхука взят из {}", WEBHOOK_URL_ENV);
            cfg.webhook_url = url.trim().to_owned();
        }
    }

    Ok(())
}
