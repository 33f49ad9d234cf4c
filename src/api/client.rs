use std::time::Duration;

use log::{debug, warn};
use reqwest::StatusCode;

use super::models::{CertificateRequest, CertificateResponse};

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const SINGLE_TIMEOUT: Duration = Duration::from_secs(60);
const BULK_TIMEOUT: Duration = Duration::from_secs(300);

pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// Отправляет запрос на генерацию сертификата.
///
/// Реализации не возвращают ошибок: любая проблема превращается в неуспешный
/// ответ.
pub trait Webhook {
    fn submit(&self, request: &CertificateRequest) -> CertificateResponse;
}

/// Блокирующий HTTP клиент вебхука.
pub struct WebhookClient {
    client: reqwest::blocking::Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }

    fn timeout(request: &CertificateRequest) -> Duration {
        match request {
            CertificateRequest::Single(_) => SINGLE_TIMEOUT,
            CertificateRequest::Bulk(_) => BULK_TIMEOUT,
        }
    }

    fn decode(mode: &str, status: StatusCode, body: &str) -> CertificateResponse {
        let parsed = match mode {
            "bulk" => serde_json::from_str(body).map(CertificateResponse::Bulk),
            _ => serde_json::from_str(body).map(CertificateResponse::Single),
        };

        match parsed {
            Ok(resp) => resp,
            Err(e) if !status.is_success() => {
                debug!("Не удалось разобрать тело ошибки: {}", e);
                CertificateResponse::failure(
                    mode,
                    format!("Request failed with status code {}", status.as_u16()),
                    NETWORK_ERROR,
                )
            }
            Err(e) => {
                warn!("Webhook answered {} with an unreadable body: {}", status, e);
                CertificateResponse::failure(
                    mode,
                    "An unexpected error occurred".to_owned(),
                    UNKNOWN_ERROR,
                )
            }
        }
    }
}

impl Webhook for WebhookClient {
    fn submit(&self, request: &CertificateRequest) -> CertificateResponse {
        let mode = request.mode();

        debug!("Отправляем POST {} mode={}", self.url, mode);
        let sent = self
            .client
            .post(&self.url)
            .timeout(Self::timeout(request))
            .json(request)
            .send();

        let resp = match sent {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Webhook request failed: {}", e);
                return CertificateResponse::failure(mode, e.to_string(), NETWORK_ERROR);
            }
        };

        let status = resp.status();
        let body = match resp.text() {
            Ok(body) => body,
            Err(e) => return CertificateResponse::failure(mode, e.to_string(), NETWORK_ERROR),
        };

        debug!("Вебхук ответил {}, получено {} байт", status, body.len());

        Self::decode(mode, status, &body)
    }
}
