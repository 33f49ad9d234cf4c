mod cancel;

use std::{fmt::Display, thread, time::Duration};

use log::{debug, info, warn};

use crate::{
    api::{
        models::{
            AiBranding, CertificateData, CertificateRequest, CertificateResponse, CustomTemplate,
            DeliveryChannel, DeliveryInfo, GoogleSlidesTemplate, SenderInfo,
            SingleCertificateRequest, TemplateType,
        },
        Webhook,
    },
    history::{HistoryStore, NewCertificate, Status, Storage},
    model::{self, CertificateField, FieldMapping},
    sheet::Row,
};

pub use cancel::CancellationToken;

/// Пауза после каждой строки.
pub const DEFAULT_ROW_DELAY: Duration = Duration::from_millis(500);

/// Параметры, общие для всех строк прогона.
#[derive(Debug, Clone)]
pub struct BulkJob {
    pub template_type: TemplateType,
    pub mapping: FieldMapping,
    pub brand_colors: Option<Vec<String>>,
    pub custom_template: Option<CustomTemplate>,
    pub slides_template: Option<GoogleSlidesTemplate>,
    pub channels: Vec<DeliveryChannel>,
    pub sender: SenderInfo,
}

/// Счётчики текущего прогона.
///
/// После каждой обработанной строки `processed == successful + failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub processing: bool,
    pub cancelled: bool,
    pub status: String,
}

impl Progress {
    pub fn remaining(&self) -> usize {
        self.total - self.processed
    }
}

/// Результат обработки строки. `row` нумеруется с единицы.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub row: usize,
    pub success: bool,
    pub message: String,
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = if self.success { "✓" } else { "✗" };
        write!(f, "{} Row {}: {}", mark, self.row, self.message)
    }
}

pub type RunResult<T> = std::result::Result<T, RunError>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RunError {
    #[error("No rows loaded. Please upload a file or load Google Sheets data first")]
    NoRows,

    #[error("{rows} rows exceed the maximum batch size of {max}")]
    BatchTooLarge { rows: usize, max: usize },
}

/// Отправляет по одному запросу на строку, строго по порядку.
pub struct Orchestrator<'a, W: Webhook, S: Storage> {
    webhook: &'a W,
    history: &'a HistoryStore<S>,
    row_delay: Duration,
    max_batch_size: Option<usize>,
    progress: Progress,
    log: Vec<LogEntry>,
}

impl<'a, W: Webhook, S: Storage> Orchestrator<'a, W, S> {
    pub fn new(webhook: &'a W, history: &'a HistoryStore<S>) -> Self {
        Self {
            webhook,
            history,
            row_delay: DEFAULT_ROW_DELAY,
            max_batch_size: None,
            progress: Progress::default(),
            log: Vec::new(),
        }
    }

    pub fn with_row_delay(mut self, delay: Duration) -> Self {
        self.row_delay = delay;
        self
    }

    /// Запрещает прогоны больше `max` строк. Ноль снимает ограничение.
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = (max > 0).then_some(max);
        self
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn reset(&mut self) {
        self.progress = Progress::default();
        self.log.clear();
    }

    /// Обрабатывает строки до конца или до отмены.
    /// Ошибка в строке не останавливает прогон.
    pub fn run(
        &mut self,
        rows: &[Row],
        job: &BulkJob,
        cancel: &CancellationToken,
    ) -> RunResult<Progress> {
        if rows.is_empty() {
            return Err(RunError::NoRows);
        }

        if let Some(max) = self.max_batch_size {
            if rows.len() > max {
                return Err(RunError::BatchTooLarge {
                    rows: rows.len(),
                    max,
                });
            }
        }

        self.reset();
        self.progress.total = rows.len();
        self.progress.processing = true;

        for (index, row) in rows.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Run cancelled after {} of {} rows", index, rows.len());
                self.progress.cancelled = true;
                break;
            }

            self.progress.status = format!("Processing row {} of {}...", index + 1, rows.len());
            debug!("{}", self.progress.status);

            self.process_row(index, row, job);
            self.progress.processed = index + 1;

            if !self.row_delay.is_zero() {
                thread::sleep(self.row_delay);
            }
        }

        self.progress.processing = false;
        self.progress.status = "Completed.".to_owned();

        Ok(self.progress.clone())
    }

    fn process_row(&mut self, index: usize, row: &Row, job: &BulkJob) {
        let request = build_request(row, job);
        let label = record_label(&request.data.name, index);
        let row_no = index + 1;

        let response = self
            .webhook
            .submit(&CertificateRequest::Single(request.clone()));

        let certificate_id = match &response {
            CertificateResponse::Single(r) if r.success => r.certificate_id.clone(),
            _ => None,
        };

        let entry = match certificate_id {
            Some(id) => {
                self.progress.successful += 1;
                self.push_log(row_no, true, format!("Generated for {}", label));
                history_entry(&request, label, Status::Success, Some(id), None)
            }
            None => {
                let message = failure_message(&response);
                self.progress.failed += 1;
                self.push_log(row_no, false, format!("Failed for {}: {}", label, message));
                history_entry(&request, label, Status::Failed, None, Some(message))
            }
        };

        self.history.add(entry);
    }

    fn push_log(&mut self, row: usize, success: bool, message: String) {
        let entry = LogEntry {
            row,
            success,
            message,
        };

        if success {
            info!("{}", entry);
        } else {
            warn!("{}", entry);
        }

        self.log.push(entry);
    }
}

/// Имя для лога и истории, когда в строке нет имени.
fn record_label(name: &str, index: usize) -> String {
    if name.trim().is_empty() {
        format!("Record {}", index + 1)
    } else {
        name.to_owned()
    }
}

fn failure_message(response: &CertificateResponse) -> String {
    match response.error() {
        Some(e) => e.to_owned(),
        None if response.success() => "No certificate ID returned".to_owned(),
        None => "Unknown error".to_owned(),
    }
}

/// Значение поля из строки. `None`, если поле ни с чем не связано.
fn mapped(row: &Row, mapping: &FieldMapping, field: CertificateField) -> Option<String> {
    mapping.column(field).map(|column| row.text(column))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Собирает запрос на один сертификат из строки таблицы.
pub fn build_request(row: &Row, job: &BulkJob) -> SingleCertificateRequest {
    let field = |f| mapped(row, &job.mapping, f);

    let data = CertificateData {
        certificate_title: field(CertificateField::CertificateTitle),
        name: field(CertificateField::Name).unwrap_or_default(),
        award_purpose: field(CertificateField::AwardPurpose),
        program_name: field(CertificateField::ProgramName),
        issuer: Some(field(CertificateField::Issuer).unwrap_or_else(|| job.sender.name.clone())),
        date: field(CertificateField::Date).unwrap_or_else(model::today),
        badge: field(CertificateField::Badge),
        description: field(CertificateField::Description),
    };

    let branding = match (job.template_type, &job.brand_colors) {
        (TemplateType::Ai, Some(colors)) => Some(AiBranding {
            colors: Some(colors.clone()),
            logo: None,
        }),
        _ => None,
    };

    let template = match job.template_type {
        TemplateType::Custom => job.custom_template.clone(),
        _ => None,
    };

    let google_slides_template = match job.template_type {
        TemplateType::GoogleSlides => job.slides_template.clone(),
        _ => None,
    };

    SingleCertificateRequest {
        template_type: job.template_type,
        template,
        google_slides_template,
        data,
        branding,
        delivery: DeliveryInfo {
            email: non_empty(field(CertificateField::Email)),
            whatsapp: non_empty(field(CertificateField::Whatsapp)),
            channels: job.channels.clone(),
        },
        sender: job.sender.clone(),
    }
}

fn history_entry(
    request: &SingleCertificateRequest,
    label: String,
    status: Status,
    certificate_id: Option<String>,
    error_message: Option<String>,
) -> NewCertificate {
    NewCertificate {
        recipient_name: label,
        badge: request.data.badge.clone().unwrap_or_default(),
        date: request.data.date.clone(),
        description: non_empty(request.data.description.clone()),
        delivery_channels: request.delivery.channels.clone(),
        template_type: request.template_type,
        status,
        certificate_id,
        error_message,
    }
}
