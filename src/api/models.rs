use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::FieldMapping;

/// Запрос к вебхуку генерации сертификатов.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CertificateRequest {
    Single(SingleCertificateRequest),
    Bulk(BulkCertificateRequest),
}

impl CertificateRequest {
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Single(_) => "single",
            Self::Bulk(_) => "bulk",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    #[display(fmt = "ai")]
    Ai,
    #[display(fmt = "custom")]
    Custom,
    #[display(fmt = "googleslides")]
    #[value(name = "googleslides")]
    GoogleSlides,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    #[display(fmt = "gmail")]
    Gmail,
    #[display(fmt = "whatsapp")]
    Whatsapp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkSource {
    Excel,
    GoogleSheets,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_title: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderPosition {
    pub x: u32,
    pub y: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl PlaceholderPosition {
    fn at(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }
}

/// Загруженный фон с фиксированными позициями текста.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTemplate {
    pub base64: String,
    pub placeholders: BTreeMap<String, PlaceholderPosition>,
}

impl CustomTemplate {
    pub fn new(base64: String) -> Self {
        let placeholders = [
            ("name", 500, 300),
            ("badge", 500, 400),
            ("date", 500, 500),
            ("description", 500, 550),
        ]
        .into_iter()
        .map(|(k, x, y)| (k.to_owned(), PlaceholderPosition::at(x, y)))
        .collect();

        Self {
            base64,
            placeholders,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSlidesTemplate {
    pub url: String,
    pub embed_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_x: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_y: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder_mapping: Option<BTreeMap<String, String>>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiBranding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl AiBranding {
    /// Разбирает список цветов через запятую.
    pub fn parse_colors(raw: &str) -> Option<Vec<String>> {
        let colors: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect();

        if colors.is_empty() {
            None
        } else {
            Some(colors)
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    pub channels: Vec<DeliveryChannel>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleCertificateRequest {
    pub template_type: TemplateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<CustomTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_slides_template: Option<GoogleSlidesTemplate>,
    pub data: CertificateData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branding: Option<AiBranding>,
    pub delivery: DeliveryInfo,
    pub sender: SenderInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDelivery {
    pub channels: Vec<DeliveryChannel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCertificateRequest {
    pub source: BulkSource,
    pub template_type: TemplateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<CustomTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_slides_template: Option<GoogleSlidesTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excel_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheets_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    pub field_mapping: FieldMapping,
    pub delivery: BulkDelivery,
    pub sender: SenderInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branding: Option<AiBranding>,
}

/// Ответ вебхука для любого режима.
#[derive(Debug, Clone, PartialEq)]
pub enum CertificateResponse {
    Single(SingleCertificateResponse),
    Bulk(BulkCertificateResponse),
}

impl CertificateResponse {
    /// Неуспешный ответ для случаев, когда вебхук ничего внятного не вернул.
    pub fn failure(mode: &str, error: String, code: &str) -> Self {
        match mode {
            "bulk" => Self::Bulk(BulkCertificateResponse {
                success: false,
                error: Some(error),
                code: Some(code.to_owned()),
                ..Default::default()
            }),
            _ => Self::Single(SingleCertificateResponse {
                success: false,
                error: Some(error),
                code: Some(code.to_owned()),
                ..Default::default()
            }),
        }
    }

    pub fn success(&self) -> bool {
        match self {
            Self::Single(r) => r.success,
            Self::Bulk(r) => r.success,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Single(r) => r.error.as_deref(),
            Self::Bulk(r) => r.error.as_deref(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Single(r) => r.code.as_deref(),
            Self::Bulk(r) => r.code.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Sent,
    Failed,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatus {
    pub gmail: Option<DeliveryOutcome>,
    pub whatsapp: Option<DeliveryOutcome>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleCertificateResponse {
    #[serde(default)]
    pub success: bool,
    pub certificate_id: Option<String>,
    pub delivery_status: Option<DeliveryStatus>,
    pub preview: Option<String>,
    pub error: Option<String>,
    pub code: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkError {
    pub row: u64,
    pub error: String,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCertificateResponse {
    #[serde(default)]
    pub success: bool,
    pub job_id: Option<String>,
    pub total_records: Option<u64>,
    pub processed: Option<u64>,
    pub successful: Option<u64>,
    pub failed: Option<u64>,
    #[serde(default)]
    pub errors: Vec<BulkError>,
    pub error: Option<String>,
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn single_request_wire_shape() {
        let req = CertificateRequest::Single(SingleCertificateRequest {
            template_type: TemplateType::GoogleSlides,
            template: None,
            google_slides_template: Some(GoogleSlidesTemplate {
                url: "https://docs.google.com/presentation/d/abc/edit".into(),
                embed_url: "https://docs.google.com/presentation/d/abc/embed".into(),
                ..Default::default()
            }),
            data: CertificateData {
                name: "John Doe".into(),
                date: "2024-05-01".into(),
                badge: Some("Rust".into()),
                ..Default::default()
            },
            branding: None,
            delivery: DeliveryInfo {
                email: Some("john@x.com".into()),
                whatsapp: None,
                channels: vec![DeliveryChannel::Gmail],
            },
            sender: SenderInfo {
                name: "Academy".into(),
                email: None,
            },
        });

        let expected = json!({
            "mode": "single",
            "templateType": "googleslides",
            "googleSlidesTemplate": {
                "url": "https://docs.google.com/presentation/d/abc/edit",
                "embedUrl": "https://docs.google.com/presentation/d/abc/embed",
            },
            "data": {"name": "John Doe", "date": "2024-05-01", "badge": "Rust"},
            "delivery": {"email": "john@x.com", "channels": ["gmail"]},
            "sender": {"name": "Academy"},
        });

        assert_eq!(expected, serde_json::to_value(&req).unwrap());
    }

    #[test]
    fn bulk_request_wire_shape() {
        let req = CertificateRequest::Bulk(BulkCertificateRequest {
            source: BulkSource::GoogleSheets,
            template_type: TemplateType::Ai,
            template: None,
            google_slides_template: None,
            excel_file: None,
            sheets_url: Some("https://docs.google.com/spreadsheets/d/x".into()),
            sheet_name: Some("Sheet1".into()),
            field_mapping: FieldMapping::empty(),
            delivery: BulkDelivery {
                channels: vec![DeliveryChannel::Whatsapp],
            },
            sender: SenderInfo {
                name: "Academy".into(),
                email: None,
            },
            branding: Some(AiBranding {
                colors: AiBranding::parse_colors("#111, #222"),
                logo: None,
            }),
        });

        let value = serde_json::to_value(&req).unwrap();

        assert_eq!("bulk", value["mode"]);
        assert_eq!("googlesheets", value["source"]);
        assert_eq!(json!({}), value["fieldMapping"]);
        assert_eq!(json!(["#111", "#222"]), value["branding"]["colors"]);
        assert!(value.get("excelFile").is_none());
    }

    #[test]
    fn custom_template_default_positions() {
        let t = CustomTemplate::new("data:image/png;base64,AA==".into());

        let value = serde_json::to_value(&t).unwrap();

        assert_eq!(json!({"x": 500, "y": 300}), value["placeholders"]["name"]);
        assert_eq!(json!({"x": 500, "y": 550}), value["placeholders"]["description"]);
    }

    #[test]
    fn parse_colors_skips_blanks() {
        assert_eq!(None, AiBranding::parse_colors(" , "));
        assert_eq!(
            Some(vec!["#1e40af".to_owned(), "#3b82f6".to_owned()]),
            AiBranding::parse_colors("#1e40af, #3b82f6,")
        );
    }

    #[test]
    fn single_response_tolerates_missing_fields() {
        let resp: SingleCertificateResponse =
            serde_json::from_str(r#"{"certificateId":"abc123","deliveryStatus":{"gmail":"sent"}}"#)
                .unwrap();

        assert!(!resp.success);
        assert_eq!(Some("abc123".to_owned()), resp.certificate_id);
        assert_eq!(
            Some(DeliveryOutcome::Sent),
            resp.delivery_status.unwrap().gmail
        );
    }
}
