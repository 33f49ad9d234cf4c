mod storage;

use chrono::{DateTime, Utc};
use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::api::models::{DeliveryChannel, TemplateType};

#[cfg(test)]
pub use storage::MemoryStorage;
pub use storage::{FileStorage, Storage};

/// Ключ, под которым хранится вся история.
pub const STORAGE_KEY: &str = "certificate_history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[display(fmt = "success")]
    Success,
    #[display(fmt = "failed")]
    Failed,
}

/// Попытка генерации сертификата, передаётся в [`HistoryStore::add`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCertificate {
    pub recipient_name: String,
    pub badge: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub delivery_channels: Vec<DeliveryChannel>,
    pub template_type: TemplateType,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Сохранённая попытка. После записи не меняется.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCertificate {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: NewCertificate,
}

/// История попыток генерации, новые в начале.
pub struct HistoryStore<S: Storage> {
    storage: S,
}

impl<S: Storage> HistoryStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Возвращает все записи, новые в начале.
    /// Нечитаемые данные считаются пустой историей.
    pub fn get_all(&self) -> Vec<StoredCertificate> {
        let raw = match self.storage.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!("Failed to load certificate history: {}", e);
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Certificate history is corrupt, ignoring it: {}", e);
            Vec::new()
        })
    }

    /// Проставляет идентификатор и время и добавляет запись в начало.
    pub fn add(&self, entry: NewCertificate) -> StoredCertificate {
        let now = Utc::now();
        let stored = StoredCertificate {
            id: now.timestamp_millis().to_string(),
            generated_at: now,
            entry,
        };

        let mut all = self.get_all();
        all.insert(0, stored.clone());
        self.save(&all);

        stored
    }

    /// Удаляет запись с указанным идентификатором, если она есть.
    pub fn delete(&self, id: &str) {
        let mut all = self.get_all();
        let before = all.len();
        all.retain(|c| c.id != id);

        if all.len() != before {
            self.save(&all);
        }
    }

    pub fn clear_all(&self) {
        if let Err(e) = self.storage.delete(STORAGE_KEY) {
            error!("Failed to clear certificate history: {}", e);
        }
    }

    fn save(&self, all: &[StoredCertificate]) {
        let res = serde_json::to_string(all)
            .map_err(anyhow::Error::from)
            .and_then(|s| Ok(self.storage.put(STORAGE_KEY, &s)?));

        if let Err(e) = res {
            error!("Failed to save certificate history: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    fn entry(name: &str, status: Status) -> NewCertificate {
        NewCertificate {
            recipient_name: name.to_owned(),
            badge: "Rust".to_owned(),
            date: "2024-05-01".to_owned(),
            description: None,
            delivery_channels: vec![DeliveryChannel::Gmail],
            template_type: TemplateType::Ai,
            status,
            certificate_id: (status == Status::Success).then(|| "abc123".to_owned()),
            error_message: (status == Status::Failed).then(|| "boom".to_owned()),
        }
    }

    /// Идентификаторы берутся из часов, поэтому разносим записи по разным миллисекундам.
    fn add_apart(store: &HistoryStore<MemoryStorage>, e: NewCertificate) -> StoredCertificate {
        thread::sleep(Duration::from_millis(2));
        store.add(e)
    }

    #[test]
    fn empty_store() {
        let store = HistoryStore::new(MemoryStorage::default());

        assert!(store.get_all().is_empty());
    }

    #[test]
    fn add_preserves_fields_and_prepends() {
        let store = HistoryStore::new(MemoryStorage::default());

        let first = add_apart(&store, entry("John Doe", Status::Success));
        let second = add_apart(&store, entry("Record 2", Status::Failed));

        let all = store.get_all();

        assert_eq!(vec![second.clone(), first.clone()], all);
        assert_eq!(entry("John Doe", Status::Success), all[1].entry);
        assert!(!first.id.is_empty());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn get_all_is_idempotent() {
        let store = HistoryStore::new(MemoryStorage::default());
        add_apart(&store, entry("John Doe", Status::Success));

        assert_eq!(store.get_all(), store.get_all());
    }

    #[test]
    fn delete_one() {
        let store = HistoryStore::new(MemoryStorage::default());
        let keep = add_apart(&store, entry("Keep", Status::Success));
        let drop = add_apart(&store, entry("Drop", Status::Failed));

        store.delete(&drop.id);
        store.delete("unknown");

        assert_eq!(vec![keep], store.get_all());
    }

    #[test]
    fn clear_all() {
        let store = HistoryStore::new(MemoryStorage::default());
        add_apart(&store, entry("John Doe", Status::Success));

        store.clear_all();

        assert!(store.get_all().is_empty());
    }

    #[test]
    fn corrupt_data_reads_as_empty() {
        let storage = MemoryStorage::default();
        storage.put(STORAGE_KEY, "{not json").unwrap();
        let store = HistoryStore::new(storage);

        assert!(store.get_all().is_empty());

        add_apart(&store, entry("John Doe", Status::Success));
        assert_eq!(1, store.get_all().len());
    }

    #[test]
    fn wire_format() {
        let store = HistoryStore::new(MemoryStorage::default());
        let stored = store.add(entry("John Doe", Status::Failed));

        let value = serde_json::to_value(&stored).unwrap();

        assert_eq!("John Doe", value["recipientName"]);
        assert_eq!("failed", value["status"]);
        assert_eq!("boom", value["errorMessage"]);
        assert_eq!(serde_json::json!(["gmail"]), value["deliveryChannels"]);
        assert!(value.get("certificateId").is_none());
        assert!(value["generatedAt"].is_string());
    }
}
