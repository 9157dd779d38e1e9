use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::UserId;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Field layout of a document as persisted in the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    #[serde(rename = "ref")]
    pub storage_ref: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: Uuid,
    owner_id: UserId,
    name: String,
    size: u64,
    mime_type: String,
    download_url: String,
    storage_ref: String,
    created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        id: Uuid,
        owner_id: UserId,
        name: String,
        size: u64,
        mime_type: Option<String>,
        download_url: String,
        storage_ref: String,
    ) -> Self {
        let mime_type = mime_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        Self {
            id,
            owner_id,
            name,
            size,
            mime_type,
            download_url,
            storage_ref,
            // Metadata stores keep microseconds; anything finer would not read back.
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// Rebuilds a document from what the metadata store holds for it.
    pub fn from_record(id: Uuid, owner_id: UserId, record: DocumentRecord) -> Self {
        Self {
            id,
            owner_id,
            name: record.name,
            size: record.size,
            mime_type: record.mime_type,
            download_url: record.download_url,
            storage_ref: record.storage_ref,
            created_at: record.created_at,
        }
    }

    pub fn record(&self) -> DocumentRecord {
        DocumentRecord {
            name: self.name.clone(),
            size: self.size,
            mime_type: self.mime_type.clone(),
            download_url: self.download_url.clone(),
            storage_ref: self.storage_ref.clone(),
            created_at: self.created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn download_url(&self) -> &str {
        &self.download_url
    }

    pub fn storage_ref(&self) -> &str {
        &self.storage_ref
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::new(
            Uuid::new_v4(),
            UserId::new("user_1").unwrap(),
            "report.pdf".to_string(),
            100,
            Some("application/pdf".to_string()),
            "http://localhost:3000/blobs/users/user_1/files/x".to_string(),
            "users/user_1/files/x".to_string(),
        )
    }

    #[test]
    fn test_record_round_trip() {
        let document = sample();
        let rebuilt =
            Document::from_record(document.id(), document.owner_id().clone(), document.record());
        assert_eq!(rebuilt, document);
    }

    #[test]
    fn test_created_at_has_microsecond_precision() {
        let document = sample();
        assert_eq!(document.created_at().timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_missing_mime_type_defaults() {
        let document = Document::new(
            Uuid::new_v4(),
            UserId::new("user_1").unwrap(),
            "blob".to_string(),
            1,
            Some("  ".to_string()),
            String::new(),
            String::new(),
        );
        assert_eq!(document.mime_type(), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_record_serializes_with_store_field_names() {
        let value = serde_json::to_value(sample().record()).unwrap();
        let object = value.as_object().unwrap();

        for key in ["name", "size", "type", "downloadUrl", "ref", "createdAt"] {
            assert!(object.contains_key(key), "missing {}", key);
        }
        assert_eq!(object.len(), 6);
        assert_eq!(object["size"], 100);
    }
}
