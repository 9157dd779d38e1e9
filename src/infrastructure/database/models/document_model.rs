use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::entities::{Document, DocumentRecord};
use crate::domain::value_objects::UserId;
use crate::infrastructure::database::schema::documents;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DocumentModel {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub size: i64,
    pub mime_type: String,
    pub download_url: String,
    pub storage_ref: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewDocumentModel {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub size: i64,
    pub mime_type: String,
    pub download_url: String,
    pub storage_ref: String,
    pub created_at: DateTime<Utc>,
}

impl NewDocumentModel {
    pub fn from_record(
        owner: &UserId,
        document_id: Uuid,
        record: &DocumentRecord,
    ) -> Result<Self, String> {
        let size = i64::try_from(record.size)
            .map_err(|_| format!("Document size out of range: {}", record.size))?;

        Ok(Self {
            id: document_id,
            owner_id: owner.to_string(),
            name: record.name.clone(),
            size,
            mime_type: record.mime_type.clone(),
            download_url: record.download_url.clone(),
            storage_ref: record.storage_ref.clone(),
            created_at: record.created_at,
        })
    }
}

impl TryFrom<DocumentModel> for Document {
    type Error = String;

    fn try_from(model: DocumentModel) -> Result<Self, Self::Error> {
        let owner = UserId::new(model.owner_id)?;
        let size = u64::try_from(model.size)
            .map_err(|_| format!("Negative document size: {}", model.size))?;

        Ok(Document::from_record(
            model.id,
            owner,
            DocumentRecord {
                name: model.name,
                size,
                mime_type: model.mime_type,
                download_url: model.download_url,
                storage_ref: model.storage_ref,
                created_at: model.created_at,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{SubsecRound, TimeZone};

    #[test]
    fn test_model_round_trip_preserves_record() {
        let owner = UserId::new("user_1").unwrap();
        let id = Uuid::new_v4();
        let record = DocumentRecord {
            name: "a.txt".to_string(),
            size: 100,
            mime_type: "text/plain".to_string(),
            download_url: "http://localhost/blobs/a".to_string(),
            storage_ref: "users/user_1/files/a".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };

        let new_model = NewDocumentModel::from_record(&owner, id, &record).unwrap();
        let model = DocumentModel {
            id: new_model.id,
            owner_id: new_model.owner_id,
            name: new_model.name,
            size: new_model.size,
            mime_type: new_model.mime_type,
            download_url: new_model.download_url,
            storage_ref: new_model.storage_ref,
            created_at: new_model.created_at,
        };

        let document = Document::try_from(model).unwrap();
        assert_eq!(document.id(), id);
        assert_eq!(document.owner_id(), &owner);
        assert_eq!(document.record(), record);
    }

    #[test]
    fn test_fresh_document_survives_timestamptz_precision() {
        let owner = UserId::new("user_1").unwrap();
        let id = Uuid::new_v4();
        let document = Document::new(
            id,
            owner.clone(),
            "b.txt".to_string(),
            3,
            None,
            "http://localhost/blobs/b".to_string(),
            "users/user_1/files/b".to_string(),
        );
        let record = document.record();

        let new_model = NewDocumentModel::from_record(&owner, id, &record).unwrap();
        // timestamptz keeps microseconds only.
        let stored_at = new_model.created_at.trunc_subsecs(6);
        let model = DocumentModel {
            id: new_model.id,
            owner_id: new_model.owner_id,
            name: new_model.name,
            size: new_model.size,
            mime_type: new_model.mime_type,
            download_url: new_model.download_url,
            storage_ref: new_model.storage_ref,
            created_at: stored_at,
        };

        assert_eq!(Document::try_from(model).unwrap(), document);
    }

    #[test]
    fn test_negative_size_is_rejected() {
        let model = DocumentModel {
            id: Uuid::new_v4(),
            owner_id: "user_1".to_string(),
            name: "a".to_string(),
            size: -1,
            mime_type: "text/plain".to_string(),
            download_url: String::new(),
            storage_ref: String::new(),
            created_at: Utc::now(),
        };
        assert!(Document::try_from(model).is_err());
    }
}
