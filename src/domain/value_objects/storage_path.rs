use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::UserId;

/// Location of an uploaded object inside the blob store, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoragePath(String);

impl StoragePath {
    pub fn for_document(owner: &UserId, document_id: Uuid) -> Self {
        Self(format!("users/{}/files/{}", owner, document_id))
    }

    /// Parses a relative path, rejecting anything that could escape the store root.
    pub fn parse(path: &str) -> Result<Self, String> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err("Storage path cannot be empty".to_string());
        }

        if trimmed
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(format!("Invalid storage path: {}", path));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoragePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_path_is_scoped_by_user_and_document() {
        let owner = UserId::new("user_1").unwrap();
        let id = Uuid::new_v4();
        let path = StoragePath::for_document(&owner, id);
        assert_eq!(path.as_str(), format!("users/user_1/files/{}", id));
    }

    #[test]
    fn test_parse_round_trips_document_paths() {
        let owner = UserId::new("user_1").unwrap();
        let path = StoragePath::for_document(&owner, Uuid::new_v4());
        assert_eq!(StoragePath::parse(path.as_str()).unwrap(), path);
    }

    #[test]
    fn test_parse_rejects_traversal() {
        assert!(StoragePath::parse("users/../etc/passwd").is_err());
        assert!(StoragePath::parse("users//x").is_err());
        assert!(StoragePath::parse("").is_err());
        assert_eq!(StoragePath::parse("/users/a/").unwrap().as_str(), "users/a");
    }
}
