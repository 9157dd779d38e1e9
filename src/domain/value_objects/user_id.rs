use serde::{Deserialize, Serialize};

const RESERVED_CHARS: [char; 5] = ['/', '\\', '?', '#', '%'];

/// Stable user identifier handed to us by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();

        if trimmed.is_empty() {
            return Err("User id cannot be empty".to_string());
        }

        // The id becomes a storage path segment and a download URL segment.
        let unsafe_char = trimmed
            .chars()
            .any(|c| RESERVED_CHARS.contains(&c) || c.is_whitespace() || c.is_control());
        if unsafe_char || trimmed == "." || trimmed == ".." {
            return Err(format!("User id is not a valid path segment: {}", trimmed));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserId::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}
