use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored account. The password is only ever present as an encrypted token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Assigned by the store; ascending and never reused.
    pub id: i64,
    pub website: String,
    pub username: String,
    /// Self-describing encrypted token produced by the credential cipher.
    pub ciphertext: String,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Case-insensitive substring match against the website or username.
    /// An empty query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.website.to_lowercase().contains(&query)
            || self.username.to_lowercase().contains(&query)
    }
}

/// Input for inserting a record. Callers validate labels before building one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub website: String,
    pub username: String,
    pub ciphertext: String,
}

impl NewCredential {
    pub fn new(
        website: impl Into<String>,
        username: impl Into<String>,
        ciphertext: impl Into<String>,
    ) -> Self {
        Self {
            website: website.into(),
            username: username.into(),
            ciphertext: ciphertext.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(website: &str, username: &str) -> CredentialRecord {
        CredentialRecord {
            id: 1,
            website: website.into(),
            username: username.into(),
            ciphertext: "token".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn matches_website_or_username_case_insensitively() {
        let rec = record("GitHub.com", "Alice@Example.com");
        assert!(rec.matches("github"));
        assert!(rec.matches("ALICE"));
        assert!(!rec.matches("gitlab"));
    }

    #[test]
    fn empty_query_matches_everything() {
        let rec = record("example.com", "bob");
        assert!(rec.matches(""));
        assert!(rec.matches("   "));
    }

    #[test]
    fn query_never_looks_at_ciphertext() {
        let rec = record("example.com", "bob");
        assert!(!rec.matches("token"));
    }

    #[test]
    fn serializes_created_at_as_rfc3339() {
        let rec = record("example.com", "bob");
        let json = serde_json::to_value(&rec).expect("serialize");
        let created = json["created_at"].as_str().expect("string timestamp");
        assert!(DateTime::parse_from_rfc3339(created).is_ok());
    }
}
